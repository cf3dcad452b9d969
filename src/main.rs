mod cli;
mod config;
mod daemon;
mod db;
mod error;
mod models;
mod repository;
mod server;
mod service;
mod upstream;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::{load_config, validate_config, validate_credentials};
use crate::models::SyncResult;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(config_path = %cli.config.display(), "config loaded");

    validate_config(&config).context("config validation failed")?;
    info!("config validated successfully");

    match cli.command {
        Some(Commands::Validate) => {
            println!("Configuration is valid.");
        }
        Some(Commands::Sync) => {
            validate_credentials(&config).context("config validation failed")?;
            let pool = db::create_pool(&config).await.context("creating database")?;
            let service = daemon::build_service(&config, pool.clone())?;

            let result = service.sync_podcasts().await.context("syncing podcasts")?;
            print_sync_result(&result)?;
            pool.close().await;
        }
        Some(Commands::SyncEpisodes { id }) => {
            validate_credentials(&config).context("config validation failed")?;
            let pool = db::create_pool(&config).await.context("creating database")?;
            let service = daemon::build_service(&config, pool.clone())?;

            let result = service
                .sync_podcast_episodes(&id)
                .await
                .with_context(|| format!("syncing episodes for podcast {id}"))?;
            print_sync_result(&result)?;
            pool.close().await;
        }
        None => {
            validate_credentials(&config).context("config validation failed")?;
            daemon::run(config).await?;
        }
    }

    Ok(())
}

fn print_sync_result(result: &SyncResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result).context("serializing sync result")?;
    println!("{json}");
    Ok(())
}
