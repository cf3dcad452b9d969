use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::repository::SqliteRepository;
use crate::service::CatalogService;
use crate::upstream::TaddyClient;
use crate::{db, server};

/// Wire the upstream client and the repository into a service.
pub fn build_service(config: &Config, pool: SqlitePool) -> Result<CatalogService> {
    let client = TaddyClient::from_config(&config.upstream, config.upstream_timeout()?)
        .context("building upstream client")?;
    let repository = SqliteRepository::new(pool);
    Ok(CatalogService::new(Arc::new(client), Arc::new(repository)))
}

pub async fn run(config: Config) -> Result<()> {
    let pool = db::create_pool(&config).await.context("creating database")?;
    info!(db_path = %config.db_path().display(), "database ready");

    let service = build_service(&config, pool.clone())?;
    info!(upstream = %config.upstream.url, "upstream client ready");

    let cancel = CancellationToken::new();

    let app_state = server::AppState {
        service,
        request_timeout: config.request_timeout()?,
    };

    let router = server::build_router(app_state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding to {}", config.server.listen))?;

    info!(listen = %config.server.listen, "HTTP server listening");

    // Run the server with graceful shutdown
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
            })
            .await
    });

    // Wait for shutdown signal
    wait_for_shutdown().await;
    info!("shutdown signal received");

    cancel.cancel();

    let shutdown_timeout = std::time::Duration::from_secs(10);
    let _ = tokio::time::timeout(shutdown_timeout, server_handle).await;

    // Close DB pool
    pool.close().await;
    info!("shutdown complete");

    Ok(())
}

async fn wait_for_shutdown() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler, waiting for Ctrl-C only");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
