use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "podcast-catalog", about = "Podcast catalog — mirrors the upstream directory and serves it over HTTP")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the configuration file
    Validate,

    /// Refresh the catalog from the upstream popular list
    Sync,

    /// Refresh one podcast's episodes from upstream
    SyncEpisodes {
        /// Local podcast id
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["podcast-catalog", "-c", "alt.toml", "sync-episodes", "3"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        assert!(matches!(cli.command, Some(Commands::SyncEpisodes { ref id }) if id == "3"));

        let cli = Cli::try_parse_from(["podcast-catalog"]).unwrap();
        assert!(cli.command.is_none());
    }
}
