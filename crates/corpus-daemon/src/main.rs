//! Corpus Explorer Daemon
//!
//! Serves search sessions over OCR'd document corpora through an HTTP API
//! and evicts stale ones.
//!
//! # Usage
//!
//! ```bash
//! corpus-daemon start --fixture corpus.json [--port PORT] [--cleanup-interval SECS] [--idle-timeout SECS]
//! corpus-daemon search --fixture corpus.json --query "Quercus robur" [--layers fulltext,kwic]
//! corpus-daemon config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (<config_dir>/corpus-explorer/config.toml)
//! 3. Environment variables (CORPUS_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use corpus_daemon::{
    init_tracing, load_settings, run_search, show_config, start_daemon, Cli, Commands,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            fixture,
            port,
            cleanup_interval,
            idle_timeout,
            max_sessions,
        } => {
            start_daemon(
                cli.config.as_deref(),
                cli.log_level.as_deref(),
                &fixture,
                port,
                cleanup_interval,
                idle_timeout,
                max_sessions,
            )
            .await?;
        }
        Commands::Search(args) => {
            let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
            init_tracing(&settings.log_level)?;
            run_search(&settings, &args).await?;
        }
        Commands::Config => {
            let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
            show_config(&settings)?;
        }
    }

    Ok(())
}
