//! Corpus daemon library exports.
//!
//! This crate provides the CLI daemon binary for the corpus explorer.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, search, config)
//! - `fixture`: JSON corpus fixtures and the executor that searches them
//! - `server`: HTTP API over the session manager

pub mod cli;
pub mod commands;
pub mod fixture;
pub mod server;

pub use cli::{Cli, Commands, SearchArgs};
pub use commands::{
    build_report, execute_search, init_tracing, load_settings, run_search, show_config,
    start_daemon, PageEntry, SearchParams, SearchReport,
};
pub use fixture::{Fixture, FixtureExecutor};
pub use server::{router, run_server_with_shutdown, AppState};
