//! CLI argument parsing for the corpus daemon.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use corpus_search::{OrderByColumn, SearchLayer};
use corpus_types::MetadataFilter;

/// Corpus Explorer Daemon
///
/// Hosts search sessions over OCR'd document corpora.
#[derive(Parser, Debug)]
#[command(name = "corpus-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default <config_dir>/corpus-explorer/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API over a fixture corpus until interrupted
    Start {
        /// JSON fixture answering page requests
        #[arg(short, long)]
        fixture: PathBuf,

        /// Override HTTP port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override seconds between cleanup sweeps
        #[arg(long)]
        cleanup_interval: Option<u64>,

        /// Override idle timeout in seconds (0 disables idle eviction)
        #[arg(long)]
        idle_timeout: Option<u64>,

        /// Override maximum live sessions (0 = unbounded)
        #[arg(long)]
        max_sessions: Option<usize>,
    },

    /// Run one search session against a JSON corpus fixture and print the page
    Search(SearchArgs),

    /// Print the effective configuration as TOML
    Config,
}

/// Arguments of the `search` command
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// JSON fixture with documents and annotation results
    #[arg(short, long)]
    pub fixture: PathBuf,

    /// Search phrase
    #[arg(short, long)]
    pub query: String,

    /// Page number (1-based)
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Page size (default from config)
    #[arg(short, long)]
    pub take: Option<usize>,

    /// Comma-separated search layers
    #[arg(long, value_delimiter = ',', value_parser = parse_layer, default_value = "fulltext")]
    pub layers: Vec<SearchLayer>,

    /// Column to sort by (title, rank, date)
    #[arg(long, value_parser = parse_order_by, default_value = "title")]
    pub order_by: OrderByColumn,

    /// Sort descending
    #[arg(long)]
    pub desc: bool,

    /// Metadata filter as key=value (repeatable)
    #[arg(long = "filter", value_parser = parse_filter)]
    pub filters: Vec<MetadataFilter>,
}

fn parse_layer(s: &str) -> Result<SearchLayer, String> {
    s.trim().parse()
}

fn parse_order_by(s: &str) -> Result<OrderByColumn, String> {
    match s.to_ascii_lowercase().as_str() {
        "title" | "document_title" => Ok(OrderByColumn::DocumentTitle),
        "rank" => Ok(OrderByColumn::Rank),
        "date" => Ok(OrderByColumn::Date),
        other => Err(format!("unknown order column '{}'", other)),
    }
}

fn parse_filter(s: &str) -> Result<MetadataFilter, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty filter key in '{}'", s));
    }
    Ok(MetadataFilter::equals(key.trim(), value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_start_defaults() {
        let cli = Cli::parse_from(["corpus-daemon", "start", "--fixture", "corpus.json"]);
        match cli.command {
            Commands::Start {
                fixture,
                port,
                cleanup_interval,
                idle_timeout,
                max_sessions,
            } => {
                assert_eq!(fixture, PathBuf::from("corpus.json"));
                assert_eq!(port, None);
                assert_eq!(cleanup_interval, None);
                assert_eq!(idle_timeout, None);
                assert_eq!(max_sessions, None);
            }
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_cli_start_with_overrides() {
        let cli = Cli::parse_from([
            "corpus-daemon",
            "start",
            "-f",
            "corpus.json",
            "--port",
            "8080",
            "--cleanup-interval",
            "30",
            "--idle-timeout",
            "0",
        ]);
        match cli.command {
            Commands::Start {
                port,
                cleanup_interval,
                idle_timeout,
                ..
            } => {
                assert_eq!(port, Some(8080));
                assert_eq!(cleanup_interval, Some(30));
                assert_eq!(idle_timeout, Some(0));
            }
            _ => panic!("Expected Start command"),
        }
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["corpus-daemon", "--config", "/path/to/config.toml", "config"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
    }

    #[test]
    fn test_cli_start_requires_fixture() {
        assert!(Cli::try_parse_from(["corpus-daemon", "start"]).is_err());
    }

    #[test]
    fn test_cli_with_log_level() {
        let cli = Cli::parse_from(["corpus-daemon", "--log-level", "debug", "config"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_cli_search() {
        let cli = Cli::parse_from([
            "corpus-daemon",
            "search",
            "--fixture",
            "corpus.json",
            "--query",
            "Quercus robur",
            "--page",
            "2",
            "--layers",
            "fulltext,kwic,named-entities",
            "--order-by",
            "rank",
            "--desc",
            "--filter",
            "language=de",
        ]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.fixture, PathBuf::from("corpus.json"));
                assert_eq!(args.query, "Quercus robur");
                assert_eq!(args.page, 2);
                assert_eq!(args.take, None);
                assert_eq!(
                    args.layers,
                    vec![
                        SearchLayer::Fulltext,
                        SearchLayer::KeywordInContext,
                        SearchLayer::NamedEntities
                    ]
                );
                assert_eq!(args.order_by, OrderByColumn::Rank);
                assert!(args.desc);
                assert_eq!(args.filters, vec![MetadataFilter::equals("language", "de")]);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_search_defaults() {
        let cli = Cli::parse_from(["corpus-daemon", "search", "-f", "c.json", "-q", "oak"]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.page, 1);
                assert_eq!(args.layers, vec![SearchLayer::Fulltext]);
                assert_eq!(args.order_by, OrderByColumn::DocumentTitle);
                assert!(!args.desc);
                assert!(args.filters.is_empty());
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_layer() {
        let result =
            Cli::try_parse_from(["corpus-daemon", "search", "-f", "c.json", "-q", "oak", "--layers", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert!(parse_filter("novalue").is_err());
        assert!(parse_filter("=x").is_err());
        assert_eq!(
            parse_filter(" year = 1850 ").unwrap(),
            MetadataFilter::equals("year", "1850")
        );
    }
}
