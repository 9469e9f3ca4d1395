//! Configuration loading for the corpus explorer.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `<config_dir>/corpus-explorer/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::CorpusError;

/// Session manager settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Seconds between two cleanup sweeps of the session registry.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Seconds without access after which a session is evicted.
    /// Zero disables idle eviction; only flagged sessions are removed.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Upper bound on live sessions (0 = unbounded).
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_cleanup_interval() -> u64 {
    600
}

fn default_idle_timeout() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    10_000
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
            idle_timeout_secs: default_idle_timeout(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl SessionSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.cleanup_interval_secs == 0 {
            return Err("cleanup_interval_secs must be > 0".to_string());
        }
        Ok(())
    }
}

/// Defaults applied to new search sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Documents per result page.
    #[serde(default = "default_take")]
    pub default_take: usize,

    /// Words taken from the cleaned text when a document has no snippet.
    #[serde(default = "default_snippet_words")]
    pub snippet_words: usize,

    /// Words shown on each side of a keyword-in-context hit.
    #[serde(default = "default_kwic_window")]
    pub kwic_window: usize,

    /// Maximum keyword-in-context hits kept per document.
    #[serde(default = "default_kwic_max_per_document")]
    pub kwic_max_per_document: usize,
}

fn default_take() -> usize {
    10
}

fn default_snippet_words() -> usize {
    30
}

fn default_kwic_window() -> usize {
    6
}

fn default_kwic_max_per_document() -> usize {
    20
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_take: default_take(),
            snippet_words: default_snippet_words(),
            kwic_window: default_kwic_window(),
            kwic_max_per_document: default_kwic_max_per_document(),
        }
    }
}

impl SearchSettings {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_take == 0 {
            return Err("default_take must be > 0".to_string());
        }
        if self.kwic_window == 0 {
            return Err("kwic_window must be > 0".to_string());
        }
        Ok(())
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP API host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Session manager configuration
    #[serde(default)]
    pub session: SessionSettings,

    /// Search session defaults
    #[serde(default)]
    pub search: SearchSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    7171
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            http_host: default_http_host(),
            http_port: default_http_port(),
            session: SessionSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (`<config_dir>/corpus-explorer/config.toml`)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (`CORPUS_LOG_LEVEL`, `CORPUS_SESSION__IDLE_TIMEOUT_SECS`, ...)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CorpusError> {
        let config_dir = ProjectDirs::from("", "", "corpus-explorer")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        Self::load_from(&config_dir, cli_config_path, Self::environment())
    }

    // Nested keys use a double underscore: CORPUS_SEARCH__DEFAULT_TAKE
    fn environment() -> Environment {
        Environment::with_prefix("CORPUS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(
        config_dir: &Path,
        cli_config_path: Option<&str>,
        environment: Environment,
    ) -> Result<Self, CorpusError> {
        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("http_host", default_http_host())
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("http_port", default_http_port() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default(
                "session.cleanup_interval_secs",
                default_cleanup_interval() as i64,
            )
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("session.idle_timeout_secs", default_idle_timeout() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("session.max_sessions", default_max_sessions() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("search.default_take", default_take() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("search.snippet_words", default_snippet_words() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default("search.kwic_window", default_kwic_window() as i64)
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .set_default(
                "search.kwic_max_per_document",
                default_kwic_max_per_document() as i64,
            )
            .map_err(|e| CorpusError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(environment);

        let config = builder
            .build()
            .map_err(|e| CorpusError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CorpusError::Config(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Address the HTTP API binds to.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), CorpusError> {
        self.session.validate().map_err(CorpusError::Config)?;
        self.search.validate().map_err(CorpusError::Config)?;
        Ok(())
    }
}
