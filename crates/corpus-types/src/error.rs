//! Error types for the corpus explorer.

use thiserror::Error;

/// Unified error type for corpus data and configuration.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
