//! Error types for search session operations.

use thiserror::Error;

/// Errors raised by session mutators and their collaborators.
///
/// Lookup misses are not errors; accessors return sentinel values instead.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Caller passed a value the session cannot hold (empty layer set, zero take, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Per-document values do not line up with the current page
    #[error("Misaligned page: expected {expected} entries, got {actual}")]
    MisalignedPage { expected: usize, actual: usize },

    /// The keyword-in-context provider failed
    #[error("Keyword-in-context provider failed: {0}")]
    Provider(String),

    /// The query executor failed
    #[error("Search executor failed: {0}")]
    Executor(String),
}
