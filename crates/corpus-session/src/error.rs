//! Error types for the session manager.

use corpus_search::{SearchError, SessionId};
use thiserror::Error;

/// Errors that can occur during session manager operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session with this id
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// The registry already holds the configured maximum of sessions
    #[error("Session capacity exceeded: {0} sessions")]
    CapacityExceeded(usize),

    /// Manager configuration rejected
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by the session itself
    #[error(transparent)]
    Search(#[from] SearchError),
}
