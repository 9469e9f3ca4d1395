//! Session manager configuration.
//!
//! Built from the `session` and `search` sections of the loaded settings,
//! or constructed directly in tests.

use std::time::Duration;

use corpus_types::Settings;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Configuration for the session manager.
///
/// Missing fields take the values of `Settings::default()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionManagerConfig {
    /// Seconds between two cleanup sweeps.
    pub cleanup_interval_secs: u64,

    /// Seconds without access before a session is evicted.
    /// Zero disables idle eviction.
    pub idle_timeout_secs: u64,

    /// Maximum number of live sessions (0 = unbounded).
    pub max_sessions: usize,

    /// Page size of newly created sessions.
    pub default_take: usize,

    /// Keyword-in-context window of newly created sessions.
    pub kwic_window: usize,

    /// Keyword-in-context hits kept per document.
    pub kwic_max_per_document: usize,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl SessionManagerConfig {
    /// Take the manager-relevant values from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            cleanup_interval_secs: settings.session.cleanup_interval_secs,
            idle_timeout_secs: settings.session.idle_timeout_secs,
            max_sessions: settings.session.max_sessions,
            default_take: settings.search.default_take,
            kwic_window: settings.search.kwic_window,
            kwic_max_per_document: settings.search.kwic_max_per_document,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfig` for a zero cleanup interval or
    /// a zero default page size.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cleanup_interval_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "cleanup_interval_secs must be > 0".to_string(),
            ));
        }
        if self.default_take == 0 {
            return Err(SessionError::InvalidConfig(
                "default_take must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Period of the background sweep.
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Idle timeout, `None` when idle eviction is disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
