//! Session registry for the corpus explorer daemon.
//!
//! This crate owns every live [`SearchSession`](corpus_search::SearchSession)
//! and evicts stale ones in the background.
//!
//! # Features
//!
//! - Concurrent registry keyed by `SessionId`, with per-session serialized access
//! - Executor round trips applied under the session's lock
//! - Eviction of sessions flagged for cleanup or idle past the configured timeout
//! - Periodic sweep task with graceful shutdown via `CancellationToken`
//! - Optional cap on the number of live sessions
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use corpus_session::{SessionManager, SessionManagerConfig};
//! use corpus_search::SearchType;
//!
//! let manager = Arc::new(SessionManager::new(SessionManagerConfig::default())?);
//! let sweeper = manager.clone().spawn_sweeper();
//!
//! let id = manager.create_session(SearchType::Default)?;
//! manager.with_session(id, |s| s.set_search_phrase("Quercus")).await?;
//! let summary = manager.execute_page(id, &executor).await?;
//!
//! sweeper.shutdown().await;
//! ```

mod config;
mod error;
mod manager;
mod sweeper;

pub use config::SessionManagerConfig;
pub use error::SessionError;
pub use manager::SessionManager;
pub use sweeper::SweeperHandle;
