//! Background cleanup task.
//!
//! The sweeper wakes up every `cleanup_interval_secs` and runs
//! [`SessionManager::sweep`]. It stops when its `CancellationToken` fires.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::SessionManager;

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown_token: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Get a clone of the shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Check if the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sweeper and wait for the task to exit.
    pub async fn shutdown(self) {
        self.shutdown_token.cancel();
        if let Err(e) = self.task.await {
            warn!("Session sweeper task failed: {}", e);
        }
    }
}

impl SessionManager {
    /// Start the periodic sweep on the current tokio runtime.
    ///
    /// The first sweep runs one full interval after the call.
    pub fn spawn_sweeper(self: Arc<Self>) -> SweeperHandle {
        let shutdown_token = CancellationToken::new();
        let token = shutdown_token.clone();
        let period = self.config().cleanup_interval();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "Session sweeper started");

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!("Session sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = self.sweep().await;
                        debug!(evicted, live = self.len(), "Sweeper tick");
                    }
                }
            }
        });

        SweeperHandle {
            shutdown_token,
            task,
        }
    }
}
