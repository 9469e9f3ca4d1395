//! Registry of live search sessions.
//!
//! Sessions are keyed by `SessionId` in a `DashMap`. Each entry wraps its
//! session in a `tokio::sync::Mutex`, so every read or mutation of one
//! session is serialized, including the sweep that decides its eviction.
//! Map shard locks are never held across an `.await`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use corpus_search::{
    KeywordInContextProvider, SearchError, SearchExecutor, SearchSession, SearchType, SessionId,
    SessionSummary, WindowedKeywordInContext,
};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{SessionError, SessionManagerConfig};

struct SessionEntry {
    session: Mutex<SearchSession>,
    /// Milliseconds since the manager's epoch
    last_access_ms: AtomicU64,
}

/// Owns all live sessions and evicts the stale ones.
pub struct SessionManager {
    sessions: DashMap<SessionId, Arc<SessionEntry>>,
    /// Admitted sessions; reserved before insert, released on removal
    slots: AtomicUsize,
    config: SessionManagerConfig,
    kwic_provider: Arc<dyn KeywordInContextProvider>,
    epoch: Instant,
}

impl SessionManager {
    /// Create an empty manager.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: SessionManagerConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let kwic_provider: Arc<dyn KeywordInContextProvider> = Arc::new(WindowedKeywordInContext::new(
            config.kwic_window,
            config.kwic_max_per_document,
        ));

        info!(
            cleanup_interval_secs = config.cleanup_interval_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            max_sessions = config.max_sessions,
            "Session manager initialized"
        );

        Ok(Self {
            sessions: DashMap::new(),
            slots: AtomicUsize::new(0),
            config,
            kwic_provider,
            epoch: Instant::now(),
        })
    }

    /// Builder: keyword-in-context provider handed to new sessions
    pub fn with_kwic_provider(mut self, provider: Arc<dyn KeywordInContextProvider>) -> Self {
        self.kwic_provider = provider;
        self
    }

    /// Get the manager configuration.
    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn reserve_slot(&self) -> Result<(), SessionError> {
        let max = self.config.max_sessions;
        self.slots
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                (max == 0 || live < max).then_some(live + 1)
            })
            .map(|_| ())
            .map_err(|_| {
                warn!(max_sessions = max, "Session capacity exceeded");
                SessionError::CapacityExceeded(max)
            })
    }

    fn release_slot(&self) {
        self.slots.fetch_sub(1, Ordering::SeqCst);
    }

    /// Create and register a session with the configured defaults.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CapacityExceeded` when the registry is full.
    pub fn create_session(&self, search_type: SearchType) -> Result<SessionId, SessionError> {
        let mut session =
            SearchSession::new(search_type).with_kwic_provider(self.kwic_provider.clone());
        session.set_take(self.config.default_take)?;

        self.insert(session)
    }

    /// Register an externally built session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::CapacityExceeded` when the registry is full.
    pub fn insert(&self, session: SearchSession) -> Result<SessionId, SessionError> {
        self.reserve_slot()?;

        let id = session.id();
        let entry = SessionEntry {
            session: Mutex::new(session),
            last_access_ms: AtomicU64::new(self.now_ms()),
        };
        if self.sessions.insert(id, Arc::new(entry)).is_some() {
            // Replaced a session with the same id
            self.release_slot();
        }
        info!(session = %id, live = self.sessions.len(), "Session created");
        Ok(id)
    }

    fn entry(&self, id: SessionId) -> Result<Arc<SessionEntry>, SessionError> {
        let entry = self
            .sessions
            .get(&id)
            .map(|e| Arc::clone(e.value()))
            .ok_or(SessionError::NotFound(id))?;
        entry.last_access_ms.store(self.now_ms(), Ordering::SeqCst);
        Ok(entry)
    }

    /// Run `f` with exclusive access to a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for an unknown id.
    pub async fn with_session<F, R>(&self, id: SessionId, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut SearchSession) -> R,
    {
        let entry = self.entry(id)?;
        let mut session = entry.session.lock().await;
        Ok(f(&mut *session))
    }

    /// Fetch the session's current page from `executor` and store the outcome.
    ///
    /// The session stays locked for the whole round trip, so concurrent
    /// requests for the same session are applied one after the other.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for an unknown id, and
    /// `SessionError::Search` if the executor or the session rejects the
    /// page. A failed executor call leaves the session unchanged.
    pub async fn execute_page(
        &self,
        id: SessionId,
        executor: &dyn SearchExecutor,
    ) -> Result<SessionSummary, SessionError> {
        let entry = self.entry(id)?;
        let mut session = entry.session.lock().await;

        let request = session.page_request();
        debug!(session = %id, page = request.page, take = request.take, "Executing page request");

        let outcome = executor.execute(&request).await.map_err(|e| {
            warn!(session = %id, error = %e, "Search executor failed");
            SearchError::Executor(e)
        })?;
        session.apply_outcome(outcome)?;

        Ok(session.summary())
    }

    /// Flag a session for eviction on the next sweep.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for an unknown id.
    pub async fn mark_for_cleanup(&self, id: SessionId) -> Result<(), SessionError> {
        self.with_session(id, |session| session.mark_for_cleanup())
            .await
    }

    /// Remove a session immediately. Returns whether it existed.
    pub fn remove(&self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            self.release_slot();
            info!(session = %id, "Session removed");
        }
        removed
    }

    /// Check whether a session is registered.
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn snapshot(&self) -> Vec<(SessionId, Arc<SessionEntry>)> {
        self.sessions
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect()
    }

    /// Summaries of all live sessions, oldest first.
    pub async fn summaries(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::with_capacity(self.sessions.len());
        for (_, entry) in self.snapshot() {
            summaries.push(entry.session.lock().await.summary());
        }
        summaries.sort_by_key(|s| s.created);
        summaries
    }

    /// Evict flagged and idle sessions. Returns the number evicted.
    ///
    /// Each session's lock is taken before the decision, so a session is
    /// never evicted in the middle of a mutation.
    pub async fn sweep(&self) -> usize {
        let idle_timeout_ms = self
            .config
            .idle_timeout()
            .map(|timeout| timeout.as_millis() as u64);
        let mut evicted = 0;

        for (id, entry) in self.snapshot() {
            let session = entry.session.lock().await;

            let flagged = session.is_cleanup_next_cycle();
            let idle = idle_timeout_ms.is_some_and(|timeout| {
                let last = entry.last_access_ms.load(Ordering::SeqCst);
                self.now_ms().saturating_sub(last) > timeout
            });

            if (flagged || idle) && self.sessions.remove(&id).is_some() {
                self.release_slot();
                evicted += 1;
                info!(session = %id, flagged, idle, "Session evicted");
            }
            drop(session);
        }

        debug!(evicted, live = self.sessions.len(), "Session sweep complete");
        evicted
    }
}
