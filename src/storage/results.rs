//! Mutex-guarded results store
//!
//! One worker writes, any number of observers read. Every access takes the
//! single lock only for the duration of the read or update; the lock is never
//! held across a network call.

use crate::output::CrawlStats;
use crate::state::{PageRecord, Session, SessionStatus};
use crate::SessionError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Status message shown while no session is running
pub const READY_MESSAGE: &str = "Ready";

/// Point-in-time view of the crawler, safe to request at any moment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatus {
    pub running: bool,
    pub state: SessionStatus,
    pub current_message: String,
    pub current_target: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: f64,
    pub stats: CrawlStats,
    pub results_count: usize,
}

#[derive(Debug)]
struct SharedState {
    session: Session,
    started: Option<Instant>,
    message: String,
    stats: CrawlStats,
    results: VecDeque<PageRecord>,
    results_limit: Option<usize>,
}

impl SharedState {
    fn new(results_limit: Option<usize>) -> Self {
        Self {
            session: Session::default(),
            started: None,
            message: READY_MESSAGE.to_string(),
            stats: CrawlStats::default(),
            results: VecDeque::new(),
            results_limit,
        }
    }
}

/// Shared store for session status, statistics and page records
///
/// Cloning the store yields another handle to the same state.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    inner: Arc<Mutex<SharedState>>,
}

impl ResultsStore {
    /// Creates an empty store
    ///
    /// # Arguments
    ///
    /// * `results_limit` - Keep at most this many records (newest win); `None` keeps all
    pub fn new(results_limit: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SharedState::new(results_limit))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        // Writers only assign whole fields; a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves the session to `Running` for a new seed
    ///
    /// Statistics are reset; records from earlier sessions are kept until an
    /// explicit clear.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The caller now owns the running session
    /// * `Err(SessionError::AlreadyRunning)` - Another session is active; nothing changed
    pub fn begin_session(&self, seed: &str) -> Result<(), SessionError> {
        let mut state = self.lock();

        if !state.session.status.can_transition_to(SessionStatus::Running) {
            return Err(SessionError::AlreadyRunning);
        }

        state.session = Session {
            status: SessionStatus::Running,
            current_target: Some(seed.to_string()),
            started_at: Some(Utc::now()),
            elapsed: Default::default(),
        };
        state.started = Some(Instant::now());
        state.message = format!("Crawling: {}", seed);
        state.stats = CrawlStats::default();

        Ok(())
    }

    /// Records the target the worker is about to fetch
    pub fn set_current_target(&self, target: &str) {
        let mut state = self.lock();
        state.session.current_target = Some(target.to_string());
        state.message = format!("Crawling: {}", target);
    }

    /// Appends a finished record and publishes the updated statistics
    pub fn append(&self, record: PageRecord, stats: CrawlStats) {
        let mut state = self.lock();
        state.results.push_front(record);
        if let Some(limit) = state.results_limit {
            state.results.truncate(limit);
        }
        state.stats = stats;
    }

    /// Ends the running session in a terminal state
    ///
    /// Has no effect unless the session is running and `status` is terminal.
    pub fn finish_session(&self, status: SessionStatus, message: impl Into<String>) {
        let mut state = self.lock();

        if !state.session.status.can_transition_to(status) || !status.is_terminal() {
            tracing::warn!(
                "Ignoring session transition {} -> {}",
                state.session.status,
                status
            );
            return;
        }

        state.session.status = status;
        state.session.current_target = None;
        state.session.elapsed = state.started.map(|s| s.elapsed()).unwrap_or_default();
        state.message = message.into();
    }

    /// Returns the current status, statistics and message
    pub fn status(&self) -> CrawlStatus {
        let state = self.lock();

        let elapsed = match (state.session.status, state.started) {
            (SessionStatus::Running, Some(started)) => started.elapsed(),
            _ => state.session.elapsed,
        };

        CrawlStatus {
            running: state.session.status.is_running(),
            state: state.session.status,
            current_message: state.message.clone(),
            current_target: state.session.current_target.clone(),
            started_at: state.session.started_at,
            elapsed_seconds: elapsed.as_secs_f64(),
            stats: state.stats,
            results_count: state.results.len(),
        }
    }

    /// Returns a snapshot of the session
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// Returns all retained records, most recent first
    pub fn results(&self) -> Vec<PageRecord> {
        self.lock().results.iter().cloned().collect()
    }

    /// Returns the current statistics
    pub fn stats(&self) -> CrawlStats {
        self.lock().stats
    }

    /// Drops all records, zeroes statistics and returns the session to `Idle`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The store is empty
    /// * `Err(SessionError::ClearWhileRunning)` - A session is active; nothing changed
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut state = self.lock();

        if state.session.status.is_running() {
            return Err(SessionError::ClearWhileRunning);
        }

        let limit = state.results_limit;
        *state = SharedState::new(limit);

        Ok(())
    }
}
