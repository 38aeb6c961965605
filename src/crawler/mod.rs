//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching and charset decoding
//! - Streaming HTML data extraction
//! - The breadth-first frontier with its visited set
//! - Overall crawl coordination on a background task
//!
//! [`Crawler`] is the handle front ends hold. Starting a session spawns one
//! worker task; every other call only reads or resets shared state.

mod assets;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;

pub use assets::AssetWriter;
pub use coordinator::{Coordinator, SessionSettings};
pub use fetcher::{
    build_http_client, declared_charset, decode_body, fetch_url, DecodedBody, FetchLimits,
    FetchedPage, DEFAULT_CHARSET, FALLBACK_ENCODINGS,
};
pub use frontier::{EnqueueOutcome, Frontier};
pub use parser::{
    parse_html, PageDataExtractor, ParsedPage, RawLink, MAX_HEADINGS, MIN_TEXT_FRAGMENT_CHARS,
};

use crate::config::{validate, validate_delay, Config};
use crate::output::CrawlStats;
use crate::state::{PageRecord, SessionStatus};
use crate::storage::{CrawlStatus, ResultsStore};
use crate::url::normalize_seed;
use crate::{SessionError, TrawlError};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Parameters of one crawl session
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    /// Absolute `http`/`https` URL the crawl starts from
    pub seed: String,
    pub max_pages: usize,
    pub delay_seconds: f64,
    pub same_origin_only: bool,
}

impl CrawlRequest {
    /// Builds a request for `seed` using the configured crawler defaults
    pub fn from_config(seed: impl Into<String>, config: &Config) -> Self {
        Self {
            seed: seed.into(),
            max_pages: config.crawler.max_pages,
            delay_seconds: config.crawler.delay_seconds,
            same_origin_only: config.crawler.same_origin_only,
        }
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.max_pages < 1 {
            return Err(SessionError::InvalidOptions(format!(
                "max_pages must be >= 1, got {}",
                self.max_pages
            )));
        }

        validate_delay(self.delay_seconds)
            .map_err(|e| SessionError::InvalidOptions(e.to_string()))
    }
}

/// The worker of the most recent session
///
/// The stop flag stays reachable after `wait` has taken the join handle.
struct SessionHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<SessionStatus>>,
}

struct CrawlerInner {
    config: Config,
    client: Client,
    store: ResultsStore,
    session: Mutex<Option<SessionHandle>>,
}

/// Handle to a crawler instance
///
/// Cloning yields another handle to the same instance. At most one session
/// runs per instance.
///
/// # Example
///
/// ```no_run
/// use sumi_trawl::{Config, Crawler};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let crawler = Crawler::new(Config::default())?;
/// crawler.start("https://example.com/", 5, 1.0)?;
/// crawler.wait().await;
/// println!("{}", crawler.status().current_message);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Crawler {
    inner: Arc<CrawlerInner>,
}

impl Crawler {
    /// Creates an idle crawler
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to start sessions
    /// * `Err(TrawlError)` - The configuration is invalid or the HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, TrawlError> {
        validate(&config)?;
        let client = build_http_client(&config.fetcher)?;
        let store = ResultsStore::new(config.output.results_limit());

        Ok(Self {
            inner: Arc::new(CrawlerInner {
                config,
                client,
                store,
                session: Mutex::new(None),
            }),
        })
    }

    /// Returns the configuration this crawler was built with
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    fn session_slot(&self) -> std::sync::MutexGuard<'_, Option<SessionHandle>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a session with the configured origin policy
    ///
    /// See [`Crawler::start_with`].
    pub fn start(&self, seed: &str, max_pages: usize, delay_seconds: f64) -> Result<(), SessionError> {
        self.start_with(CrawlRequest {
            seed: seed.to_string(),
            max_pages,
            delay_seconds,
            same_origin_only: self.inner.config.crawler.same_origin_only,
        })
    }

    /// Starts a session on a background task of the current tokio runtime
    ///
    /// Returns as soon as the worker is spawned.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The session is running
    /// * `Err(SessionError::AlreadyRunning)` - A session is active; it is not affected
    /// * `Err(SessionError::InvalidOptions)` - Page bound or delay out of range; nothing changed
    /// * `Err(SessionError::NoRuntime)` - Called outside a tokio runtime; nothing changed
    /// * `Err(SessionError::InvalidSeed)` - The session moved straight to `Error` with no records
    pub fn start_with(&self, request: CrawlRequest) -> Result<(), SessionError> {
        request.validate()?;
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        // Held until the worker is registered, so a concurrent stop() sees this session.
        let mut slot = self.session_slot();

        let store = &self.inner.store;
        store.begin_session(&request.seed)?;

        let seed = match normalize_seed(&request.seed) {
            Ok(seed) => seed,
            Err(e) => {
                tracing::warn!("Rejected seed '{}': {}", request.seed, e);
                store.finish_session(SessionStatus::Error, format!("Error: {}", e));
                return Err(SessionError::InvalidSeed(e));
            }
        };

        let settings = SessionSettings {
            seed,
            max_pages: request.max_pages,
            delay: Duration::from_secs_f64(request.delay_seconds),
            same_origin_only: request.same_origin_only,
            limits: FetchLimits::from(&self.inner.config.fetcher),
        };

        let stop = Arc::new(AtomicBool::new(false));
        let coordinator = Coordinator::new(
            self.inner.client.clone(),
            store.clone(),
            settings,
            self.inner.config.output.clone(),
            Arc::clone(&stop),
        );

        let join = runtime.spawn(coordinator.run());
        *slot = Some(SessionHandle {
            stop,
            join: Some(join),
        });

        Ok(())
    }

    /// Asks the running session to halt before its next fetch
    ///
    /// Has no effect when no session is running.
    pub fn stop(&self) {
        let slot = self.session_slot();
        if let Some(handle) = slot.as_ref() {
            if self.inner.store.session().status.is_running() {
                tracing::info!("Stop requested");
                handle.stop.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Returns the current status, safe to call at any time
    pub fn status(&self) -> CrawlStatus {
        self.inner.store.status()
    }

    /// Returns the retained records, most recent first
    pub fn results(&self) -> Vec<PageRecord> {
        self.inner.store.results()
    }

    /// Returns the statistics of the current (or last) session
    pub fn stats(&self) -> CrawlStats {
        self.inner.store.stats()
    }

    /// Drops all records and statistics
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The crawler is idle and empty
    /// * `Err(SessionError::ClearWhileRunning)` - A session is active; nothing changed
    pub fn clear(&self) -> Result<(), SessionError> {
        self.inner.store.clear()
    }

    /// Waits for the worker of the latest session to finish
    ///
    /// Returns the session status afterwards. Returns immediately when no
    /// worker is pending.
    pub async fn wait(&self) -> SessionStatus {
        let join = self.session_slot().as_mut().and_then(|h| h.join.take());

        if let Some(join) = join {
            if let Err(e) = join.await {
                tracing::error!("Crawl worker failed: {}", e);
                self.inner
                    .store
                    .finish_session(SessionStatus::Error, "Error: crawl worker failed");
            }
        }

        self.inner.store.session().status
    }
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.inner.config)
            .field("status", &self.inner.store.status().state)
            .finish()
    }
}
