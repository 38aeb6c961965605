//! Sumi-Trawl: a polite same-origin page trawler
//!
//! This crate implements a breadth-first web crawler that fetches pages from a
//! single origin, extracts structured data from each one (title, links, images,
//! meta tags, text fragments), and keeps running statistics and result records
//! that a front end can poll while the crawl runs on a background task.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sumi-Trawl operations
#[derive(Debug, Error)]
pub enum TrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL normalization errors
///
/// A link that fails normalization is dropped; it never counts as a crawl error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Unsupported link: {0}")]
    Unsupported(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Per-page fetch failures
///
/// Each variant maps onto one error counter in the crawl statistics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    /// DNS failure, refused connection, timeout, redirect failure
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Anything else (body read failures, client misuse)
    #[error("Failed to fetch {url}: {message}")]
    Other { url: String, message: String },
}

impl FetchError {
    /// Returns the failure class recorded on the page
    pub fn class(&self) -> state::ErrorClass {
        match self {
            Self::Http { .. } => state::ErrorClass::Http,
            Self::Transport { .. } => state::ErrorClass::Transport,
            Self::Other { .. } => state::ErrorClass::Other,
        }
    }
}

/// Errors from session control calls
///
/// These are returned synchronously; a rejected call leaves crawl state untouched,
/// except `InvalidSeed`, which moves the session to the `Error` state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("A crawl session is already running")]
    AlreadyRunning,

    #[error("Cannot clear results while a crawl session is running")]
    ClearWhileRunning,

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(#[from] UrlError),

    #[error("Invalid crawl options: {0}")]
    InvalidOptions(String),

    #[error("No async runtime available to run the crawl worker")]
    NoRuntime,
}

/// Result type alias for Sumi-Trawl operations
pub type Result<T> = std::result::Result<T, TrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Crawler;
pub use output::CrawlStats;
pub use state::{PageOutcome, PageRecord, SessionStatus};
pub use storage::{CrawlStatus, ResultsStore};
pub use url::{normalize_seed, resolve, same_origin, CrawlTarget};
