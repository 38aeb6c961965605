use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default browser-like user agent, so trivial bot filters serve normal pages
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default cap on a response body (10 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Main configuration structure for Sumi-Trawl
///
/// Every section is optional; missing values fall back to their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub fetcher: FetcherConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of pages fetched per session
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Politeness delay between consecutive fetches (seconds)
    #[serde(rename = "delay-seconds")]
    pub delay_seconds: f64,

    /// Only follow links on the seed's host and port
    #[serde(rename = "same-origin-only")]
    pub same_origin_only: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 10,
            delay_seconds: 1.0,
            same_origin_only: true,
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-seconds")]
    pub timeout_seconds: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Largest response body read before the fetch fails
    #[serde(rename = "max-body-bytes")]
    pub max_body_bytes: usize,
}

impl FetcherConfig {
    /// Returns the per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the report, saved pages and images
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Write `results.json` when a session ends
    #[serde(rename = "write-results")]
    pub write_results: bool,

    /// Save the raw HTML of each fetched page under `pages/`
    #[serde(rename = "save-pages")]
    pub save_pages: bool,

    /// Download images of each fetched page under `images/`
    #[serde(rename = "download-images")]
    pub download_images: bool,

    /// Upper bound on images downloaded per page
    #[serde(rename = "max-images-per-page")]
    pub max_images_per_page: usize,

    /// Number of records kept in memory for `results()`; 0 keeps all
    #[serde(rename = "results-limit")]
    pub results_limit: usize,
}

impl OutputConfig {
    /// Directory for saved pages
    pub fn pages_dir(&self) -> PathBuf {
        self.output_dir.join("pages")
    }

    /// Directory for downloaded images
    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join("images")
    }

    /// Returns the in-memory retention limit, if any
    pub fn results_limit(&self) -> Option<usize> {
        (self.results_limit > 0).then_some(self.results_limit)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("crawler_output"),
            write_results: true,
            save_pages: false,
            download_images: false,
            max_images_per_page: 5,
            results_limit: 0,
        }
    }
}
