//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a browser-like user agent string
//! - GET requests with a per-request timeout and a body size cap
//! - Error classification (HTTP status, transport, other)
//! - Charset detection from the `Content-Type` header
//! - Decoding bodies with an ordered fallback list of encodings

use crate::config::FetcherConfig;
use crate::FetchError;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Charset assumed when the response does not declare one
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Encodings tried, in order, after the declared charset fails
pub const FALLBACK_ENCODINGS: [&str; 4] = ["utf-8", "gbk", "gb2312", "latin1"];

/// Connect phase bound, independent of the overall request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounds applied to every request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Bound on the whole request, body included
    pub timeout: Duration,
    /// Largest body accepted
    pub max_body_bytes: usize,
}

impl From<&FetcherConfig> for FetchLimits {
    fn from(config: &FetcherConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// A successful (2xx) response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: Option<String>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Charset declared by the `Content-Type` header, or `utf-8`
    pub fn declared_charset(&self) -> String {
        self.content_type
            .as_deref()
            .and_then(declared_charset)
            .unwrap_or_else(|| DEFAULT_CHARSET.to_string())
    }

    /// Decodes the body using the declared charset and the fallback list
    pub fn decode(&self) -> DecodedBody {
        decode_body(&self.body, &self.declared_charset())
    }
}

/// A decoded response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    /// Name of the encoding that produced `text`
    pub encoding: &'static str,
    /// True if invalid byte sequences were replaced
    pub lossy: bool,
}

/// Builds an HTTP client with proper configuration
///
/// Redirects follow reqwest's default policy (up to 10 hops).
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_trawl::config::FetcherConfig;
/// use sumi_trawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(config.timeout())
        .connect_timeout(CONNECT_TIMEOUT.min(config.timeout()))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL with a single GET request
///
/// # Failure classes
///
/// | Condition | Result |
/// |-----------|--------|
/// | Non-2xx status | `FetchError::Http` |
/// | Timeout, DNS, refused connection, redirect loop | `FetchError::Transport` |
/// | Body larger than `limits.max_body_bytes` | `FetchError::Other` |
/// | Anything else | `FetchError::Other` |
///
/// Nothing is retried.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `limits` - Request timeout and body size cap
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    limits: FetchLimits,
) -> Result<FetchedPage, FetchError> {
    let mut response = client
        .get(url.as_str())
        .timeout(limits.timeout)
        .send()
        .await
        .map_err(|e| classify_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body_too_large = || FetchError::Other {
        url: url.to_string(),
        message: format!("Response body exceeds {} bytes", limits.max_body_bytes),
    };

    if response
        .content_length()
        .is_some_and(|len| len > limits.max_body_bytes as u64)
    {
        return Err(body_too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| classify_error(url, &e))? {
        if body.len() + chunk.len() > limits.max_body_bytes {
            return Err(body_too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Maps a reqwest error onto the failure taxonomy
fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transport {
            url: url.to_string(),
            message: "Request timeout".to_string(),
        }
    } else if error.is_connect() || error.is_redirect() {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Other {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Extracts the `charset=<token>` parameter from a Content-Type value
///
/// Matching is case-insensitive; surrounding quotes are removed and the
/// label is lowercased.
///
/// # Example
///
/// ```
/// use sumi_trawl::crawler::declared_charset;
///
/// assert_eq!(declared_charset("text/html; charset=GBK").as_deref(), Some("gbk"));
/// assert_eq!(declared_charset("text/html"), None);
/// ```
pub fn declared_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    let start = lower.find("charset=")? + "charset=".len();

    let label: String = lower[start..]
        .trim_start()
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| !c.is_whitespace() && !matches!(c, ';' | '"' | '\'' | ','))
        .collect();

    (!label.is_empty()).then_some(label)
}

/// Decodes a body, never failing
///
/// Tries the declared charset, then each of [`FALLBACK_ENCODINGS`] in order,
/// each as a strict decode. If every attempt fails the bytes are decoded as
/// UTF-8 with invalid sequences replaced.
pub fn decode_body(bytes: &[u8], declared: &str) -> DecodedBody {
    let mut tried: Vec<&'static Encoding> = Vec::with_capacity(FALLBACK_ENCODINGS.len() + 1);

    let candidates = std::iter::once(declared).chain(FALLBACK_ENCODINGS);
    for label in candidates {
        let Some(encoding) = Encoding::for_label(label.trim().as_bytes()) else {
            tracing::trace!("Unknown charset label '{}'", label);
            continue;
        };

        // gbk and gb2312 resolve to the same decoder
        if tried.contains(&encoding) {
            continue;
        }
        tried.push(encoding);

        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            return DecodedBody {
                text: text.into_owned(),
                encoding: encoding.name(),
                lossy: false,
            };
        }
        tracing::trace!("Body is not valid {}, trying next encoding", encoding.name());
    }

    DecodedBody {
        text: String::from_utf8_lossy(bytes).into_owned(),
        encoding: UTF_8.name(),
        lossy: true,
    }
}
