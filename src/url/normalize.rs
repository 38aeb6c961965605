use crate::url::CrawlTarget;
use crate::UrlError;
use url::Url;

/// Href prefixes that never name a fetchable page
const REJECTED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Resolves an href found on a page into a crawl target
///
/// # Normalization Steps
///
/// 1. Trim the href; reject it if empty
/// 2. Reject `javascript:`, `mailto:`, `tel:` and `data:` links
/// 3. Resolve it against `base` using standard URL resolution
/// 4. Reject anything that is not `http` or `https`, or has no host
/// 5. Strip the fragment
///
/// # Arguments
///
/// * `base` - The URL of the page the href was found on
/// * `href` - The raw attribute value
///
/// # Returns
///
/// * `Ok(CrawlTarget)` - Normalized absolute URL
/// * `Err(UrlError)` - The href should be dropped
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::resolve;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/docs/").unwrap();
/// let target = resolve(&base, "../b#top").unwrap();
/// assert_eq!(target.as_str(), "http://a.test/b");
/// ```
pub fn resolve(base: &Url, href: &str) -> Result<CrawlTarget, UrlError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(UrlError::Unsupported("empty href".to_string()));
    }

    let lowered = href.to_ascii_lowercase();
    if let Some(prefix) = REJECTED_PREFIXES.iter().find(|p| lowered.starts_with(*p)) {
        return Err(UrlError::Unsupported(format!("{} link", prefix)));
    }

    let url = base.join(href).map_err(|e| UrlError::Parse(e.to_string()))?;
    finish(url)
}

/// Normalizes the seed URL a session starts from
///
/// Unlike [`resolve`], the seed must already be absolute: a seed without an
/// `http`/`https` scheme is rejected rather than guessed at.
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::normalize_seed;
///
/// assert!(normalize_seed("https://example.com/#top").is_ok());
/// assert!(normalize_seed("example.com").is_err());
/// assert!(normalize_seed("ftp://example.com/").is_err());
/// ```
pub fn normalize_seed(seed: &str) -> Result<CrawlTarget, UrlError> {
    let url = Url::parse(seed.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    finish(url)
}

fn finish(mut url: Url) -> Result<CrawlTarget, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    Ok(CrawlTarget::from_checked(url))
}
