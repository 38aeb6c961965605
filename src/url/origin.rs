use url::Url;

/// Returns true if `candidate` has the same network location as `base`
///
/// The network location is the host plus the explicit port. Default ports are
/// elided by the URL parser, so `http://a.test` and `http://a.test:80` compare
/// equal, while `http://a.test:8080` does not.
///
/// # Examples
///
/// ```
/// use sumi_trawl::url::same_origin;
/// use url::Url;
///
/// let base = Url::parse("http://a.test/").unwrap();
/// assert!(same_origin(&base, &Url::parse("http://a.test/b").unwrap()));
/// assert!(!same_origin(&base, &Url::parse("http://other.test/x").unwrap()));
/// ```
pub fn same_origin(base: &Url, candidate: &Url) -> bool {
    match (base.host_str(), candidate.host_str()) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b) && base.port() == candidate.port(),
        _ => false,
    }
}
