//! URL handling module for Sumi-Trawl
//!
//! This module turns hrefs found on pages into canonical crawl targets and
//! decides whether a target belongs to the seed's origin.

mod normalize;
mod origin;

pub use normalize::{normalize_seed, resolve};
pub use origin::same_origin;

use std::fmt;
use url::Url;

/// A normalized absolute `http`/`https` URL with no fragment
///
/// Two hrefs that differ only by fragment produce the same target. Targets are
/// only built through [`resolve`] and [`normalize_seed`], so holding one means the
/// URL has already passed scheme and host checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CrawlTarget(Url);

impl CrawlTarget {
    /// Returns the target as a string slice
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub(crate) fn from_checked(url: Url) -> Self {
        Self(url)
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for CrawlTarget {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
