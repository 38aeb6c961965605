//! Per-page crawl records
//!
//! Every dequeued target produces exactly one `PageRecord`, whether the fetch
//! succeeded or failed. Records are immutable once built.

use crate::FetchError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Title used when a page has no (or an empty) `<title>`
pub const DEFAULT_TITLE: &str = "untitled";

/// Number of text fragments joined into a preview
const PREVIEW_FRAGMENTS: usize = 5;

/// Maximum preview length in characters
const PREVIEW_MAX_CHARS: usize = 200;

/// A link found on a page, after normalization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub url: String,
    pub anchor_text: String,
}

/// An image found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    /// The `src` attribute as written in the markup
    pub src: String,
    pub alt: String,
}

/// Failure class of a failed page, one per error counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    /// Non-2xx response
    Http,
    /// DNS, connect, timeout
    Transport,
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Http => "http",
            Self::Transport => "transport",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Outcome of a fetch attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PageOutcome {
    Success {
        /// Name of the character encoding the body was decoded with
        encoding: String,

        /// True if every charset attempt failed and invalid bytes were replaced
        #[serde(rename = "lossyDecode")]
        lossy_decode: bool,
    },
    Failed {
        #[serde(rename = "errorClass")]
        error_class: ErrorClass,
        error: String,
    },
}

/// The structured outcome of one fetch-and-extract attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// The normalized URL that was requested
    pub url: String,
    pub title: String,
    pub links: Vec<LinkRecord>,
    pub images: Vec<ImageRecord>,
    pub meta_tags: BTreeMap<String, String>,

    /// Text of the page's first `h1`-`h3` headings
    pub headings: Vec<String>,
    pub text_fragments: Vec<String>,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: PageOutcome,

    /// File name of the saved raw HTML, when page saving is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_file: Option<String>,

    /// File names of images downloaded for this page
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub downloaded_images: Vec<String>,
}

impl PageRecord {
    /// Builds a record for a fetch that failed
    pub fn failed(url: impl Into<String>, error: &FetchError) -> Self {
        Self {
            url: url.into(),
            title: DEFAULT_TITLE.to_string(),
            links: Vec::new(),
            images: Vec::new(),
            meta_tags: BTreeMap::new(),
            headings: Vec::new(),
            text_fragments: Vec::new(),
            fetched_at: Utc::now(),
            outcome: PageOutcome::Failed {
                error_class: error.class(),
                error: error.to_string(),
            },
            saved_file: None,
            downloaded_images: Vec::new(),
        }
    }

    /// Returns true if the page was fetched and extracted
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PageOutcome::Success { .. })
    }

    /// Returns the failure class, if the fetch failed
    pub fn error_class(&self) -> Option<ErrorClass> {
        match &self.outcome {
            PageOutcome::Failed { error_class, .. } => Some(*error_class),
            PageOutcome::Success { .. } => None,
        }
    }

    /// Short text preview built from the first few text fragments
    ///
    /// Joins up to five fragments with a space and cuts the result at 200
    /// characters.
    pub fn text_preview(&self) -> String {
        let joined = self
            .text_fragments
            .iter()
            .take(PREVIEW_FRAGMENTS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        match joined.char_indices().nth(PREVIEW_MAX_CHARS) {
            Some((idx, _)) => joined[..idx].to_string(),
            None => joined,
        }
    }
}
