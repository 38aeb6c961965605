//! Optional crawl side effects
//!
//! Raw page saving and per-page image download. Neither affects the crawl:
//! failures are logged and the page record is built regardless.

use crate::config::OutputConfig;
use crate::crawler::fetcher::{fetch_url, FetchLimits};
use crate::state::ImageRecord;
use crate::url::resolve;
use crate::TrawlError;
use chrono::Utc;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use url::Url;

/// Extension used when an image URL has none
const DEFAULT_IMAGE_EXTENSION: &str = "jpg";

/// Longest extension taken from an image URL
const MAX_EXTENSION_LEN: usize = 5;

/// Writes saved pages and downloaded images under the output directory
#[derive(Debug)]
pub struct AssetWriter {
    pages_dir: Option<PathBuf>,
    images_dir: Option<PathBuf>,
    max_images_per_page: usize,
    pages_saved: usize,
}

impl AssetWriter {
    /// Creates a writer from the output configuration
    ///
    /// Disabled side effects have no directory and are skipped.
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            pages_dir: config.save_pages.then(|| config.pages_dir()),
            images_dir: config.download_images.then(|| config.images_dir()),
            max_images_per_page: config.max_images_per_page,
            pages_saved: 0,
        }
    }

    /// Returns true if page saving is enabled
    pub fn saves_pages(&self) -> bool {
        self.pages_dir.is_some()
    }

    /// Returns true if image download is enabled
    pub fn downloads_images(&self) -> bool {
        self.images_dir.is_some() && self.max_images_per_page > 0
    }

    /// Saves decoded page markup as `page_NNN.html`
    ///
    /// The file starts with two comment lines recording the URL and the
    /// download time.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(name))` - File name of the saved page
    /// * `Ok(None)` - Page saving is disabled
    /// * `Err(TrawlError)` - Failed to write the file
    pub async fn save_page(&mut self, url: &str, html: &str) -> Result<Option<String>, TrawlError> {
        let Some(dir) = &self.pages_dir else {
            return Ok(None);
        };

        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!("page_{:03}.html", self.pages_saved + 1);
        let contents = format!(
            "<!-- URL: {} -->\n<!-- Downloaded: {} -->\n{}",
            url,
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            html
        );
        tokio::fs::write(dir.join(&file_name), contents).await?;

        self.pages_saved += 1;
        Ok(Some(file_name))
    }

    /// Downloads up to the configured number of images for one page
    ///
    /// Each `src` is resolved against the page URL. Unresolvable sources and
    /// failed downloads are skipped.
    ///
    /// # Returns
    ///
    /// File names of the images written, in page order
    pub async fn download_images(
        &self,
        client: &Client,
        page_url: &Url,
        images: &[ImageRecord],
        limits: FetchLimits,
    ) -> Vec<String> {
        let Some(dir) = &self.images_dir else {
            return Vec::new();
        };

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Cannot create image directory {}: {}", dir.display(), e);
            return Vec::new();
        }

        let mut written = Vec::new();

        for image in images.iter().take(self.max_images_per_page) {
            let target = match resolve(page_url, &image.src) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("Skipping image {}: {}", image.src, e);
                    continue;
                }
            };

            let fetched = match fetch_url(client, target.as_url(), limits).await {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("Image download failed: {}", e);
                    continue;
                }
            };

            let file_name = image_file_name(target.as_url());
            match tokio::fs::write(dir.join(&file_name), &fetched.body).await {
                Ok(()) => {
                    tracing::debug!("Saved image {} as {}", target, file_name);
                    written.push(file_name);
                }
                Err(e) => tracing::warn!("Cannot write image {}: {}", file_name, e),
            }
        }

        written
    }
}

/// File name for a downloaded image: hex SHA-256 of the URL plus its extension
fn image_file_name(url: &Url) -> String {
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));
    format!("{}.{}", digest, image_extension(url))
}

/// Lowercased extension of the last path segment, or `jpg`
fn image_extension(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| DEFAULT_IMAGE_EXTENSION.to_string())
}
