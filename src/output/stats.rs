//! Running crawl statistics
//!
//! This module provides the counters a session accumulates and a printer
//! for the end-of-crawl summary.

use crate::state::{ErrorClass, PageRecord};
use serde::Serialize;
use std::time::Duration;

/// Running counters for one crawl session
///
/// Counters only grow while a session runs; they are reset by starting a new
/// session or by an explicit clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    /// Number of targets fetched (successfully or not)
    pub pages_crawled: u64,

    /// Links recorded on successful pages
    pub total_links: u64,

    /// Images recorded on successful pages
    pub total_images: u64,

    /// Pages that failed with a non-2xx status
    pub http_errors: u64,

    /// Pages that failed with a transport error (DNS, connect, timeout)
    pub url_errors: u64,

    /// Pages that failed for any other reason
    pub other_errors: u64,

    /// Images written to the images directory
    pub images_downloaded: u64,
}

impl CrawlStats {
    /// Folds one page record into the counters
    pub fn record_page(&mut self, record: &PageRecord) {
        self.pages_crawled += 1;

        match record.error_class() {
            None => {
                self.total_links += record.links.len() as u64;
                self.total_images += record.images.len() as u64;
                self.images_downloaded += record.downloaded_images.len() as u64;
            }
            Some(ErrorClass::Http) => self.http_errors += 1,
            Some(ErrorClass::Transport) => self.url_errors += 1,
            Some(ErrorClass::Other) => self.other_errors += 1,
        }
    }

    /// Total number of failed pages
    pub fn total_errors(&self) -> u64 {
        self.http_errors + self.url_errors + self.other_errors
    }

    /// Returns true if every counter is zero
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `elapsed` - Wall-clock duration of the session
pub fn print_statistics(stats: &CrawlStats, elapsed: Duration) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.pages_crawled);
    println!("  Links found: {}", stats.total_links);
    println!("  Images found: {}", stats.total_images);
    if stats.images_downloaded > 0 {
        println!("  Images downloaded: {}", stats.images_downloaded);
    }
    println!();

    if stats.total_errors() > 0 {
        println!("Error Summary:");
        if stats.http_errors > 0 {
            println!("  HTTP errors: {}", stats.http_errors);
        }
        if stats.url_errors > 0 {
            println!("  Connection errors: {}", stats.url_errors);
        }
        if stats.other_errors > 0 {
            println!("  Other errors: {}", stats.other_errors);
        }
        println!();
    }

    let succeeded = stats.pages_crawled - stats.total_errors();
    let success_rate = if stats.pages_crawled > 0 {
        (succeeded as f64 / stats.pages_crawled as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        success_rate, succeeded, stats.pages_crawled
    );
    println!("Elapsed: {:.2} seconds", elapsed.as_secs_f64());
}
