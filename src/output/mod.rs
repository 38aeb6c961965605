//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Running statistics for the active session
//! - Printing an end-of-crawl summary
//! - Writing the JSON results report

mod report;
pub mod stats;

pub use report::{write_report, CrawlReport, REPORT_FILE_NAME};
pub use stats::{print_statistics, CrawlStats};
