//! Storage module for shared crawl state
//!
//! This module holds the state that outlives a single loop iteration and is
//! read by observers while the worker writes it:
//! - Session status and the current target
//! - Running statistics
//! - Page records, most recent first

mod results;

pub use results::{CrawlStatus, ResultsStore, READY_MESSAGE};
