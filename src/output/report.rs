//! JSON results report
//!
//! Writes the `results.json` document a finished session leaves behind.

use crate::output::stats::CrawlStats;
use crate::state::PageRecord;
use crate::TrawlError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// File name of the report inside the output directory
pub const REPORT_FILE_NAME: &str = "results.json";

/// The persisted outcome of one session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlReport<'a> {
    pub base_url: &'a str,
    pub crawl_time: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub statistics: CrawlStats,

    /// Records in crawl order
    pub pages: &'a [PageRecord],
}

impl<'a> CrawlReport<'a> {
    /// Builds a report stamped with the current time
    pub fn new(
        base_url: &'a str,
        elapsed: Duration,
        statistics: CrawlStats,
        pages: &'a [PageRecord],
    ) -> Self {
        Self {
            base_url,
            crawl_time: Utc::now(),
            elapsed_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
            statistics,
            pages,
        }
    }
}

/// Writes a report as pretty-printed JSON
///
/// # Arguments
///
/// * `report` - The report to write
/// * `output_path` - Path of the JSON file (parent directories are created)
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(TrawlError)` - Failed to create or write the file
pub fn write_report(report: &CrawlReport<'_>, output_path: &Path) -> Result<(), TrawlError> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;

    Ok(())
}
