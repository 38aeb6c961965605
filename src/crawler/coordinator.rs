//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop run by the background worker of one
//! session, including:
//! - Pulling targets from the frontier in breadth-first order
//! - Coordinating fetching, decoding, extraction and link expansion
//! - Publishing records and statistics to the results store
//! - Applying the politeness delay and honoring stop requests
//! - Writing the final report

use crate::config::OutputConfig;
use crate::crawler::assets::AssetWriter;
use crate::crawler::fetcher::{fetch_url, FetchLimits};
use crate::crawler::frontier::{EnqueueOutcome, Frontier};
use crate::crawler::parser::parse_html;
use crate::output::{write_report, CrawlReport, CrawlStats, REPORT_FILE_NAME};
use crate::state::{LinkRecord, PageOutcome, PageRecord, SessionStatus};
use crate::storage::ResultsStore;
use crate::url::{resolve, CrawlTarget};
use chrono::Utc;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the loop ended
enum LoopExit {
    /// Frontier empty or page bound reached
    Exhausted,
    /// A stop request was observed
    Stopped,
    /// The seed could not be fetched
    SeedFailed(String),
}

/// Per-session settings handed to the worker
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub seed: CrawlTarget,
    pub max_pages: usize,
    pub delay: Duration,
    pub same_origin_only: bool,
    pub limits: FetchLimits,
}

/// Main crawler coordinator structure
///
/// Owns the frontier, the visited set and the statistics for the duration of
/// one session. Only the results store is shared with observers.
pub struct Coordinator {
    client: Client,
    store: ResultsStore,
    frontier: Frontier,
    assets: AssetWriter,
    output: OutputConfig,
    seed: CrawlTarget,
    delay: Duration,
    limits: FetchLimits,
    stop: Arc<AtomicBool>,
    stats: CrawlStats,

    /// Records in crawl order, for the report
    crawled: Vec<PageRecord>,
}

impl Coordinator {
    /// Creates a coordinator for a session the store already marks as running
    pub fn new(
        client: Client,
        store: ResultsStore,
        settings: SessionSettings,
        output: OutputConfig,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let frontier = Frontier::new(
            settings.seed.clone(),
            settings.max_pages,
            settings.same_origin_only,
        );

        Self {
            client,
            store,
            frontier,
            assets: AssetWriter::new(&output),
            output,
            seed: settings.seed,
            delay: settings.delay,
            limits: settings.limits,
            stop,
            stats: CrawlStats::default(),
            crawled: Vec::new(),
        }
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Runs the session to a terminal state
    ///
    /// Per-page failures are recorded and the loop continues; only a failed
    /// seed ends the session in `Error`.
    pub async fn run(mut self) -> SessionStatus {
        tracing::info!("Starting crawl of {}", self.seed);
        let start_time = Instant::now();

        let exit = self.crawl_loop().await;
        let elapsed = start_time.elapsed();

        let (status, message) = match &exit {
            LoopExit::Exhausted => (
                SessionStatus::Done,
                format!("Completed: {} pages", self.stats.pages_crawled),
            ),
            LoopExit::Stopped => (SessionStatus::Done, "Stopped".to_string()),
            LoopExit::SeedFailed(reason) => (SessionStatus::Error, format!("Error: {}", reason)),
        };

        if self.output.write_results && (status == SessionStatus::Done || !self.crawled.is_empty()) {
            self.write_results(elapsed);
        }

        tracing::info!(
            "Crawl finished ({}): {} pages crawled in {:?}",
            message,
            self.stats.pages_crawled,
            elapsed
        );

        self.store.finish_session(status, message);
        status
    }

    async fn crawl_loop(&mut self) -> LoopExit {
        loop {
            if self.stop_requested() {
                tracing::info!("Stop requested, halting crawl");
                return LoopExit::Stopped;
            }

            let target = match self.frontier.dequeue() {
                Some(t) => t,
                None => {
                    tracing::info!("Frontier is exhausted, crawl complete");
                    return LoopExit::Exhausted;
                }
            };
            let is_seed = self.frontier.dequeued() == 1;

            self.store.set_current_target(target.as_str());
            tracing::debug!("Processing URL: {}", target);

            let record = self.process_target(&target).await;
            let failure = match &record.outcome {
                PageOutcome::Failed { error, .. } => Some(error.clone()),
                PageOutcome::Success { .. } => None,
            };

            self.stats.record_page(&record);
            self.crawled.push(record.clone());
            self.store.append(record, self.stats);

            if let Some(reason) = failure.filter(|_| is_seed) {
                return LoopExit::SeedFailed(reason);
            }

            if self.frontier.is_exhausted() {
                tracing::info!(
                    "Frontier is exhausted after {} pages",
                    self.frontier.dequeued()
                );
                return LoopExit::Exhausted;
            }

            if self.stop_requested() {
                continue;
            }

            tokio::time::sleep(self.delay).await;
        }
    }

    /// Fetches and extracts one target
    ///
    /// Always yields a record; fetch failures become `Failed` records.
    async fn process_target(&mut self, target: &CrawlTarget) -> PageRecord {
        let page = match fetch_url(&self.client, target.as_url(), self.limits).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("{}", e);
                return PageRecord::failed(target.as_str(), &e);
            }
        };

        let decoded = page.decode();
        if decoded.lossy {
            tracing::warn!(
                "No charset decoded {} cleanly, replaced invalid bytes",
                target
            );
        }

        let parsed = parse_html(&decoded.text);

        // Relative links resolve against the final URL after redirects.
        let mut links = Vec::with_capacity(parsed.links.len());
        for raw in parsed.links {
            let resolved = match resolve(&page.final_url, &raw.href) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("Dropping link '{}': {}", raw.href, e);
                    continue;
                }
            };

            links.push(LinkRecord {
                url: resolved.as_str().to_string(),
                anchor_text: raw.anchor_text,
            });

            if self.frontier.enqueue(resolved.clone()) == EnqueueOutcome::OffOrigin {
                tracing::debug!("Not following off-origin link {}", resolved);
            }
        }

        let saved_file = match self.assets.save_page(target.as_str(), &decoded.text).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Failed to save page {}: {}", target, e);
                None
            }
        };

        let downloaded_images = self
            .assets
            .download_images(&self.client, &page.final_url, &parsed.images, self.limits)
            .await;

        tracing::debug!(
            "Fetched {} ({}): {} links, {} images",
            target,
            page.status_code,
            links.len(),
            parsed.images.len()
        );

        PageRecord {
            url: target.as_str().to_string(),
            title: parsed.title,
            links,
            images: parsed.images,
            meta_tags: parsed.meta_tags,
            headings: parsed.headings,
            text_fragments: parsed.text_fragments,
            fetched_at: Utc::now(),
            outcome: PageOutcome::Success {
                encoding: decoded.encoding.to_string(),
                lossy_decode: decoded.lossy,
            },
            saved_file,
            downloaded_images,
        }
    }

    fn write_results(&self, elapsed: Duration) {
        let path = self.output.output_dir.join(REPORT_FILE_NAME);
        let report = CrawlReport::new(self.seed.as_str(), elapsed, self.stats, &self.crawled);

        match write_report(&report, &path) {
            Ok(()) => tracing::info!("Results written to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write results to {}: {}", path.display(), e),
        }
    }
}
