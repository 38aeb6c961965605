//! Sumi-Trawl main entry point
//!
//! This is the command-line interface for the Sumi-Trawl page trawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use sumi_trawl::config::{load_config_with_hash, validate, Config};
use sumi_trawl::crawler::{CrawlRequest, Crawler};
use sumi_trawl::output::print_statistics;
use sumi_trawl::SessionStatus;
use tracing_subscriber::EnvFilter;

/// How often the front end polls the crawler
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sumi-Trawl: A polite same-origin page trawler
///
/// Sumi-Trawl crawls a single site breadth-first from a seed URL, extracting
/// titles, links, images, meta tags and text from every page, and writes the
/// results to a JSON report.
#[derive(Parser, Debug)]
#[command(name = "sumi-trawl")]
#[command(version = "1.0.0")]
#[command(about = "A polite same-origin page trawler", long_about = None)]
struct Cli {
    /// URL the crawl starts from (http or https)
    #[arg(value_name = "SEED_URL")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to fetch
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Politeness delay between requests, in seconds
    #[arg(long, value_name = "SECS")]
    delay: Option<f64>,

    /// Per-request timeout, in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Follow links to other hosts and ports
    #[arg(long)]
    allow_offsite: bool,

    /// Save the raw HTML of every fetched page
    #[arg(long)]
    save_pages: bool,

    /// Download images found on fetched pages
    #[arg(long)]
    download_images: bool,

    /// Directory receiving results.json, pages and images
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
        if let Some(delay) = self.delay {
            config.crawler.delay_seconds = delay;
        }
        if let Some(timeout) = self.timeout {
            config.fetcher.timeout_seconds = timeout;
        }
        if self.allow_offsite {
            config.crawler.same_origin_only = false;
        }
        if self.save_pages {
            config.output.save_pages = true;
        }
        if self.download_images {
            config.output.download_images = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    cli.apply_overrides(&mut config);
    validate(&config).context("Invalid crawl options")?;

    handle_crawl(config, &cli.seed).await?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_trawl=info,warn"),
            1 => EnvFilter::new("sumi_trawl=debug,info"),
            2 => EnvFilter::new("sumi_trawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs one session, polling its status until it ends
async fn handle_crawl(config: Config, seed: &str) -> anyhow::Result<()> {
    let request = CrawlRequest::from_config(seed, &config);
    let crawler = Crawler::new(config).context("Failed to initialize crawler")?;

    tracing::info!(
        "Crawling {} (max {} pages, {}s delay, same origin only: {})",
        request.seed,
        request.max_pages,
        request.delay_seconds,
        request.same_origin_only
    );

    crawler.start_with(request)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stop_sent = false;
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut last_message = String::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = crawler.status();
                if status.current_message != last_message {
                    tracing::info!(
                        "{} ({} pages, {} errors)",
                        status.current_message,
                        status.stats.pages_crawled,
                        status.stats.total_errors()
                    );
                    last_message = status.current_message;
                }
                if !status.running {
                    break;
                }
            }
            result = &mut ctrl_c, if !stop_sent => {
                if let Err(e) = result {
                    tracing::warn!("Cannot listen for Ctrl-C: {}", e);
                } else {
                    tracing::info!("Interrupted, stopping after the current page");
                    crawler.stop();
                }
                stop_sent = true;
            }
        }
    }

    let final_state = crawler.wait().await;
    let status = crawler.status();

    println!();
    print_statistics(&status.stats, Duration::from_secs_f64(status.elapsed_seconds));

    if final_state == SessionStatus::Error {
        bail!("Crawl failed: {}", status.current_message);
    }

    Ok(())
}
