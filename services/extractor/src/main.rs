//! Gridded model extraction service.
//!
//! Runs one poller per enabled source (`ec`, `mfwam`, `smoc`), each turning
//! the NetCDF files of its lookback window into CSV extracts:
//! - Deterministic input paths for `ec`, month directory scans for the others
//! - Idempotent: existing artifacts are skipped
//! - Crash-safe writes via `.partial` files and rename
//! - Optional zip archive of the CSV

use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::Parser;
use extraction::SourceKind;
use netcdf_parser::{GridOpener, NetCdfOpener};
use tokio::sync::watch;
use tracing::info;

use extractor::config::ExtractorConfig;
use extractor::poller::{run_cycles_at, JobOutcome, Poller};
use extractor::schedule::parse_timestamp;
use extractor::supervisor::Supervisor;
use extractor::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "extractor")]
#[command(about = "Extract gridded model output into CSV files")]
struct Args {
    /// Run a single cycle and exit (vs continuous polling)
    #[arg(long)]
    once: bool,

    /// Only this source: ec, mfwam or smoc (default: all enabled)
    #[arg(short, long)]
    source: Option<SourceKind>,

    /// Reprocess one timestamp (YYYY-MM-DD or YYYY-MM-DDTHH); needs --source
    #[arg(long, requires = "source")]
    date: Option<String>,

    /// Log level (overrides LOG_LEVEL from the environment)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = ExtractorConfig::from_env();
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    logging::init(&config.log_level, config.log_format)?;
    config.validate().map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    info!("Starting extractor");
    info!(config = %config.to_yaml()?, "Effective configuration");

    if let Some(port) = config.metrics_port {
        metrics::install(port)?;
    }

    let sources = match args.source {
        Some(kind) => vec![kind],
        None => config.enabled_sources(),
    };
    if sources.is_empty() {
        bail!("No sources enabled");
    }

    let config = Arc::new(config);
    let opener: Arc<dyn GridOpener> = Arc::new(NetCdfOpener);
    let pollers: Vec<Arc<Poller>> = sources
        .iter()
        .map(|kind| Arc::new(Poller::new(*kind, Arc::clone(&config), Arc::clone(&opener))))
        .collect();

    if let Some(date) = args.date {
        let timestamp = parse_timestamp(&date).map_err(|e| anyhow!(e))?;
        for poller in &pollers {
            match poller.run_at(timestamp).await {
                JobOutcome::Completed(report) => info!(
                    source = %poller.kind(),
                    artifact = %report.artifact.display(),
                    rows = report.rows,
                    "Reprocessing complete"
                ),
                JobOutcome::Skipped => info!(source = %poller.kind(), "Artifact already exists"),
                JobOutcome::Failed(e) => bail!("Reprocessing {} failed: {e}", poller.kind()),
            }
        }
        return Ok(());
    }

    if args.once {
        info!("Running single extraction cycle");
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        for (kind, summary) in run_cycles_at(&pollers, Utc::now(), &shutdown_rx).await? {
            info!(
                source = %kind,
                completed = summary.completed,
                skipped = summary.skipped,
                failed = summary.failed,
                "Single cycle complete"
            );
        }
        return Ok(());
    }

    info!(sources = ?sources, "Starting continuous polling");
    let mut supervisor = Supervisor::new();
    for poller in pollers {
        supervisor.add(poller);
    }
    supervisor.run().await
}
