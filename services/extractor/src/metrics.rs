//! Prometheus counters for extraction jobs.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use extraction::SourceKind;
use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Install the Prometheus recorder and its scrape endpoint on `port`.
pub fn install(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus recorder")?;

    info!(%addr, "Prometheus metrics exporter initialized");
    Ok(())
}

/// Count one finished job (`completed`, `skipped` or `failed`).
pub fn record_job(source: SourceKind, outcome: &'static str) {
    counter!("extractor_jobs_total", "source" => source.prefix(), "outcome" => outcome).increment(1);
}

pub fn record_rows(source: SourceKind, rows: u64) {
    counter!("extractor_rows_total", "source" => source.prefix()).increment(rows);
}
