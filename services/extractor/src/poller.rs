//! Per-source polling loop.
//!
//! Each poller cycles Idle → Scanning → Dispatching → Idle. Jobs within a
//! cycle run one after another on the blocking pool; a failed job is logged
//! and the cycle moves on. Shutdown is observed while idle and between jobs,
//! never in the middle of a job.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use extraction::{run_job, ExtractionError, JobReport, SourceKind};
use netcdf_parser::GridOpener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::ExtractorConfig;
use crate::locate::build_job;
use crate::metrics;
use crate::schedule::{atmosphere_slots, daily_slots, start_of_day};
use crate::supervisor::Service;

/// Where a poller is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Scanning,
    Dispatching,
}

/// Result of one dispatched timestamp.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(JobReport),
    /// The artifact already exists.
    Skipped,
    Failed(String),
}

impl JobOutcome {
    fn label(&self) -> &'static str {
        match self {
            JobOutcome::Completed(_) => "completed",
            JobOutcome::Skipped => "skipped",
            JobOutcome::Failed(_) => "failed",
        }
    }
}

/// Tally of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Set when shutdown cut the cycle short.
    pub interrupted: bool,
}

impl CycleSummary {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed(_) => self.completed += 1,
            JobOutcome::Skipped => self.skipped += 1,
            JobOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Polls one source kind.
pub struct Poller {
    kind: SourceKind,
    name: String,
    config: Arc<ExtractorConfig>,
    opener: Arc<dyn GridOpener>,
    state: Mutex<PollerState>,
}

impl Poller {
    pub fn new(kind: SourceKind, config: Arc<ExtractorConfig>, opener: Arc<dyn GridOpener>) -> Self {
        Self {
            kind,
            name: format!("{kind}-poller"),
            config,
            opener,
            state: Mutex::new(PollerState::Idle),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn state(&self) -> PollerState {
        self.state.lock().map(|s| *s).unwrap_or(PollerState::Idle)
    }

    fn set_state(&self, state: PollerState) {
        if let Ok(mut current) = self.state.lock() {
            debug!(source = %self.kind, from = ?*current, to = ?state, "Poller state");
            *current = state;
        }
    }

    /// Timestamps due at `now`, newest first.
    pub fn due_timestamps(&self, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let lookback = self.config.source(self.kind).lookback;
        match self.kind {
            SourceKind::Atmosphere => atmosphere_slots(now, lookback),
            SourceKind::Wave | SourceKind::Current => daily_slots(now, lookback),
        }
    }

    /// Run until `shutdown` flips to true (or its sender goes away).
    ///
    /// The first cycle starts immediately.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(source = %self.kind, interval_secs = self.config.poll_interval_secs, "Poller started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let summary = self.run_cycle(&shutdown).await;
            if summary.interrupted {
                break;
            }

            self.set_state(PollerState::Idle);
            let sender_gone = tokio::select! {
                changed = shutdown.changed() => changed.is_err(),
                _ = tokio::time::sleep(self.config.poll_interval()) => false,
            };
            if sender_gone {
                break;
            }
        }

        self.set_state(PollerState::Idle);
        info!(source = %self.kind, "Poller stopped");
        Ok(())
    }

    /// One Scanning + Dispatching pass for the current time.
    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleSummary {
        self.run_cycle_at(Utc::now(), shutdown).await
    }

    /// One Scanning + Dispatching pass as if the clock read `now`.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>, shutdown: &watch::Receiver<bool>) -> CycleSummary {
        self.set_state(PollerState::Scanning);
        let due = self.due_timestamps(now);
        info!(source = %self.kind, count = due.len(), "Scanning due timestamps");

        self.set_state(PollerState::Dispatching);
        let mut summary = CycleSummary::default();

        for timestamp in due {
            if *shutdown.borrow() {
                info!(source = %self.kind, "Shutdown requested, stopping cycle");
                summary.interrupted = true;
                break;
            }

            let outcome = self.run_at(timestamp).await;
            summary.record(&outcome);
        }

        self.set_state(PollerState::Idle);
        info!(
            source = %self.kind,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Cycle finished"
        );
        summary
    }

    /// Resolve and run the job for a single timestamp.
    ///
    /// Daily sources are normalized to midnight.
    pub async fn run_at(&self, timestamp: DateTime<Utc>) -> JobOutcome {
        let timestamp = match self.kind {
            SourceKind::Atmosphere => timestamp,
            SourceKind::Wave | SourceKind::Current => start_of_day(timestamp),
        };

        let outcome = match build_job(&self.config, self.kind, timestamp) {
            Err(e) => self.classify(timestamp, Err(e)),
            Ok(job) => {
                let opener = Arc::clone(&self.opener);
                match tokio::task::spawn_blocking(move || run_job(&job, opener.as_ref())).await {
                    Ok(result) => self.classify(timestamp, result),
                    Err(e) => {
                        error!(source = %self.kind, timestamp = %timestamp, error = %e, "Extraction task panicked");
                        JobOutcome::Failed(e.to_string())
                    }
                }
            }
        };

        metrics::record_job(self.kind, outcome.label());
        if let JobOutcome::Completed(report) = &outcome {
            metrics::record_rows(self.kind, report.rows);
        }
        outcome
    }

    fn classify(&self, timestamp: DateTime<Utc>, result: extraction::Result<JobReport>) -> JobOutcome {
        let ts = timestamp.format("%Y-%m-%dT%H:%M");
        match result {
            Ok(report) => JobOutcome::Completed(report),
            Err(e) if e.is_already_done() => {
                debug!(source = %self.kind, timestamp = %ts, "Already extracted, skipping");
                JobOutcome::Skipped
            }
            Err(e @ ExtractionError::InputNotFound(_)) => {
                warn!(source = %self.kind, timestamp = %ts, error = %e, "Input not available");
                JobOutcome::Failed(e.to_string())
            }
            Err(e) => {
                error!(source = %self.kind, timestamp = %ts, error = %e, "Extraction failed");
                JobOutcome::Failed(e.to_string())
            }
        }
    }
}

/// One cycle of every poller, run side by side as if the clock read `now`.
///
/// Summaries come back in the order of `pollers`.
pub async fn run_cycles_at(
    pollers: &[Arc<Poller>],
    now: DateTime<Utc>,
    shutdown: &watch::Receiver<bool>,
) -> Result<Vec<(SourceKind, CycleSummary)>> {
    let handles: Vec<_> = pollers
        .iter()
        .map(|poller| {
            let poller = Arc::clone(poller);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let summary = poller.run_cycle_at(now, &shutdown).await;
                (poller.kind(), summary)
            })
        })
        .collect();

    let mut summaries = Vec::with_capacity(handles.len());
    for handle in handles {
        summaries.push(handle.await?);
    }
    Ok(summaries)
}

#[async_trait]
impl Service for Poller {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.run(shutdown).await
    }
}
