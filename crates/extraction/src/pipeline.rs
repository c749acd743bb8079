//! Open → decode → render → finalize for one job.

use std::time::Instant;

use netcdf_parser::GridOpener;
use tracing::{debug, info, info_span};

use crate::dataset::GridDataset;
use crate::error::{ExtractionError, Result};
use crate::finalize::finalize;
use crate::job::{GridJob, JobReport};
use crate::render::render_file;

/// Run one job to completion.
///
/// Nothing is opened or decoded when [`GridJob::preflight`] fails. The grid
/// source and the decoded dataset are released before the artifact is
/// finalized.
pub fn run_job(job: &GridJob, opener: &dyn GridOpener) -> Result<JobReport> {
    let span = info_span!(
        "extract",
        source = %job.source(),
        timestamp = %job.timestamp().format("%Y-%m-%dT%H:%M"),
    );
    let _enter = span.enter();

    job.preflight()?;

    let start = Instant::now();
    let layout = job.source().layout();

    let rows = {
        let source = opener.open(job.input()).map_err(ExtractionError::SourceOpen)?;
        debug!(input = %job.input().display(), "Opened input");

        let dataset = GridDataset::decode(source.as_ref(), layout)?;
        drop(source);

        render_file(&dataset, job.timestamp(), job.output())?
    };

    let artifact = finalize(job.output(), job.compressed())?;
    let elapsed = start.elapsed();

    info!(
        artifact = %artifact.display(),
        rows,
        elapsed_ms = elapsed.as_millis() as u64,
        "Extraction complete"
    );

    Ok(JobReport {
        rows,
        artifact,
        elapsed,
    })
}
