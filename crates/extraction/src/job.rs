//! A single unit of extraction work.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{ExtractionError, Result};
use crate::layout::SourceKind;

/// One (source, timestamp) to extract. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridJob {
    source: SourceKind,
    timestamp: DateTime<Utc>,
    input: PathBuf,
    output: PathBuf,
    compressed: Option<PathBuf>,
}

impl GridJob {
    pub fn new(
        source: SourceKind,
        timestamp: DateTime<Utc>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        compressed: Option<PathBuf>,
    ) -> Self {
        Self {
            source,
            timestamp,
            input: input.into(),
            output: output.into(),
            compressed,
        }
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Timestamp of the first time slice in the input.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Path of the uncompressed CSV.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn compressed(&self) -> Option<&Path> {
        self.compressed.as_deref()
    }

    /// Path of the artifact a successful run leaves behind.
    pub fn artifact(&self) -> &Path {
        self.compressed().unwrap_or(&self.output)
    }

    /// Checks run before the input is opened.
    ///
    /// Existing outputs are reported before a missing input, so an already
    /// extracted timestamp whose input has since been cleaned up still reads
    /// as done. Creates the output directory on success.
    pub fn preflight(&self) -> Result<()> {
        for path in std::iter::once(self.output.as_path()).chain(self.compressed()) {
            if path.exists() {
                return Err(ExtractionError::OutputAlreadyExists(path.to_path_buf()));
            }
        }

        if !self.input.is_file() {
            return Err(ExtractionError::InputNotFound(self.input.display().to_string()));
        }

        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent).map_err(|e| ExtractionError::write_failed(parent, e))?;
        }

        Ok(())
    }
}

/// Outcome of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub rows: u64,
    pub artifact: PathBuf,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn job(dir: &Path, compressed: bool) -> GridJob {
        let out = dir.join("csv").join("2024").join("2024-03-01");
        GridJob::new(
            SourceKind::Current,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            dir.join("smoc_20240301.nc"),
            out.join("smoc_20240301.csv"),
            compressed.then(|| out.join("smoc_20240301.csv.zip")),
        )
    }

    #[test]
    fn test_artifact_prefers_compressed() {
        let dir = Path::new("/tmp/x");
        assert!(job(dir, true).artifact().ends_with("smoc_20240301.csv.zip"));
        assert!(job(dir, false).artifact().ends_with("smoc_20240301.csv"));
    }

    #[test]
    fn test_preflight_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = job(dir.path(), true).preflight().unwrap_err();
        assert!(matches!(err, ExtractionError::InputNotFound(_)));
    }

    #[test]
    fn test_preflight_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), true);
        fs::write(job.input(), b"").unwrap();

        job.preflight().unwrap();
        assert!(job.output().parent().unwrap().is_dir());
    }

    #[test]
    fn test_preflight_existing_output_wins_over_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), true);
        fs::create_dir_all(job.output().parent().unwrap()).unwrap();
        fs::write(job.compressed().unwrap(), b"done").unwrap();

        let err = job.preflight().unwrap_err();
        assert!(err.is_already_done());
    }
}
