//! Resolving timestamps to input files and output paths.
//!
//! Input trees:
//!
//! ```text
//! <nc_dir>/ec_0p25/<YYYY>/<YYYY-MM-DD>/oper-<RR>/ec_0p25_oper_<YYYYMMDD><RR>_<F>h.nc
//! <nc_dir>/mfwam/<YYYY>/<MM>/*<YYYYMMDD>*
//! <nc_dir>/smoc/<YYYY>/<MM>/*<YYYYMMDD>*
//! ```
//!
//! Outputs land in `<csv_dir>/<YYYY>/<YYYY-MM-DD>/`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Timelike, Utc};
use extraction::{ExtractionError, GridJob, Result, SourceKind};
use tracing::warn;
use walkdir::WalkDir;

use crate::config::ExtractorConfig;

const ATMOSPHERE_TREE: &str = "ec_0p25";

/// Deterministic input path of one atmosphere slot.
///
/// Forecasts come from the 00 run before noon and the 12 run after, with
/// the forecast hour counted from that run.
pub fn atmosphere_input(nc_dir: &Path, slot: DateTime<Utc>) -> PathBuf {
    let run = if slot.hour() < 12 { 0 } else { 12 };
    let step = slot.hour() - run;

    nc_dir
        .join(ATMOSPHERE_TREE)
        .join(slot.format("%Y").to_string())
        .join(slot.format("%Y-%m-%d").to_string())
        .join(format!("oper-{run:02}"))
        .join(format!(
            "ec_0p25_oper_{}{run:02}_{step}h.nc",
            slot.format("%Y%m%d")
        ))
}

/// Find the daily input file for `day` by scanning its month directory.
///
/// Every file (or symlink to one) whose name contains `YYYYMMDD` is a
/// candidate. The one where
/// the date appears earliest in the name wins, ties broken by name, so a
/// run date embedded later in a name (`..._R20240301.nc`) loses to a file
/// that is actually for that day.
pub fn find_daily_input(nc_dir: &Path, kind: SourceKind, day: DateTime<Utc>) -> Result<PathBuf> {
    let dir = nc_dir
        .join(kind.prefix())
        .join(day.format("%Y").to_string())
        .join(format!("{:02}", day.month()));
    let pattern = day.format("%Y%m%d").to_string();

    let mut candidates = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| ExtractionError::DirectoryScanFailed {
            dir: dir.clone(),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if let Some(pos) = name.find(&pattern) {
            candidates.push((pos, name.into_owned()));
        }
    }

    candidates.sort();
    let mut candidates = candidates.into_iter().map(|(_, name)| name);

    let chosen = candidates.next().ok_or_else(|| {
        ExtractionError::InputNotFound(format!("no file matching {pattern} in {}", dir.display()))
    })?;

    let others: Vec<String> = candidates.collect();
    if !others.is_empty() {
        warn!(
            source = %kind,
            dir = %dir.display(),
            chosen = %chosen,
            others = ?others,
            "Several input files match the date"
        );
    }

    Ok(dir.join(chosen))
}

/// Uncompressed and (optionally) compressed output paths.
pub fn output_paths(
    csv_dir: &Path,
    kind: SourceKind,
    timestamp: DateTime<Utc>,
    compress: bool,
) -> (PathBuf, Option<PathBuf>) {
    let stamp = match kind {
        SourceKind::Atmosphere => timestamp.format("%Y%m%d%H"),
        SourceKind::Wave | SourceKind::Current => timestamp.format("%Y%m%d"),
    };
    let stem = format!("{}_{stamp}", kind.prefix());

    let dir = csv_dir
        .join(timestamp.format("%Y").to_string())
        .join(timestamp.format("%Y-%m-%d").to_string());

    let csv = dir.join(format!("{stem}.csv"));
    let compressed = compress.then(|| dir.join(format!("{stem}.csv.zip")));
    (csv, compressed)
}

/// Build the job for one due timestamp of `kind`.
pub fn build_job(config: &ExtractorConfig, kind: SourceKind, timestamp: DateTime<Utc>) -> Result<GridJob> {
    let input = match kind {
        SourceKind::Atmosphere => atmosphere_input(config.nc_dir(), timestamp),
        SourceKind::Wave | SourceKind::Current => find_daily_input(config.nc_dir(), kind, timestamp)?,
    };
    let (output, compressed) =
        output_paths(config.csv_dir(), kind, timestamp, config.source(kind).compress);

    Ok(GridJob::new(kind, timestamp, input, output, compressed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_atmosphere_input_runs() {
        let nc = Path::new("/data/nc-files");
        assert_eq!(
            atmosphere_input(nc, at(2025, 1, 1, 0)),
            PathBuf::from("/data/nc-files/ec_0p25/2025/2025-01-01/oper-00/ec_0p25_oper_2025010100_0h.nc")
        );
        assert_eq!(
            atmosphere_input(nc, at(2025, 1, 1, 9)),
            PathBuf::from("/data/nc-files/ec_0p25/2025/2025-01-01/oper-00/ec_0p25_oper_2025010100_9h.nc")
        );
        assert_eq!(
            atmosphere_input(nc, at(2025, 1, 1, 21)),
            PathBuf::from("/data/nc-files/ec_0p25/2025/2025-01-01/oper-12/ec_0p25_oper_2025010112_9h.nc")
        );
    }

    #[test]
    fn test_output_paths() {
        let csv = Path::new("/out");
        let (plain, none) = output_paths(csv, SourceKind::Atmosphere, at(2024, 3, 1, 15), false);
        assert_eq!(plain, PathBuf::from("/out/2024/2024-03-01/ec_2024030115.csv"));
        assert!(none.is_none());

        let (plain, zip) = output_paths(csv, SourceKind::Current, at(2024, 3, 1, 0), true);
        assert_eq!(plain, PathBuf::from("/out/2024/2024-03-01/smoc_20240301.csv"));
        assert_eq!(zip, Some(PathBuf::from("/out/2024/2024-03-01/smoc_20240301.csv.zip")));
    }

    #[test]
    fn test_find_daily_input() {
        let dir = tempfile::tempdir().unwrap();
        let month = dir.path().join("smoc/2024/03");
        fs::create_dir_all(month.join("20240301_extra")).unwrap();
        fs::write(month.join("SMOC_20240229_R20240301.nc"), b"").unwrap();
        fs::write(month.join("SMOC_20240301_R20240302.nc"), b"").unwrap();
        fs::write(month.join("SMOC_20240302_R20240303.nc"), b"").unwrap();

        let found = find_daily_input(dir.path(), SourceKind::Current, at(2024, 3, 1, 0)).unwrap();
        assert_eq!(found, month.join("SMOC_20240301_R20240302.nc"));
    }

    #[test]
    fn test_find_daily_input_no_match() {
        let dir = tempfile::tempdir().unwrap();
        let month = dir.path().join("mfwam/2024/03");
        fs::create_dir_all(&month).unwrap();
        fs::write(month.join("mfwam_20240302.nc"), b"").unwrap();

        let err = find_daily_input(dir.path(), SourceKind::Wave, at(2024, 3, 1, 0)).unwrap_err();
        assert!(matches!(err, ExtractionError::InputNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_daily_input_follows_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("mfwam_20240301.nc"), b"").unwrap();

        let month = dir.path().join("mfwam/2024/03");
        fs::create_dir_all(&month).unwrap();
        std::os::unix::fs::symlink(store.join("mfwam_20240301.nc"), month.join("mfwam_20240301.nc")).unwrap();

        let found = find_daily_input(dir.path(), SourceKind::Wave, at(2024, 3, 1, 0)).unwrap();
        assert_eq!(found, month.join("mfwam_20240301.nc"));
    }

    #[test]
    fn test_find_daily_input_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_daily_input(dir.path(), SourceKind::Wave, at(2024, 3, 1, 0)).unwrap_err();
        assert!(matches!(err, ExtractionError::DirectoryScanFailed { .. }));
    }
}
