//! Temporary input/output trees and helpers for reading results back.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use zip::ZipArchive;

/// A throwaway `nc/` + `csv/` tree, removed on drop.
pub struct TestWorkspace {
    dir: TempDir,
    nc_dir: PathBuf,
    csv_dir: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("extraction_test_")
            .tempdir()
            .expect("Failed to create temporary test directory");
        let nc_dir = dir.path().join("nc");
        let csv_dir = dir.path().join("csv");
        fs::create_dir_all(&nc_dir).expect("Failed to create nc dir");
        fs::create_dir_all(&csv_dir).expect("Failed to create csv dir");

        Self {
            dir,
            nc_dir,
            csv_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn nc_dir(&self) -> &Path {
        &self.nc_dir
    }

    pub fn csv_dir(&self) -> &Path {
        &self.csv_dir
    }

    /// Create an empty file (and its parents) under the input tree.
    ///
    /// Jobs check that their input exists before opening it, so in-memory
    /// grids still need a placeholder on disk.
    pub fn touch_input(&self, relative: impl AsRef<Path>) -> PathBuf {
        let path = self.nc_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create input dir");
        }
        File::create(&path).expect("Failed to create input file");
        path
    }

    /// Every file under the output tree, sorted.
    pub fn output_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.csv_dir, &mut files);
        files.sort();
        files
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// Lines of a plain CSV file.
pub fn read_lines(path: impl AsRef<Path>) -> Vec<String> {
    let file = File::open(path.as_ref()).expect("Failed to open CSV");
    BufReader::new(file)
        .lines()
        .collect::<Result<_, _>>()
        .expect("Failed to read CSV")
}

/// Lines of the single entry of a zip archive.
pub fn read_zip_lines(path: impl AsRef<Path>) -> Vec<String> {
    let file = File::open(path.as_ref()).expect("Failed to open archive");
    let mut archive = ZipArchive::new(file).expect("Not a zip archive");
    assert_eq!(archive.len(), 1, "Expected a single-entry archive");

    let mut text = String::new();
    archive
        .by_index(0)
        .expect("Failed to open archive entry")
        .read_to_string(&mut text)
        .expect("Failed to decompress archive");
    text.lines().map(str::to_string).collect()
}

/// Shorthand for a UTC timestamp on the hour.
pub fn utc(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("Invalid test timestamp")
}
