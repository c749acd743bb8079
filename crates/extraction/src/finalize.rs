//! Turning a rendered CSV into the job's final artifact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExtractionError, Result};

/// Sibling path used while a file is being written.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".partial");
    PathBuf::from(name)
}

/// Deletes a file when dropped, whatever path the caller took out.
struct RemoveOnDrop<'a>(&'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        match fs::remove_file(self.0) {
            Ok(()) => debug!(path = %self.0.display(), "Removed uncompressed CSV"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "Failed to remove uncompressed CSV"),
        }
    }
}

/// Produce the final artifact for a fully written CSV.
///
/// Without a compressed destination the CSV itself is the artifact. With
/// one, the CSV is stored as the single deflated entry of a zip archive
/// (named after the CSV file) and then deleted, on success and on failure
/// alike. An existing destination is never overwritten.
pub fn finalize(tabular: &Path, compressed: Option<&Path>) -> Result<PathBuf> {
    let Some(dest) = compressed else {
        return Ok(tabular.to_path_buf());
    };

    let _cleanup = RemoveOnDrop(tabular);

    if dest.exists() {
        return Err(ExtractionError::OutputAlreadyExists(dest.to_path_buf()));
    }

    let partial = partial_path(dest);
    let result = write_archive(tabular, &partial).and_then(|()| fs::rename(&partial, dest));

    match result {
        Ok(()) => {
            debug!(path = %dest.display(), "Wrote compressed artifact");
            Ok(dest.to_path_buf())
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(ExtractionError::compress_failed(dest, e))
        }
    }
}

fn write_archive(tabular: &Path, archive: &Path) -> io::Result<()> {
    let entry_name = tabular
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut input = File::open(tabular)?;
    let output = File::create(archive)?;

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(output);
    writer.start_file(entry_name, options)?;
    io::copy(&mut input, &mut writer)?;

    let output = writer.finish()?;
    output.sync_all()
}
