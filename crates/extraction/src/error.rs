//! Error types for the extraction crate.

use std::path::PathBuf;

use netcdf_parser::NetCdfError;
use thiserror::Error;

/// Errors that abort a single extraction job.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("input not found: {0}")]
    InputNotFound(String),

    #[error("output already exists: {}", .0.display())]
    OutputAlreadyExists(PathBuf),

    #[error("missing variable: {0}")]
    MissingVariable(String),

    #[error("variable {variable} is missing attribute {attribute}")]
    MissingAttribute { variable: String, attribute: String },

    #[error("variable {variable} is malformed: {reason}")]
    InvalidVariable { variable: String, reason: String },

    #[error("failed to open grid source: {0}")]
    SourceOpen(#[source] NetCdfError),

    #[error("failed to scan directory {}: {source}", .dir.display())]
    DirectoryScanFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compress into {}: {source}", .path.display())]
    CompressFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractionError {
    pub fn invalid_variable(variable: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVariable {
            variable: variable.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_attribute(variable: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            variable: variable.into(),
            attribute: attribute.into(),
        }
    }

    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn compress_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CompressFailed {
            path: path.into(),
            source,
        }
    }

    /// True when the job was rejected because its artifact is already there.
    pub fn is_already_done(&self) -> bool {
        matches!(self, Self::OutputAlreadyExists(_))
    }

    /// Map a grid source read error onto the variable it concerns.
    pub(crate) fn from_read(variable: &str, err: NetCdfError) -> Self {
        match err {
            NetCdfError::VariableNotFound(name) => Self::MissingVariable(name),
            NetCdfError::Read { message, .. } => Self::invalid_variable(variable, message),
            other => Self::SourceOpen(other),
        }
    }
}

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;
