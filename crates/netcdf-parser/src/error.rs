//! Error types for grid source operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for grid source operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for opening and reading grid sources.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file could not be opened as a grid source
    #[error("failed to open {path}: {message}")]
    Open { path: PathBuf, message: String },

    /// The requested variable does not exist in the source
    #[error("variable not found: {0}")]
    VariableNotFound(String),

    /// The variable exists but its values could not be read
    #[error("failed to read variable {name}: {message}")]
    Read { name: String, message: String },
}

impl NetCdfError {
    pub fn open(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn read(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            name: name.into(),
            message: message.into(),
        }
    }
}
