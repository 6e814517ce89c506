//! Error types for the nifti module

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for NIfTI header reading and writing
#[derive(Error, Debug)]
pub enum NiftiError {
    /// Error when a file I/O operation fails
    #[error("File I/O error on {path:?}: {source}")]
    FileError {
        /// The path of the file that caused the error
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Error when the header is malformed or inconsistent
    #[error("Invalid NIfTI header: {0}")]
    InvalidFormat(String),

    /// Error when the header is a recognised but unsupported variant
    #[error("Unsupported NIfTI version (sizeof_hdr = {0}), only NIfTI-1 is supported")]
    UnsupportedVersion(i32),

    /// I/O error without a known path (e.g. in-memory readers)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extension of the Result type for nifti operations
pub type Result<T> = std::result::Result<T, NiftiError>;

/// Helper function to convert a std::io::Error to NiftiError
pub fn io_err(path: impl Into<PathBuf>, err: std::io::Error) -> NiftiError {
    NiftiError::FileError {
        path: path.into(),
        source: err,
    }
}

/// Attach a path to path-less I/O errors
pub fn with_path(path: impl Into<PathBuf>, err: NiftiError) -> NiftiError {
    match err {
        NiftiError::Io(source) => io_err(path, source),
        other => other,
    }
}
