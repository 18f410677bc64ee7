//! Upload and table error types

use std::io;
use thiserror::Error;

/// Result type for table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// Errors from upload handling and row iteration
#[derive(Debug, Error)]
pub enum TableError {
    /// Filesystem failure on the upload directory or a stored file
    #[error("upload I/O failed for '{path}': {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Upload body carried no data
    #[error("uploaded file is empty")]
    EmptyUpload,

    /// Upload has no usable header line
    #[error("uploaded file has no header row")]
    MissingHeader,

    /// No upload registered under this identifier
    #[error("unknown upload '{0}'")]
    UnknownUpload(String),

    /// Fatal read failure while iterating rows
    #[error("failed to read table: {0}")]
    Read(#[from] csv::Error),
}

impl TableError {
    /// Create an Io error
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
