//! Job registry error types

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors from job registry operations
#[derive(Debug, Error)]
pub enum JobError {
    /// No job registered (or still retained) under this identifier
    #[error("job '{0}' not found")]
    NotFound(String),

    /// Operation requires a terminal job
    #[error("job '{0}' has not finished")]
    NotTerminal(String),

    /// Filesystem failure while deleting result files
    #[error("job file I/O error: {0}")]
    Io(#[from] std::io::Error),
}
