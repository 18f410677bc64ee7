//! Output error types

use std::io;
use thiserror::Error;

/// Result type for output operations
pub type Result<T> = std::result::Result<T, OutputError>;

/// Errors from the result writer
///
/// Any of these is job-fatal: a sink that cannot write cannot produce a
/// trustworthy collection.
#[derive(Debug, Error)]
pub enum OutputError {
    /// I/O error on the result or metadata file
    #[error("result I/O error: {0}")]
    Io(#[from] io::Error),

    /// A feature failed to serialise
    #[error("failed to serialise feature: {0}")]
    Serialise(#[from] serde_json::Error),
}
