//! Projection error types

use thiserror::Error;

/// Result type for projection operations
pub type Result<T> = std::result::Result<T, ProjError>;

/// Errors from catalog lookup and coordinate transformation
#[derive(Debug, Clone, Error)]
pub enum ProjError {
    /// Reference system identifier is not in the catalog
    #[error("unknown reference system '{0}'")]
    UnknownCrs(String),

    /// proj4 definition string failed to compile
    #[error("invalid proj4 definition for '{code}': {message}")]
    Compile {
        /// Reference system identifier
        code: String,
        /// Parser message
        message: String,
    },

    /// The forward transform itself failed
    #[error("transform failed: {0}")]
    Transform(String),

    /// Transform produced a coordinate outside the WGS84 envelope
    /// or a non-finite component
    #[error("coordinate out of range after transform: ({lon}, {lat})")]
    OutOfRange {
        /// Longitude produced by the transform
        lon: f64,
        /// Latitude produced by the transform
        lat: f64,
    },
}

impl ProjError {
    /// Create a Compile error
    pub fn compile(code: impl Into<String>, message: impl ToString) -> Self {
        Self::Compile {
            code: code.into(),
            message: message.to_string(),
        }
    }
}
