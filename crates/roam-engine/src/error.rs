//! Engine error types

use serde::Serialize;
use thiserror::Error;

/// One field-level validation failure
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    /// Offending configuration field
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldError {
    /// Create a field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors from job submission
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced upload does not exist
    #[error("unknown upload '{0}'")]
    UnknownUpload(String),

    /// The configuration failed validation
    #[error("invalid routing configuration")]
    Validation(Vec<FieldError>),
}

/// Fatal dispatcher failures - any of these aborts the whole job
#[derive(Debug, Error)]
pub(crate) enum DispatchError {
    #[error("failed to read upload: {0}")]
    Table(#[from] roam_table::TableError),

    #[error("projection setup failed: {0}")]
    Proj(#[from] roam_proj::ProjError),

    #[error("failed to write results: {0}")]
    Output(#[from] roam_output::OutputError),

    #[error("unknown reference system '{0}'")]
    UnknownCrs(String),
}
