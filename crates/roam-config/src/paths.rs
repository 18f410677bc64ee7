//! On-disk directory layout

use std::path::PathBuf;

use serde::Deserialize;

/// Directories used by the engine
///
/// All three are created at startup if missing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Streamed feature collections and metadata documents
    /// Default: "results"
    pub results_dir: PathBuf,

    /// Raw uploaded tables, keyed by file identifier
    /// Default: "uploads"
    pub upload_dir: PathBuf,

    /// Rolling log files
    /// Default: "logs"
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            upload_dir: PathBuf::from("uploads"),
            log_dir: PathBuf::from("logs"),
        }
    }
}
