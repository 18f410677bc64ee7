//! Dispatcher windowing configuration

use serde::Deserialize;

/// Batch dispatcher settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows parsed and held in memory per dispatch window (B-window size)
    /// Default: 100
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { batch_size: 100 }
    }
}
