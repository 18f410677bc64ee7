//! Routing daemon client configuration

use std::time::Duration;

use serde::Deserialize;

/// Settings for the OSRM routing daemon client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OsrmConfig {
    /// Base URL of the routing daemon
    /// Default: "http://localhost:5000"
    pub url: String,

    /// Per-request timeout in seconds
    /// Default: 30
    pub timeout_secs: u64,

    /// Maximum concurrent outbound requests per job (K-window size)
    /// Default: 50
    pub max_concurrent: usize,

    /// Launch stagger between requests inside a window, in milliseconds
    /// Default: 0 (disabled)
    pub request_delay_ms: u64,
}

impl OsrmConfig {
    /// Per-request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request launch stagger as a Duration
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".into(),
            timeout_secs: 30,
            max_concurrent: 50,
            request_delay_ms: 0,
        }
    }
}
