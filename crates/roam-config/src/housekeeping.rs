//! Retention and cleanup configuration

use std::time::Duration;

use serde::Deserialize;

/// Background housekeeping settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Maximum terminal job records retained in memory
    /// Default: 100
    pub max_jobs_kept: usize,

    /// Maximum result/metadata file pairs retained on disk
    /// Default: 200
    pub max_results_kept: usize,

    /// Cancel jobs still processing after this many seconds (0 = disabled)
    /// Default: 0
    pub job_timeout_secs: u64,

    /// Interval between housekeeping passes, in seconds
    /// Default: 300
    pub cleanup_interval_secs: u64,

    /// Delete a job's files when its record is evicted
    /// Default: false
    pub immediate_cleanup: bool,
}

impl HousekeepingConfig {
    /// Housekeeping pass interval as a Duration
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }

    /// Job timeout, if enabled
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            max_jobs_kept: 100,
            max_results_kept: 200,
            job_timeout_secs: 0,
            cleanup_interval_secs: 300,
            immediate_cleanup: false,
        }
    }
}
