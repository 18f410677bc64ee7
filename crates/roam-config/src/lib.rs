//! Roam configuration
//!
//! TOML-based configuration loading with sensible defaults, overridable from
//! the process environment. Minimal config should just work - only specify
//! what you need to change.
//!
//! # Precedence
//!
//! Defaults < TOML file < environment variables.
//!
//! # Example Minimal Config
//!
//! ```toml
//! [osrm]
//! url = "http://localhost:5000"
//!
//! [paths]
//! results_dir = "results/"
//! ```
//!
//! # Environment Variables
//!
//! `OSRM_URL`, `RESULTS_DIR`, `UPLOAD_DIR`, `LOG_DIR`, `BATCH_SIZE`,
//! `OSRM_MAX_CONCURRENT`, `OSRM_REQUEST_DELAY`, `MAX_JOBS_KEPT`,
//! `MAX_RESULTS_KEPT`, `JOB_TIMEOUT`, `FILE_CLEANUP_INTERVAL`,
//! `IMMEDIATE_CLEANUP`, `PORT`.

mod engine;
mod error;
mod housekeeping;
mod logging;
mod osrm;
mod paths;
mod server;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use engine::EngineConfig;
pub use error::{ConfigError, Result};
pub use housekeeping::HousekeepingConfig;
pub use logging::{LogConfig, LogLevel};
pub use osrm::OsrmConfig;
pub use paths::PathsConfig;
pub use server::ServerConfig;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings (bind address, upload limits)
    pub server: ServerConfig,

    /// On-disk directory layout
    pub paths: PathsConfig,

    /// Routing daemon client settings
    pub osrm: OsrmConfig,

    /// Dispatcher windowing settings
    pub engine: EngineConfig,

    /// Retention and cleanup settings
    pub housekeeping: HousekeepingConfig,

    /// Logging configuration
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        content.parse()
    }

    /// Load configuration from a TOML file if it exists, else defaults,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from the process environment
    ///
    /// Unset variables leave the current value untouched. A set-but-invalid
    /// value is a hard error: silently falling back would mask typos in
    /// deployment manifests.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(url) = env_string("OSRM_URL") {
            self.osrm.url = url;
        }
        if let Some(dir) = env_string("RESULTS_DIR") {
            self.paths.results_dir = dir.into();
        }
        if let Some(dir) = env_string("UPLOAD_DIR") {
            self.paths.upload_dir = dir.into();
        }
        if let Some(dir) = env_string("LOG_DIR") {
            self.paths.log_dir = dir.into();
        }
        if let Some(n) = env_parse("BATCH_SIZE")? {
            self.engine.batch_size = n;
        }
        if let Some(n) = env_parse("OSRM_MAX_CONCURRENT")? {
            self.osrm.max_concurrent = n;
        }
        if let Some(n) = env_parse("OSRM_REQUEST_DELAY")? {
            self.osrm.request_delay_ms = n;
        }
        if let Some(n) = env_parse("OSRM_TIMEOUT")? {
            self.osrm.timeout_secs = n;
        }
        if let Some(n) = env_parse("MAX_JOBS_KEPT")? {
            self.housekeeping.max_jobs_kept = n;
        }
        if let Some(n) = env_parse("MAX_RESULTS_KEPT")? {
            self.housekeeping.max_results_kept = n;
        }
        if let Some(n) = env_parse("JOB_TIMEOUT")? {
            self.housekeeping.job_timeout_secs = n;
        }
        if let Some(n) = env_parse("FILE_CLEANUP_INTERVAL")? {
            self.housekeeping.cleanup_interval_secs = n;
        }
        if let Some(b) = env_parse("IMMEDIATE_CLEANUP")? {
            self.housekeeping.immediate_cleanup = b;
        }
        if let Some(port) = env_parse("PORT")? {
            self.server.port = port;
        }
        Ok(())
    }

    /// Validate cross-field constraints
    ///
    /// Called once at startup; a validation failure is fatal (non-zero exit).
    pub fn validate(&self) -> Result<()> {
        if self.engine.batch_size == 0 {
            return Err(ConfigError::invalid_value(
                "engine",
                "batch_size",
                "must be at least 1",
            ));
        }
        if self.osrm.max_concurrent == 0 {
            return Err(ConfigError::invalid_value(
                "osrm",
                "max_concurrent",
                "must be at least 1",
            ));
        }
        if self.osrm.max_concurrent > self.engine.batch_size {
            return Err(ConfigError::invalid_value(
                "osrm",
                "max_concurrent",
                format!(
                    "must not exceed engine.batch_size ({})",
                    self.engine.batch_size
                ),
            ));
        }
        if !self.osrm.url.starts_with("http://") && !self.osrm.url.starts_with("https://") {
            return Err(ConfigError::invalid_value(
                "osrm",
                "url",
                format!("'{}' is not an http(s) URL", self.osrm.url),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server",
                "max_upload_bytes",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

/// Read a string environment variable, treating empty as unset
fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read and parse an environment variable
fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    match env_string(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.engine.batch_size, 100);
        assert_eq!(config.osrm.max_concurrent, 50);
        assert_eq!(config.osrm.url, "http://localhost:5000");
    }

    #[test]
    fn test_parse_empty() {
        let config: Config = "".parse().unwrap();
        assert_eq!(config.housekeeping.max_jobs_kept, 100);
    }

    #[test]
    fn test_parse_partial() {
        let toml = r#"
[osrm]
url = "http://osrm.internal:5000"
max_concurrent = 20

[engine]
batch_size = 50
"#;
        let config: Config = toml.parse().unwrap();
        assert_eq!(config.osrm.url, "http://osrm.internal:5000");
        assert_eq!(config.osrm.max_concurrent, 20);
        assert_eq!(config.engine.batch_size, 50);
        // Defaults still apply
        assert_eq!(config.osrm.timeout_secs, 30);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.engine.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_window_inversion() {
        // K must not exceed B
        let mut config = Config::default();
        config.engine.batch_size = 10;
        config.osrm.max_concurrent = 50;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = Config::default();
        config.osrm.url = "localhost:5000".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/roam.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/roam.toml"));
    }
}
