//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment variable is set but unparseable
    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv {
        /// Variable name
        name: &'static str,
        /// The offending value
        value: String,
    },

    /// Validation error - a field holds an unusable value
    #[error("[{section}] has invalid {field}: {message}")]
    InvalidValue {
        /// Config section
        section: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::invalid_value("osrm", "max_concurrent", "must be at least 1");
        assert!(err.to_string().contains("osrm"));
        assert!(err.to_string().contains("max_concurrent"));
    }

    #[test]
    fn test_invalid_env_display() {
        let err = ConfigError::InvalidEnv {
            name: "BATCH_SIZE",
            value: "ten".into(),
        };
        assert!(err.to_string().contains("BATCH_SIZE"));
        assert!(err.to_string().contains("ten"));
    }
}
