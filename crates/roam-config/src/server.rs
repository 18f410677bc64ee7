//! HTTP server configuration

use serde::Deserialize;

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    /// Default: "0.0.0.0"
    pub host: String,

    /// Bind port
    /// Default: 3000
    pub port: u16,

    /// Maximum accepted upload size in bytes
    /// Default: 52428800 (50 MiB)
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Bind address as `host:port`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            max_upload_bytes: 50 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }
}
