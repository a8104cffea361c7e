//! Service configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `PROCUREMENT__`
//! (e.g. `PROCUREMENT__SERVER__PORT=9090`).

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default configuration file name, overridable with `PROCUREMENT_CONFIG`
pub const DEFAULT_CONFIG_FILE: &str = "procurement.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub estimation: EstimationConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Estimation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimationConfig {
    /// Methods used when a caller does not select any
    #[serde(default = "default_methods")]
    pub default_methods: Vec<String>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_methods() -> Vec<String> {
    vec![
        "market-based".to_string(),
        "analogous".to_string(),
        "parametric".to_string(),
        "bottom-up".to_string(),
        "expert-judgment".to_string(),
    ]
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_capacity() -> u64 {
    1_000
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            default_methods: default_methods(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl EstimationConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Config {
    /// Load from `PROCUREMENT_CONFIG` (or the default file) plus environment
    pub fn load() -> Result<Self> {
        let path = std::env::var("PROCUREMENT_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_file(&path, false)
    }

    /// Load from a TOML file layered under environment overrides
    pub fn from_file(path: &str, required: bool) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix("PROCUREMENT")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("estimation.default_methods")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Parse configuration from a TOML string (no environment layer)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.estimation.default_methods.len(), 5);
        assert_eq!(config.estimation.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9090

            [estimation]
            default_methods = ["market-based", "bottom-up"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.estimation.default_methods,
            vec!["market-based".to_string(), "bottom-up".to_string()]
        );
        assert_eq!(config.estimation.cache_capacity, 1_000);
    }

    #[test]
    fn test_bind_address() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_body_bytes: 1024,
        };
        assert_eq!(server.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_optional_file() {
        let config = Config::from_file("does-not-exist.toml", false);
        assert!(config.is_ok());
    }
}
