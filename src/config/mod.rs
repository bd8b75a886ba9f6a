//! Configuration module for Track Gateway
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation. Every section has defaults,
//! so the gateway also runs without a configuration file.

use crate::convert::TrackFormat;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub convert: ConvertConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .address
            .parse::<SocketAddr>()
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Invalid server address '{}': {}",
                    self.server.address, e
                ))
            })?;

        if self.convert.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Converter binary cannot be empty".into(),
            ));
        }

        let input = self.convert.input_format()?;
        if !input.is_xml() {
            return Err(ConfigError::ValidationError(format!(
                "Input format '{}' is not an XML format",
                self.convert.input_format
            )));
        }
        self.convert.output_format()?;

        if self.convert.max_upload_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_upload_size must be greater than zero".into(),
            ));
        }

        if self.convert.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_seconds must be greater than zero".into(),
            ));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid logging format '{}': must be 'json' or 'pretty'",
                    other
                )))
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0:8080".to_string()
}

/// Conversion settings: which tool to run, default formats, and where uploads are staged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Path or name of the gpsbabel executable. Default: "gpsbabel"
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Format assumed for uploads when the request does not name one. Default: "gtrnctr"
    #[serde(default = "default_input_format")]
    pub input_format: String,

    /// Format produced when the request does not name one. Default: "gpx"
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Parent directory of the per-request staging directories. Default: "tmp"
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Largest accepted upload in bytes. Default: 1MB
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,

    /// Seconds the converter may run before it is killed. Default: 30
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ConvertConfig {
    /// Parsed default input format
    pub fn input_format(&self) -> Result<TrackFormat, ConfigError> {
        parse_format(&self.input_format)
    }

    /// Parsed default output format
    pub fn output_format(&self) -> Result<TrackFormat, ConfigError> {
        parse_format(&self.output_format)
    }
}

fn parse_format(name: &str) -> Result<TrackFormat, ConfigError> {
    name.parse()
        .map_err(|_| ConfigError::ValidationError(format!("Unsupported format '{}'", name)))
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            input_format: default_input_format(),
            output_format: default_output_format(),
            work_dir: default_work_dir(),
            max_upload_size: default_max_upload_size(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_binary() -> String {
    "gpsbabel".to_string()
}

fn default_input_format() -> String {
    "gtrnctr".to_string()
}

fn default_output_format() -> String {
    "gpx".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_max_upload_size() -> u64 {
    1048576 // 1MB
}

fn default_timeout_seconds() -> u64 {
    30
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

/// Log output configuration.
///
/// `RUST_LOG` takes precedence over `level` when it is set.
///
/// # Example
///
/// ```yaml
/// logging:
///   level: "debug"
///   format: "pretty"  # json | pretty
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.address, "0.0.0.0:8080");
        assert_eq!(config.convert.max_upload_size, 1048576);
        assert_eq!(config.convert.input_format().unwrap(), TrackFormat::Tcx);
        assert_eq!(config.convert.output_format().unwrap(), TrackFormat::Gpx);
    }

    #[test]
    fn test_config_validation_invalid_address() {
        let mut config = Config::default();
        config.server.address = "invalid".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_unknown_format() {
        let mut config = Config::default();
        config.convert.output_format = "shapefile".into();

        match config.validate() {
            Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("shapefile")),
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_config_validation_non_xml_input() {
        let mut config = Config::default();
        config.convert.input_format = "geojson".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.convert.max_upload_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.convert.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_logging_format() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }
}
