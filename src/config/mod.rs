//! Configuration management for bsonjson
//!
//! This module handles loading, parsing, and validating configuration:
//! - Configuration files (TOML format)
//! - Command-line arguments
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Configuration file
//! 3. Default values

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::converter::DEFAULT_INDENT;
use crate::error::{BsonJsonError, ConfigError, Result};
use crate::filter::DEFAULT_SEARCH_KEY;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Conversion configuration
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Payload filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Resource pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// HTTP fetch configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// JSON rendering and stream handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Spaces per indentation level of rendered JSON
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Validate every element of a BSON stream before converting it
    #[serde(default)]
    pub validate: bool,
}

/// Payload filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Elements whose `AssetName` contains this substring are removed
    #[serde(default = "default_search_key")]
    pub search_key: String,
}

/// Working directories of the resource pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Where downloaded resources are stored during a run
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where intermediate JSON files are written
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// Keep the filtered JSON file after the run
    #[serde(default)]
    pub keep_intermediate: bool,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Request timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl FetchConfig {
    /// Get request timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Additional log file (logs always go to stderr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_indent() -> usize {
    DEFAULT_INDENT
}

fn default_search_key() -> String {
    DEFAULT_SEARCH_KEY.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("bsonjson/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            validate: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            search_key: default_search_key(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            results_dir: default_results_dir(),
            keep_intermediate: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: None,
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// Without an explicit path the default location is tried, and a
    /// missing default file yields the default configuration. An explicit
    /// path must exist.
    ///
    /// # Arguments
    /// * `path` - Optional path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::FileNotFound(explicit.display().to_string()).into());
                }
                explicit.to_path_buf()
            }
            None => {
                let default = Self::default_config_path();
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| BsonJsonError::io(&path, e))?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `<config dir>/bsonjson/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bsonjson")
            .join("config.toml")
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidFormat(e.to_string()).into())
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error naming the first bad field otherwise
    pub fn validate(&self) -> Result<()> {
        if self.convert.indent > 16 {
            return Err(invalid("convert.indent", self.convert.indent));
        }
        if self.fetch.timeout == 0 {
            return Err(invalid("fetch.timeout", self.fetch.timeout));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(invalid("fetch.user_agent", "<empty>"));
        }
        if self.pipeline.data_dir.as_os_str().is_empty() {
            return Err(invalid("pipeline.data_dir", "<empty>"));
        }
        if self.pipeline.results_dir.as_os_str().is_empty() {
            return Err(invalid("pipeline.results_dir", "<empty>"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString) -> BsonJsonError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
