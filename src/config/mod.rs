//! Configuration Module
//!
//! Provides optional TOML-based configuration for heaptop with support for:
//! - Logging level
//! - Heap collection window and request timeout
//! - Symbol batch size
//! - Report row limit
//! - Environment variable overrides (HEAPTOP__* prefix)
//!
//! The profile URL and output prefix are always given on the command line.

use std::path::Path;
use std::time::Duration;

use config::{Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;

use crate::client::DEFAULT_REQUEST_TIMEOUT;
use crate::fetch::DEFAULT_PROFILE_SECONDS;
use crate::report::DEFAULT_MAX_CALL_STACKS;
use crate::symbol::DEFAULT_BATCH_SIZE;

/// Substitute environment variables in a string.
/// Supports `${VAR}` and `${VAR:-default}` syntax.
fn substitute_env_vars(content: &str) -> String {
    let re = Regex::new(r"\$\{([^}:]+)(?::-([^}]*))?\}").expect("substitution pattern is valid");
    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}


/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file
    Io(std::io::Error),
    /// TOML parsing error
    Parse(toml::de::Error),
    /// Config crate error
    Config(config::ConfigError),
    /// Validation error
    Validation(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Config(e) => write!(f, "Config error: {}", e),
            ConfigError::Validation(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(e: config::ConfigError) -> Self {
        ConfigError::Config(e)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,
    /// Heap profile endpoint settings
    pub profiler: ProfilerConfig,
    /// Symbol resolution settings
    pub symbolizer: SymbolizerConfig,
    /// Report rendering settings
    pub report: ReportConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Heap profile endpoint settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Collection window requested via `/heap?seconds=`
    #[serde(default = "default_seconds")]
    pub seconds: u64,
    /// Upper bound on each HTTP request (e.g. "90s", "2m")
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_seconds() -> u64 {
    DEFAULT_PROFILE_SECONDS
}
fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            seconds: default_seconds(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Symbol resolution settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SymbolizerConfig {
    /// Addresses per `/symbol` request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for SymbolizerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
        }
    }
}

/// Report rendering settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows per report
    #[serde(default = "default_max_call_stacks")]
    pub max_call_stacks: usize,
}

fn default_max_call_stacks() -> usize {
    DEFAULT_MAX_CALL_STACKS
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_call_stacks: default_max_call_stacks(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file with environment variable overrides.
    ///
    /// Supports two forms of environment variable usage:
    /// 1. In-file substitution: `${VAR}` or `${VAR:-default}` syntax in the TOML file
    /// 2. Override via env vars: `HEAPTOP__` prefix with double underscores for nesting:
    ///    - `HEAPTOP__PROFILER__SECONDS=60` overrides `profiler.seconds`
    ///    - `HEAPTOP__SYMBOLIZER__BATCH_SIZE=50` overrides `symbolizer.batch_size`
    ///    - `HEAPTOP__LOG__LEVEL=debug` overrides `log.level`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            // Start with defaults
            .set_default("log.level", default_log_level())?
            .set_default("profiler.seconds", DEFAULT_PROFILE_SECONDS)?
            .set_default(
                "profiler.request_timeout",
                format!("{}s", DEFAULT_REQUEST_TIMEOUT.as_secs()),
            )?
            .set_default("symbolizer.batch_size", DEFAULT_BATCH_SIZE as u64)?
            .set_default("report.max_call_stacks", DEFAULT_MAX_CALL_STACKS as u64)?;

        // Load from file with env var substitution
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let substituted = substitute_env_vars(&content);
                builder = builder.add_source(File::from_str(&substituted, FileFormat::Toml));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File doesn't exist, use defaults
            }
            Err(e) => return Err(ConfigError::Io(e)),
        }

        // Override with environment variables (HEAPTOP__PROFILER__SECONDS, etc.)
        // Double underscore separates nested keys, single underscore preserved in field names
        let cfg = builder
            .add_source(
                Environment::with_prefix("HEAPTOP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides only (no file).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Path::new(""))
    }

    /// Parse configuration from a string (for testing, no env var support)
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbolizer.batch_size == 0 {
            return Err(ConfigError::Validation(
                "symbolizer.batch_size must be at least 1".to_string(),
            ));
        }

        if self.report.max_call_stacks == 0 {
            return Err(ConfigError::Validation(
                "report.max_call_stacks must be at least 1".to_string(),
            ));
        }

        if self.profiler.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "profiler.request_timeout must be greater than zero".to_string(),
            ));
        }

        // The heap handler blocks for the whole collection window
        if self.profiler.request_timeout <= Duration::from_secs(self.profiler.seconds) {
            return Err(ConfigError::Validation(format!(
                "profiler.request_timeout ({:?}) must exceed profiler.seconds ({}s)",
                self.profiler.request_timeout,
                self.profiler.seconds
            )));
        }

        Ok(())
    }
}
