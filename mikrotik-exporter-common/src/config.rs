use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

use crate::error::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Verbosity of the exporter's own logs: "trace", "debug", "info", "warn",
    /// "error" or "off".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Parsed `level`.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level).map_err(|_| Error::InvalidLevel(self.level.clone()))
    }

    /// Filter directives used when `RUST_LOG` is not set.
    ///
    /// `level` applies to `crate_name` only. Dependencies (HTTP client and
    /// server stacks) stay at `warn` unless `level` is quieter.
    pub fn directives(&self, crate_name: &str) -> Result<String> {
        let level = self.level_filter()?;
        let dependencies = level.min(LevelFilter::WARN);
        Ok(format!(
            "{},{}={}",
            level_name(dependencies),
            crate_name.replace('-', "_"),
            level_name(level)
        ))
    }
}

fn level_name(level: LevelFilter) -> String {
    level.to_string().to_ascii_lowercase()
}

/// Read and deserialize a JSON5 configuration file.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    json5::from_str(&content).map_err(|source| Error::Parse {
        origin: format!("config file '{}'", path.display()),
        source,
    })
}

/// Deserialize a JSON5 configuration string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|source| Error::Parse {
        origin: "config".to_string(),
        source,
    })
}
