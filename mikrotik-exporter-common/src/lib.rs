//! Shared configuration loading, logging setup and error types for the
//! MikroTik exporter.

pub mod config;
pub mod error;

pub use config::{LogFormat, LoggingConfig, load_config, parse_config};
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber for the binary `crate_name`.
///
/// `RUST_LOG`, when set, replaces the filter entirely. Otherwise
/// `config.level` applies to `crate_name` and dependencies stay at `warn`.
pub fn init_tracing(config: &LoggingConfig, crate_name: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.directives(crate_name)?)
            .map_err(|e| Error::Tracing(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    installed.map_err(|e| Error::Tracing(e.to_string()))
}
