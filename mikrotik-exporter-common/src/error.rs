use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or setting up logging.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {origin}: {source}")]
    Parse {
        origin: String,
        source: json5::Error,
    },

    #[error("Invalid log level '{0}': expected trace, debug, info, warn, error or off")]
    InvalidLevel(String),

    #[error("Failed to initialize tracing: {0}")]
    Tracing(String),
}

/// Result type alias using the common [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
