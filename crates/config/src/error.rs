//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid file mode {value}: expected octal digits no greater than 7777")]
    InvalidMode { value: u32 },

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}
