//! Error types for certificate synchronization.

use std::path::PathBuf;
use std::time::Duration;

use kcm_config::ConfigError;
use thiserror::Error;

use crate::writer::Artifact;

/// Result type for per-entry operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised while fetching remote content.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, TLS, or body read failure.
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any non-2xx status other than a tolerated 404.
    #[error("unexpected status code {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The per-request deadline elapsed.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The caller cancelled the run.
    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

/// Errors that fail processing of a single certificate entry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to fetch: {0}")]
    Fetch(#[from] FetchError),

    #[error("failed to decode metadata from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to access {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {artifact} file {}: {source}", .path.display())]
    Write {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set permissions for {artifact} file {}: {source}", .path.display())]
    Permissions {
        artifact: Artifact,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run command {command:?}: {source}")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {command:?} exited with {}", exit_description(.status))]
    CommandFailed { command: String, status: Option<i32> },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn exit_description(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl SyncError {
    /// Whether this error came from the post-update command phase.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::CommandSpawn { .. } | Self::CommandFailed { .. })
    }

    /// Whether this error came from the artifact write phase.
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Permissions { .. })
    }
}
