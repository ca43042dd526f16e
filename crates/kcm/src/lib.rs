//! kcm - certificate file synchronization
//!
//! Keeps locally stored TLS certificate files in sync with certificate
//! material published by a remote metadata endpoint. For every configured
//! entry a run:
//!
//! 1. Fetches the metadata document and the certificate, key, and chain it
//!    points to
//! 2. Compares each managed local file with the remote content
//! 3. If anything differs, rewrites every managed file with the right mode
//! 4. Runs the entry's post-update commands (e.g. service reloads)
//!
//! Runs are idempotent: with unchanged remote content, a second run writes
//! nothing and runs no commands.
//!
//! # Example
//!
//! ```ignore
//! use kcm::{run_all, HttpFetcher, DEFAULT_TIMEOUT};
//! use kcm_config::Config;
//! use tokio_util::sync::CancellationToken;
//!
//! let config = Config::from_file("/etc/kcm.yaml")?;
//! let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT)?;
//! let summary = run_all(&config.certificates, &fetcher, 1, &CancellationToken::new()).await;
//! println!("{} of {} updated", summary.updated(), summary.total());
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod commands;
pub mod compare;
pub mod decision;
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod orchestrator;
pub mod writer;

#[cfg(test)]
mod testing;

// ============================================================================
// Public API Re-exports
// ============================================================================

// Errors
pub use error::{FetchError, SyncError, SyncResult};

// Fetching
pub use fetch::{fetch_content, Fetcher, HttpFetcher, DEFAULT_TIMEOUT};

// Metadata
pub use metadata::{fetch_metadata, resolve, MetadataUrls, RemoteMetadata, ResolvedFiles};

// Decision and materialization
pub use compare::file_matches;
pub use decision::{first_stale, needs_update};
pub use writer::{write_all, Artifact};

// Commands
pub use commands::run_commands;

// Orchestration
pub use orchestrator::{process_entry, run_all, EntryOutcome, RunSummary, Stage};
