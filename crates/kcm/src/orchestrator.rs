//! Per-entry processing and run aggregation
//!
//! Each entry moves through fetching, deciding, writing, and running
//! commands. A failure ends that entry only; the run always continues with
//! the next entry.

use std::fmt;

use futures::stream::{self, StreamExt};
use kcm_config::CertificateEntry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::commands::run_commands;
use crate::decision::first_stale;
use crate::error::SyncError;
use crate::fetch::Fetcher;
use crate::metadata::{fetch_metadata, resolve};
use crate::writer::write_all;

/// Processing stage an entry failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Deciding,
    Writing,
    RunningCommands,
}

impl Stage {
    /// Whether a failure at this stage means files were (or may have been) changed
    pub fn implies_update(self) -> bool {
        matches!(self, Self::Writing | Self::RunningCommands)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetching => "fetching",
            Self::Deciding => "deciding",
            Self::Writing => "writing",
            Self::RunningCommands => "running commands",
        })
    }
}

/// Result of processing one certificate entry
#[derive(Debug)]
pub struct EntryOutcome {
    /// Metadata URL of the entry
    pub url: String,
    /// Whether an update was attempted; true even if it did not complete
    pub updated: bool,
    /// Failure, if any, with the stage it happened in
    pub failure: Option<(Stage, SyncError)>,
}

impl EntryOutcome {
    fn unchanged(url: &str) -> Self {
        Self {
            url: url.to_string(),
            updated: false,
            failure: None,
        }
    }

    fn updated(url: &str) -> Self {
        Self {
            url: url.to_string(),
            updated: true,
            failure: None,
        }
    }

    fn failed(url: &str, stage: Stage, error: SyncError) -> Self {
        Self {
            url: url.to_string(),
            updated: stage.implies_update(),
            failure: Some((stage, error)),
        }
    }

    /// Whether processing completed without error
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// The error, if processing failed
    pub fn error(&self) -> Option<&SyncError> {
        self.failure.as_ref().map(|(_, error)| error)
    }

    /// The stage processing failed in
    pub fn failed_stage(&self) -> Option<Stage> {
        self.failure.as_ref().map(|(stage, _)| *stage)
    }
}

/// Outcomes of one run, in configuration order
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<EntryOutcome>,
}

impl RunSummary {
    /// Entries updated without error
    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.updated && o.is_success())
            .count()
    }

    /// Entries that failed at any stage
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_success()).count()
    }

    /// Entries processed
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether every entry completed without error
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// Synchronize a single certificate entry
pub async fn process_entry(
    entry: &CertificateEntry,
    fetcher: &dyn Fetcher,
    cancel: &CancellationToken,
) -> EntryOutcome {
    let url = entry.url.as_str();

    let metadata = match fetch_metadata(fetcher, url, cancel).await {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(url = %url, error = %e, "Could not get metadata");
            return EntryOutcome::failed(url, Stage::Fetching, e);
        }
    };

    // A failed sub-resource fetch does not stop the entry: the decision and
    // write phases run with whatever content was obtained
    let files = match resolve(&metadata.urls, fetcher, cancel).await {
        Ok(files) => files,
        Err(partial) => {
            error!(url = %url, error = %partial.error, "Failed to get certificate files");
            partial.files
        }
    };

    match first_stale(&entry.paths, &files) {
        Ok(None) => {
            info!(url = %url, "No update needed at this time");
            return EntryOutcome::unchanged(url);
        }
        Ok(Some(artifact)) => {
            info!(url = %url, artifact = %artifact, "Update required");
        }
        Err(e) => {
            error!(url = %url, error = %e, "Could not compare local files");
            return EntryOutcome::failed(url, Stage::Deciding, e);
        }
    }

    if let Err(e) = write_all(entry, &files) {
        return EntryOutcome::failed(url, Stage::Writing, e);
    }

    if let Err(e) = run_commands(&entry.commands).await {
        return EntryOutcome::failed(url, Stage::RunningCommands, e);
    }

    info!(url = %url, "Certificate updated");
    EntryOutcome::updated(url)
}

/// Synchronize every entry and summarize the run
///
/// With `jobs > 1` up to that many entries are in flight at once. Outcomes
/// are still reported in configuration order. Entries sharing file paths
/// must not be processed concurrently.
pub async fn run_all(
    entries: &[CertificateEntry],
    fetcher: &dyn Fetcher,
    jobs: usize,
    cancel: &CancellationToken,
) -> RunSummary {
    info!(quantity = entries.len(), jobs = jobs.max(1), "Processing certificates");

    let outcomes: Vec<EntryOutcome> = stream::iter(entries.iter().enumerate())
        .map(|(index, entry)| {
            let span = info_span!("certificate", index, url = %entry.url);
            process_entry(entry, fetcher, cancel).instrument(span)
        })
        .buffered(jobs.max(1))
        .collect()
        .await;

    for outcome in &outcomes {
        if let Some((stage, e)) = &outcome.failure {
            warn!(
                url = %outcome.url,
                stage = %stage,
                updated = outcome.updated,
                error = %e,
                "Failed to process certificate"
            );
        }
    }

    let summary = RunSummary { outcomes };

    info!(
        updated = summary.updated(),
        failed = summary.failed(),
        total = summary.total(),
        "All done"
    );

    summary
}
