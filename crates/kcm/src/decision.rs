//! Update decision
//!
//! Compares every managed artifact against the resolved remote content. The
//! first stale artifact is enough to trigger a rewrite of all of them.

use kcm_config::ArtifactPaths;
use tracing::{debug, trace};

use crate::compare::file_matches;
use crate::error::SyncResult;
use crate::metadata::ResolvedFiles;
use crate::writer::Artifact;

/// Find the first managed artifact whose file differs from the remote content
///
/// Artifacts are checked in [`Artifact::ALL`] order and unmanaged ones are
/// skipped entirely. Returns `None` when everything is up to date.
pub fn first_stale(paths: &ArtifactPaths, files: &ResolvedFiles) -> SyncResult<Option<Artifact>> {
    for artifact in Artifact::ALL {
        let Some(path) = artifact.path(paths) else {
            continue;
        };

        if !file_matches(path, &artifact.content(files))? {
            debug!(artifact = %artifact, path = %path.display(), "File is out of date");
            return Ok(Some(artifact));
        }

        trace!(artifact = %artifact, path = %path.display(), "File is up to date");
    }

    Ok(None)
}

/// Whether any managed artifact needs rewriting
pub fn needs_update(paths: &ArtifactPaths, files: &ResolvedFiles) -> SyncResult<bool> {
    Ok(first_stale(paths, files)?.is_some())
}
