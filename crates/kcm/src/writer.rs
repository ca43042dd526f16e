//! Artifact materialization
//!
//! Writes the configured subset of the four artifacts and applies the file
//! mode of each artifact's permission class. Writes are not atomic across
//! artifacts: a failure part-way leaves earlier artifacts rewritten, and the
//! next run repairs the rest through the same comparison.
//!
//! An empty chain is never written. A chain file left over from an earlier
//! certificate is removed instead, so an absent chain file is what matches
//! an unpublished chain.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use kcm_config::{ArtifactPaths, CertificateEntry, PermissionClass};
use tracing::{error, info};

use crate::error::{SyncError, SyncResult};
use crate::metadata::ResolvedFiles;

/// One kind of file this tool may manage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Certificate,
    PrivateKey,
    Chain,
    CertificateWithChain,
}

impl Artifact {
    /// All artifacts, in comparison and write order
    pub const ALL: [Artifact; 4] = [
        Artifact::Certificate,
        Artifact::PrivateKey,
        Artifact::Chain,
        Artifact::CertificateWithChain,
    ];

    /// Permission class applied when writing this artifact
    pub fn permission_class(self) -> PermissionClass {
        match self {
            Self::PrivateKey => PermissionClass::Key,
            Self::Certificate | Self::Chain | Self::CertificateWithChain => {
                PermissionClass::Certificate
            }
        }
    }

    /// Configured path for this artifact, if it is managed
    pub fn path(self, paths: &ArtifactPaths) -> Option<&Path> {
        match self {
            Self::Certificate => paths.certificate(),
            Self::PrivateKey => paths.private_key(),
            Self::Chain => paths.chain(),
            Self::CertificateWithChain => paths.certificate_with_chain(),
        }
    }

    /// Expected content of this artifact
    pub fn content(self, files: &ResolvedFiles) -> String {
        match self {
            Self::Certificate => files.certificate.clone(),
            Self::PrivateKey => files.private_key.clone(),
            Self::Chain => files.chain.clone(),
            Self::CertificateWithChain => files.certificate_with_chain(),
        }
    }

    /// Human readable name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Certificate => "certificate",
            Self::PrivateKey => "private key",
            Self::Chain => "chain",
            Self::CertificateWithChain => "certificate with chain",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write every configured artifact for an entry
///
/// Unconfigured artifacts are skipped. When no chain is published the chain
/// file is removed rather than written. Both file modes are resolved before
/// anything is touched. Stops at the first failure. Returns the paths
/// written.
pub fn write_all(entry: &CertificateEntry, files: &ResolvedFiles) -> SyncResult<Vec<PathBuf>> {
    let certificate_mode = entry.permissions.mode(PermissionClass::Certificate)?;
    let key_mode = entry.permissions.mode(PermissionClass::Key)?;

    let mut written = Vec::new();

    for artifact in Artifact::ALL {
        let Some(path) = artifact.path(&entry.paths) else {
            info!(artifact = %artifact, "Not saving file because no path defined");
            continue;
        };

        let content = artifact.content(files);

        if artifact == Artifact::Chain && content.is_empty() {
            remove_stale_chain(path)?;
            continue;
        }

        let mode = match artifact.permission_class() {
            PermissionClass::Certificate => certificate_mode,
            PermissionClass::Key => key_mode,
        };
        write_artifact(artifact, path, &content, mode)?;
        written.push(path.to_path_buf());
    }

    Ok(written)
}

/// Remove a chain file that no longer has published content
fn remove_stale_chain(path: &Path) -> SyncResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "No chain provided, removed previous chain file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No chain provided, not saving chain file");
            Ok(())
        }
        Err(source) => {
            error!(path = %path.display(), error = %source, "Failed to remove chain file");
            Err(SyncError::Write {
                artifact: Artifact::Chain,
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Write one artifact and set its mode
fn write_artifact(artifact: Artifact, path: &Path, content: &str, mode: u32) -> SyncResult<()> {
    let write_error = |source: std::io::Error| {
        error!(artifact = %artifact, path = %path.display(), error = %source, "Failed to write file");
        SyncError::Write {
            artifact,
            path: path.to_path_buf(),
            source,
        }
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    // New files are created with the target mode so a key is never briefly
    // readable by others
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    drop(file);

    info!(artifact = %artifact, path = %path.display(), "File saved");

    // Existing files keep their old mode through open(), so always set it
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
            error!(
                artifact = %artifact,
                path = %path.display(),
                error = %source,
                "Failed to set file permissions"
            );
            SyncError::Permissions {
                artifact,
                path: path.to_path_buf(),
                source,
            }
        })?;
    }

    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}
