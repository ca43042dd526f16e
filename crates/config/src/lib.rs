//! Configuration loading and validation for kcm.
//!
//! The configuration is a YAML document listing the certificates to keep in
//! sync:
//!
//! ```yaml
//! certificates:
//!   - url: https://certs.example.com/certificates/abc123
//!     paths:
//!       certificate: /etc/ssl/example.crt
//!       private_key: /etc/ssl/private/example.key
//!       chain: /etc/ssl/example.chain.crt
//!       certificate_with_chain: /etc/ssl/example.full.crt
//!     permissions:
//!       certificates: 644
//!       keys: 600
//!     commands:
//!       - systemctl reload nginx
//! ```
//!
//! Every path is optional; an omitted (or empty) path means the artifact is
//! not managed at all.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

mod error;
mod permissions;
mod validate;

pub use error::ConfigError;
pub use permissions::{parse_mode, PermissionClass, Permissions};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kcm.yaml";

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Certificates to synchronize, processed in this order
    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,
}

/// One configured synchronization target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateEntry {
    /// Metadata endpoint for this certificate
    pub url: String,

    /// Local artifact paths
    #[serde(default)]
    pub paths: ArtifactPaths,

    /// File mode overrides
    #[serde(default)]
    pub permissions: Permissions,

    /// Shell commands run after the artifacts have been rewritten
    #[serde(default)]
    pub commands: Vec<String>,
}

/// Local file paths for the four artifact kinds
///
/// Use the accessor methods rather than the fields: they treat an empty
/// path the same as a missing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    #[serde(default)]
    pub certificate: Option<PathBuf>,
    #[serde(default)]
    pub private_key: Option<PathBuf>,
    #[serde(default)]
    pub chain: Option<PathBuf>,
    #[serde(default)]
    pub certificate_with_chain: Option<PathBuf>,
}

impl ArtifactPaths {
    /// Managed certificate path, if any
    pub fn certificate(&self) -> Option<&Path> {
        managed(&self.certificate)
    }

    /// Managed private key path, if any
    pub fn private_key(&self) -> Option<&Path> {
        managed(&self.private_key)
    }

    /// Managed chain path, if any
    pub fn chain(&self) -> Option<&Path> {
        managed(&self.chain)
    }

    /// Managed certificate-with-chain path, if any
    pub fn certificate_with_chain(&self) -> Option<&Path> {
        managed(&self.certificate_with_chain)
    }

    /// Whether no artifact is managed at all
    pub fn is_empty(&self) -> bool {
        self.certificate().is_none()
            && self.private_key().is_none()
            && self.chain().is_none()
            && self.certificate_with_chain().is_none()
    }
}

fn managed(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        trace!(path = %path.display(), "Reading configuration file");

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content)?;

        debug!(
            path = %path.display(),
            certificates = config.certificates.len(),
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        // An empty document is an empty configuration, not an error
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(content)?)
    }
}
