//! Remote certificate metadata
//!
//! The metadata endpoint returns a JSON document describing the current
//! certificate. The certificate, key, and chain themselves are not inline:
//! each is published at its own URL and fetched separately.
//!
//! ```json
//! {
//!   "id": "crt_abc123",
//!   "names": ["example.com", "www.example.com"],
//!   "expires_at": "2026-01-01T00:00:00Z",
//!   "issued_at": "2025-10-03T00:00:00Z",
//!   "urls": {
//!     "certificate": "https://certs.example.com/crt_abc123/certificate",
//!     "private_key": "https://certs.example.com/crt_abc123/private_key",
//!     "chain": "https://certs.example.com/crt_abc123/chain"
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{FetchError, SyncError, SyncResult};
use crate::fetch::{fetch_content, Fetcher};

/// Metadata document for one certificate
///
/// Everything except `urls` is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    pub urls: MetadataUrls,
}

/// Source URLs for the certificate material
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataUrls {
    #[serde(default)]
    pub certificate: String,
    #[serde(default)]
    pub private_key: String,
    #[serde(default)]
    pub chain: String,
}

/// Fetched, normalized certificate material
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFiles {
    pub certificate: String,
    pub private_key: String,
    /// Empty when no intermediate chain is published
    pub chain: String,
}

impl ResolvedFiles {
    /// Certificate followed by the chain
    ///
    /// Equal to the certificate alone when there is no chain.
    pub fn certificate_with_chain(&self) -> String {
        if self.chain.is_empty() {
            return self.certificate.clone();
        }

        format!("{}\n{}\n", self.certificate, self.chain)
    }
}

/// Resolution that stopped at a failed fetch
///
/// `files` holds whatever was fetched before the failure; later fields are
/// left empty.
#[derive(Debug)]
pub struct PartialResolution {
    pub files: ResolvedFiles,
    pub error: FetchError,
}

/// Fetch and decode the metadata document for a certificate entry
pub async fn fetch_metadata(
    fetcher: &dyn Fetcher,
    url: &str,
    cancel: &CancellationToken,
) -> SyncResult<RemoteMetadata> {
    info!(url = %url, "Getting certificate metadata");

    // The document itself is required, so a 404 here is a failure
    let body = fetcher
        .get(url, cancel)
        .await?
        .ok_or_else(|| FetchError::UnexpectedStatus {
            url: url.to_string(),
            status: 404,
        })?;

    let metadata: RemoteMetadata =
        serde_json::from_str(&body).map_err(|source| SyncError::Decode {
            url: url.to_string(),
            source,
        })?;

    info!(
        cert_id = %metadata.id,
        names = ?metadata.names,
        expires_at = ?metadata.expires_at,
        "Certificate metadata retrieved"
    );

    Ok(metadata)
}

/// Fetch the certificate, private key, and chain in that order
///
/// Stops at the first failed fetch and hands back the partial result so the
/// caller can decide whether to continue with it.
pub async fn resolve(
    urls: &MetadataUrls,
    fetcher: &dyn Fetcher,
    cancel: &CancellationToken,
) -> Result<ResolvedFiles, PartialResolution> {
    let mut files = ResolvedFiles::default();

    debug!(url = %urls.certificate, "Getting certificate from API");
    match fetch_content(fetcher, &urls.certificate, cancel).await {
        Ok(content) => files.certificate = content,
        Err(error) => return Err(PartialResolution { files, error }),
    }

    debug!(url = %urls.private_key, "Getting private key from API");
    match fetch_content(fetcher, &urls.private_key, cancel).await {
        Ok(content) => files.private_key = content,
        Err(error) => return Err(PartialResolution { files, error }),
    }

    debug!(url = %urls.chain, "Getting chain from API");
    match fetch_content(fetcher, &urls.chain, cancel).await {
        Ok(content) => files.chain = content,
        Err(error) => return Err(PartialResolution { files, error }),
    }

    Ok(files)
}
