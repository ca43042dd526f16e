//! Remote content fetching
//!
//! [`Fetcher`] is the seam between the sync logic and the network. The
//! production implementation is [`HttpFetcher`]; tests substitute an
//! in-memory map.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::FetchError;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("kcm/", env!("CARGO_PKG_VERSION"));

/// Retrieves text content by URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the raw body
    ///
    /// Returns `Ok(None)` when the server answers 404. Any other non-2xx
    /// status is an error. Implementations must abort promptly once
    /// `cancel` fires.
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Option<String>, FetchError>;
}

/// [`Fetcher`] backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Option<String>, FetchError> {
        trace!(url = %url, "Sending GET request");

        let request = async {
            let response = self.client.get(url).send().await.map_err(|source| {
                FetchError::Request {
                    url: url.to_string(),
                    source,
                }
            })?;

            let status = response.status();

            // Dropping the response releases the connection without reading the body
            if status == StatusCode::NOT_FOUND {
                debug!(url = %url, "Remote content not found");
                return Ok(None);
            }

            if !status.is_success() {
                return Err(FetchError::UnexpectedStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

            trace!(url = %url, bytes = body.len(), "Received response body");
            Ok(Some(body))
        };

        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(FetchError::Cancelled { url: url.to_string() }),

            result = tokio::time::timeout(self.timeout, request) => match result {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }),
            },
        }
    }
}

/// Fetch text content, normalized for on-disk comparison
///
/// Surrounding whitespace is trimmed and exactly one trailing newline is
/// appended, so a blank 2xx body becomes `"\n"`. A 404 or a blank URL
/// resolves to `""`: the remote side has nothing published.
pub async fn fetch_content(
    fetcher: &dyn Fetcher,
    url: &str,
    cancel: &CancellationToken,
) -> Result<String, FetchError> {
    if url.trim().is_empty() {
        debug!("No URL published, treating content as empty");
        return Ok(String::new());
    }

    match fetcher.get(url, cancel).await? {
        Some(body) => Ok(normalize(&body)),
        None => Ok(String::new()),
    }
}

/// Trim surrounding whitespace and terminate with a single newline
pub fn normalize(body: &str) -> String {
    let trimmed = body.trim();
    let mut content = String::with_capacity(trimmed.len() + 1);
    content.push_str(trimmed);
    content.push('\n');
    content
}
