//! In-memory [`Fetcher`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::fetch::Fetcher;

enum Response {
    Body(String),
    Status(u16),
}

/// Serves canned responses; unknown URLs answer 404
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), Response::Body(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Response::Status(status));
        self
    }

    /// URLs requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Option<String>, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());

        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled { url: url.to_string() });
        }

        match self.responses.get(url) {
            None | Some(Response::Status(404)) => Ok(None),
            Some(Response::Body(body)) => Ok(Some(body.clone())),
            Some(Response::Status(status)) => Err(FetchError::UnexpectedStatus {
                url: url.to_string(),
                status: *status,
            }),
        }
    }
}
