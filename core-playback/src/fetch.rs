//! # Fetch Client
//!
//! One GET per call over the host [`HttpClient`]. Any non-2xx status is a
//! failure, 4xx and 5xx alike, and nothing is retried.

use crate::error::FetchError;
use bridge_traits::http::{HttpClient, HttpRequest};
use bytes::Bytes;
use core_runtime::logging::redact_url;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Downloads raw cry payloads.
#[derive(Clone)]
pub struct FetchClient {
    http: Arc<dyn HttpClient>,
    timeout: Duration,
}

impl FetchClient {
    pub fn new(http: Arc<dyn HttpClient>, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the full body of `url`.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Transport`] when no response arrived
    /// - [`FetchError::Status`] for any non-2xx response
    #[instrument(skip(self, url), fields(url = %redact_url(url)))]
    pub async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let request = HttpRequest::get(url)
            .header("Accept", "audio/ogg, audio/*;q=0.9, */*;q=0.5")
            .timeout(self.timeout);

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Cry download failed");
            FetchError::from(e)
        })?;

        if !response.is_success() {
            warn!(status = response.status, "Cry download returned non-success status");
            return Err(FetchError::Status {
                status: response.status,
                url: redact_url(url),
            });
        }

        debug!(bytes = response.body.len(), "Cry downloaded");
        Ok(response.body)
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}
