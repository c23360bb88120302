//! # Creature Lookup
//!
//! Resolves a creature name to the URL of its cry via the public
//! creature-data API. Only the cry fields of the record are read.

use crate::error::{CoreError, Result};
use bridge_traits::http::{HttpClient, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Deserialize)]
struct CreatureRecord {
    name: String,
    id: u32,
    #[serde(default)]
    cries: Cries,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Cries {
    legacy: Option<String>,
    latest: Option<String>,
}

impl Cries {
    fn preferred(self) -> Option<String> {
        self.legacy
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.latest.filter(|url| !url.trim().is_empty()))
    }
}

/// Client for `<base>/pokemon/<name>`.
#[derive(Clone)]
pub struct CreatureClient {
    http: Arc<dyn HttpClient>,
    base_url: String,
    timeout: Duration,
}

impl CreatureClient {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up `name` and return its cry URL, legacy recording first.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidName`] for a blank name
    /// - [`CoreError::CreatureNotFound`] on 404
    /// - [`CoreError::CreatureLookup`] on transport failures, other non-2xx
    ///   statuses and unparseable bodies
    /// - [`CoreError::MissingCry`] when the record carries no cry URL
    #[instrument(skip(self))]
    pub async fn cry_url(&self, name: &str) -> Result<String> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Err(CoreError::InvalidName(name));
        }

        let request = HttpRequest::get(format!("{}/pokemon/{}", self.base_url, name))
            .header("Accept", "application/json")
            .timeout(self.timeout);

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Creature lookup request failed");
            CoreError::CreatureLookup(e.to_string())
        })?;

        if response.status == 404 {
            debug!("Creature not found");
            return Err(CoreError::CreatureNotFound(name));
        }
        if !response.is_success() {
            warn!(status = response.status, "Creature lookup returned non-success status");
            return Err(CoreError::CreatureLookup(format!(
                "unexpected status {} for {}",
                response.status, name
            )));
        }

        let record: CreatureRecord = response
            .json()
            .map_err(|e| CoreError::CreatureLookup(format!("malformed record: {}", e)))?;

        debug!(creature = %record.name, id = record.id, "Creature resolved");
        record
            .cries
            .preferred()
            .ok_or(CoreError::MissingCry(record.name))
    }
}

impl std::fmt::Debug for CreatureClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatureClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
