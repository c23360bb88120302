//! # Cry Pipeline
//!
//! Orchestrates one cry request:
//!
//! ```text
//! validate ─> cache lookup ──hit──────────────────────────────> play
//!                 └──miss──> fetch ─> decode ─> cache store ─> play
//! ```
//!
//! Every step's failure ends the request. Nothing is retried and nothing is
//! cached unless decoding fully succeeded.

use crate::cache::{AudioCache, ClearReport};
use crate::controller::PlaybackController;
use crate::error::{CryError, PlaybackError, Result};
use crate::fetch::FetchClient;
use crate::transcode::{DecodedAudio, Transcoder};
use bridge_traits::playback::PlaybackSessionId;
use core_runtime::events::{CoreEvent, EventBus, PipelineEvent, PipelineState};
use core_runtime::logging::redact_url;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Result of a successful [`CryPipeline::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOutcome {
    pub session: PlaybackSessionId,
    pub resource: DecodedAudio,
    /// `true` when no fetch or decode was performed for this request
    pub cache_hit: bool,
}

/// Parse `raw` and return the canonical source key.
///
/// Only absolute `http`/`https` URLs with a host are accepted.
///
/// ```rust
/// use core_playback::pipeline::normalize_source;
///
/// assert_eq!(
///     normalize_source(" HTTPS://Example.com/cries/25.ogg ").unwrap(),
///     "https://example.com/cries/25.ogg"
/// );
/// assert!(normalize_source("not a url").is_err());
/// ```
pub fn normalize_source(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim()).map_err(|e| CryError::invalid_url(raw, e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(CryError::invalid_url(
            raw,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    if !parsed.has_host() {
        return Err(CryError::invalid_url(raw, "missing host"));
    }

    Ok(parsed.to_string())
}

/// Fetch, decode, cache and play cries by URL.
pub struct CryPipeline {
    cache: Arc<AudioCache>,
    fetcher: FetchClient,
    transcoder: Arc<dyn Transcoder>,
    controller: Arc<PlaybackController>,
    in_flight: Option<InFlight>,
    event_bus: Option<Arc<EventBus>>,
}

impl CryPipeline {
    /// Create a pipeline with in-flight deduplication enabled.
    pub fn new(
        cache: Arc<AudioCache>,
        fetcher: FetchClient,
        transcoder: Arc<dyn Transcoder>,
        controller: Arc<PlaybackController>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            transcoder,
            controller,
            in_flight: Some(InFlight::default()),
            event_bus: None,
        }
    }

    /// Set event bus for pipeline state events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Collapse concurrent misses for the same URL into one fetch and decode.
    pub fn with_dedupe(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::default);
        self
    }

    /// Play the cry at `url`, fetching and decoding it on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns the first failure as a [`CryError`]; see [`CryError::kind`].
    #[instrument(skip(self, url), fields(source = %redact_url(url)))]
    pub async fn request(&self, url: &str) -> Result<PlaybackOutcome> {
        let run = RequestRun::new(self.event_bus.clone(), url);

        let source = match normalize_source(url) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "Rejected cry request");
                run.report_failure(&e);
                return Err(e);
            }
        };

        match self.run(&run, &source).await {
            Ok(outcome) => {
                info!(
                    request_id = %run.id,
                    session = %outcome.session,
                    cache_hit = outcome.cache_hit,
                    "Cry request completed"
                );
                run.transition(PipelineState::Idle);
                Ok(outcome)
            }
            Err(e) => {
                warn!(request_id = %run.id, kind = %e.kind(), error = %e, "Cry request failed");
                run.report_failure(&e);
                run.transition(PipelineState::Failed);
                run.transition(PipelineState::Idle);
                Err(e)
            }
        }
    }

    async fn run(&self, run: &RequestRun, source: &str) -> Result<PlaybackOutcome> {
        let (resource, cache_hit) = self.resolve(run, source).await?;

        let session = self.controller.play(&resource).await?;
        run.transition(PipelineState::Playing);

        Ok(PlaybackOutcome {
            session,
            resource,
            cache_hit,
        })
    }

    /// Find the decoded resource for `source`, producing it on a miss.
    async fn resolve(&self, run: &RequestRun, source: &str) -> Result<(DecodedAudio, bool)> {
        if let Some(entry) = self.cache.lookup(source) {
            debug!("Cache hit");
            return Ok((entry.resource, true));
        }

        let _slot = match &self.in_flight {
            Some(in_flight) => {
                let slot = in_flight.acquire(source).await;
                // Another request may have finished this key while we waited.
                if let Some(entry) = self.cache.lookup(source) {
                    debug!("Served by a concurrent request");
                    return Ok((entry.resource, true));
                }
                Some(slot)
            }
            None => None,
        };

        run.transition(PipelineState::Fetching);
        let bytes = self.fetcher.fetch(source).await?;

        run.transition(PipelineState::Decoding);
        let decoded = self.transcoder.decode(bytes).await?;

        let entry = self.cache.store(source.to_string(), decoded).await;
        Ok((entry.resource, false))
    }

    /// Remove every cached cry. Best-effort; see [`AudioCache::clear`].
    pub async fn clear_cache(&self) -> ClearReport {
        self.cache.clear().await
    }

    /// Stop the current cry, if any.
    pub async fn stop_playback(&self) -> std::result::Result<bool, PlaybackError> {
        self.controller.stop().await
    }

    pub fn cache(&self) -> &Arc<AudioCache> {
        &self.cache
    }

    pub fn controller(&self) -> &Arc<PlaybackController> {
        &self.controller
    }

    pub fn dedupe_enabled(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl std::fmt::Debug for CryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryPipeline")
            .field("cache", &self.cache)
            .field("fetcher", &self.fetcher)
            .field("dedupe", &self.in_flight.is_some())
            .finish()
    }
}

// ============================================================================
// Request bookkeeping
// ============================================================================

/// Tags every state change of one request with its id.
struct RequestRun {
    id: String,
    source: String,
    event_bus: Option<Arc<EventBus>>,
}

impl RequestRun {
    fn new(event_bus: Option<Arc<EventBus>>, raw: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: redact_url(raw),
            event_bus,
        }
    }

    fn transition(&self, state: PipelineState) {
        debug!(request_id = %self.id, %state, "Pipeline state changed");
        self.emit(PipelineEvent::StateChanged {
            request_id: self.id.clone(),
            source: self.source.clone(),
            state,
        });
    }

    fn report_failure(&self, error: &CryError) {
        self.emit(PipelineEvent::Failed {
            request_id: self.id.clone(),
            source: self.source.clone(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Pipeline(event));
        }
    }
}

// ============================================================================
// In-flight deduplication
// ============================================================================

/// Per-key async locks. A key's entry lives only while someone holds or
/// waits on it.
///
/// An entry only the map references is orphaned: its last waiter was
/// cancelled after the holder left. Orphans are pruned on every acquire and
/// release.
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

fn prune_orphans(slots: &mut HashMap<String, Arc<AsyncMutex<()>>>) {
    slots.retain(|_, slot| Arc::strong_count(slot) > 1);
}

impl InFlight {
    async fn acquire(&self, key: &str) -> InFlightSlot<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            prune_orphans(&mut slots);
            Arc::clone(slots.entry(key.to_string()).or_default())
        };

        let permit = Arc::clone(&slot).lock_owned().await;

        InFlightSlot {
            registry: self,
            key: key.to_string(),
            slot,
            permit: Some(permit),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

struct InFlightSlot<'a> {
    registry: &'a InFlight,
    key: String,
    slot: Arc<AsyncMutex<()>>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        self.permit.take();

        // Map + this slot; any waiter holds more.
        let mut slots = self.registry.slots.lock();
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.key);
        }
        prune_orphans(&mut slots);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_source() {
        assert_eq!(
            normalize_source("https://raw.githubusercontent.com/PokeAPI/cries/main/cries/pokemon/legacy/25.ogg").unwrap(),
            "https://raw.githubusercontent.com/PokeAPI/cries/main/cries/pokemon/legacy/25.ogg"
        );
        assert_eq!(
            normalize_source("http://Example.COM").unwrap(),
            "http://example.com/"
        );
    }

    #[test]
    fn test_normalize_rejects_non_http() {
        for raw in ["not a url", "", "ftp://example.com/a.ogg", "file:///tmp/a.ogg", "mailto:a@b.c"] {
            let err = normalize_source(raw).unwrap_err();
            assert!(matches!(err, CryError::InvalidUrl { .. }), "{raw}");
        }
    }

    #[tokio::test]
    async fn test_in_flight_slot_removed_after_last_holder() {
        let registry = InFlight::default();

        {
            let _slot = registry.acquire("https://e.com/a.ogg").await;
            assert_eq!(registry.len(), 1);
        }

        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_serializes_same_key() {
        let registry = Arc::new(InFlight::default());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = registry.acquire("https://e.com/a.ogg").await;

        let waiter = {
            let registry = Arc::clone(&registry);
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let _slot = registry.acquire("https://e.com/a.ogg").await;
                order.lock().push("second");
            })
        };

        tokio::task::yield_now().await;
        order.lock().push("first");
        drop(first);

        waiter.await.unwrap();
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_slot() {
        let registry = Arc::new(InFlight::default());
        let holder = registry.acquire("https://e.com/a.ogg").await;

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let _slot = registry.acquire("https://e.com/a.ogg").await;
            })
        };
        tokio::task::yield_now().await;

        // The holder leaves while the waiter is still queued, then the waiter
        // is cancelled before it runs again.
        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(registry.len(), 1);

        drop(registry.acquire("https://e.com/b.ogg").await);
        assert_eq!(registry.len(), 0);

        // The key is usable again and cleaned up after.
        drop(registry.acquire("https://e.com/a.ogg").await);
        assert_eq!(registry.len(), 0);
    }
}
