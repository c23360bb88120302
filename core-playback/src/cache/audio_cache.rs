//! # Audio Cache
//!
//! URL-keyed map of decoded cries. The map lives behind a `parking_lot`
//! mutex and is never held across an `.await`; file deletion happens after
//! the lock is released.
//!
//! A resource superseded by a newer store under the same key may still be
//! opened by a request that looked it up or decoded it moments earlier, so
//! it is retired rather than deleted and only removed by [`AudioCache::clear`].

use crate::cache::{
    config::CacheConfig,
    stats::{CacheStats, ClearReport},
};
use crate::error::CryError;
use crate::transcode::DecodedAudio;
use bridge_traits::storage::FileSystemAccess;
use chrono::{DateTime, Utc};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use core_runtime::logging::{redact_url, strip_path};
use lru::LruCache;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A decoded, immediately playable cry recorded under its source URL.
///
/// Entries are replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub source_key: String,
    pub resource: DecodedAudio,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn path(&self) -> &Path {
        &self.resource.path
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    stores: u64,
    evictions: u64,
}

struct Inner {
    entries: LruCache<String, CacheEntry>,
    /// Superseded same-key resources awaiting the next clear.
    retired: Vec<PathBuf>,
    counters: Counters,
}

/// Process-lifetime cache of decoded cries.
///
/// Owns every stored resource: evicted and cleared resources are deleted from
/// storage, replaced ones when the cache is next cleared.
pub struct AudioCache {
    inner: Mutex<Inner>,
    config: CacheConfig,
    fs: Arc<dyn FileSystemAccess>,
    event_bus: Option<Arc<EventBus>>,
}

impl AudioCache {
    /// Create an empty cache. Call [`CacheConfig::validate`] first; a zero
    /// bound is treated as unbounded.
    pub fn new(config: CacheConfig, fs: Arc<dyn FileSystemAccess>) -> Self {
        let entries = match config.capacity() {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };

        Self {
            inner: Mutex::new(Inner {
                entries,
                retired: Vec::new(),
                counters: Counters::default(),
            }),
            config,
            fs,
            event_bus: None,
        }
    }

    /// Set event bus for cache events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Exact-match lookup. Never touches storage.
    pub fn lookup(&self, source_key: &str) -> Option<CacheEntry> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(source_key).cloned();

        match found {
            Some(_) => inner.counters.hits += 1,
            None => inner.counters.misses += 1,
        }

        found
    }

    pub fn contains(&self, source_key: &str) -> bool {
        self.inner.lock().entries.contains(source_key)
    }

    /// Record `resource` as the decoded form of `source_key`.
    ///
    /// Last writer wins. The entry evicted to respect the bound is deleted
    /// before returning; a displaced same-key resource at a different path is
    /// retired until [`clear`](Self::clear).
    #[instrument(skip(self, source_key, resource), fields(source = %redact_url(&source_key)))]
    pub async fn store(&self, source_key: String, resource: DecodedAudio) -> CacheEntry {
        let entry = CacheEntry {
            source_key: source_key.clone(),
            resource,
            stored_at: Utc::now(),
        };

        let evicted = {
            let mut inner = self.inner.lock();
            inner.counters.stores += 1;
            match inner.entries.push(source_key.clone(), entry.clone()) {
                Some((key, old)) if key != source_key => {
                    inner.counters.evictions += 1;
                    Some((key, old))
                }
                Some((_, old)) if old.resource.path != entry.resource.path => {
                    debug!(
                        file = %strip_path(&old.resource.path.to_string_lossy()),
                        "Replacing cached cry, retiring previous resource"
                    );
                    inner.retired.push(old.resource.path);
                    None
                }
                _ => None,
            }
        };

        debug!(
            file = %strip_path(&entry.resource.path.to_string_lossy()),
            size_bytes = entry.resource.size_bytes,
            "Cry cached"
        );
        self.emit(CacheEvent::Stored {
            source: redact_url(&source_key),
            path: entry.resource.path.clone(),
        });

        if let Some((old_key, old_entry)) = evicted {
            info!(evicted = %redact_url(&old_key), "Evicting least recently used cry");
            self.emit(CacheEvent::Evicted {
                source: redact_url(&old_key),
                path: old_entry.resource.path.clone(),
            });
            self.release(&old_entry.resource.path).await;
        }

        entry
    }

    /// Remove every entry and delete every owned resource, retired ones
    /// included.
    ///
    /// The map is emptied unconditionally. Deletion failures are logged and
    /// reported in the [`ClearReport`]; a file that is already gone counts as
    /// removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> ClearReport {
        let (drained, retired) = {
            let mut inner = self.inner.lock();
            let mut drained = Vec::with_capacity(inner.entries.len());
            while let Some((_, entry)) = inner.entries.pop_lru() {
                drained.push(entry.resource.path);
            }
            (drained, std::mem::take(&mut inner.retired))
        };

        info!(
            entries = drained.len(),
            retired = retired.len(),
            "Clearing cry cache"
        );

        let mut report = ClearReport::default();
        for path in drained {
            if self.delete_owned(path, &mut report).await {
                report.removed += 1;
            }
        }
        for path in retired {
            if self.delete_owned(path, &mut report).await {
                report.retired += 1;
            }
        }

        info!(
            removed = report.removed,
            retired = report.retired,
            failed = report.failures.len(),
            "Cry cache cleared"
        );
        self.emit(CacheEvent::Cleared {
            removed: report.removed,
            failed: report.failures.len(),
        });

        report
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached source keys, most recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Paths of every cached resource.
    pub fn resources(&self) -> Vec<PathBuf> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|(_, entry)| entry.resource.path.clone())
            .collect()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            stores: inner.counters.stores,
            evictions: inner.counters.evictions,
            entries: inner.entries.len(),
            total_bytes: inner
                .entries
                .iter()
                .map(|(_, entry)| entry.resource.size_bytes)
                .sum(),
        }
    }

    /// Delete `path` for a clear. Returns whether the file is gone.
    async fn delete_owned(&self, path: PathBuf, report: &mut ClearReport) -> bool {
        match self.fs.delete_file(&path).await {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                debug!(file = %strip_path(&path.to_string_lossy()), "Cached file already gone");
                true
            }
            Err(e) => {
                warn!(
                    file = %strip_path(&path.to_string_lossy()),
                    error = %e,
                    "Failed to delete cached cry"
                );
                report.failures.push(CryError::CacheIoFailed {
                    path,
                    message: e.to_string(),
                });
                false
            }
        }
    }

    async fn release(&self, path: &Path) {
        if let Err(e) = self.fs.delete_file(path).await {
            if !e.is_not_found() {
                warn!(
                    file = %strip_path(&path.to_string_lossy()),
                    error = %e,
                    "Failed to release cached cry"
                );
            }
        }
    }

    fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}

impl std::fmt::Debug for AudioCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}
