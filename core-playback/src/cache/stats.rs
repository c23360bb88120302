//! Cache statistics

use serde::{Deserialize, Serialize};

/// Point-in-time counters for an [`AudioCache`](super::AudioCache).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that found an entry
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Successful `store` calls, including replacements
    pub stores: u64,

    /// Entries dropped to respect `max_entries`
    pub evictions: u64,

    /// Entries currently cached
    pub entries: usize,

    /// Total bytes of decoded audio currently cached
    pub total_bytes: u64,
}

impl CacheStats {
    /// Share of lookups that hit, in `[0.0, 1.0]`.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return 0.0;
        }

        self.hits as f64 / lookups as f64
    }

    /// Returns average decoded size per entry.
    pub fn average_entry_size(&self) -> u64 {
        if self.entries == 0 {
            0
        } else {
            self.total_bytes / self.entries as u64
        }
    }
}

/// Outcome of [`AudioCache::clear`](super::AudioCache::clear).
///
/// Clearing never fails as a whole; resources that could not be deleted are
/// reported here and in the logs.
#[derive(Debug, Default)]
pub struct ClearReport {
    /// Entries whose resource is gone (deleted now or already missing)
    pub removed: usize,

    /// Superseded resources of replaced entries that were deleted
    pub retired: usize,

    /// One `CacheIoFailed` per resource that could not be deleted
    pub failures: Vec<crate::error::CryError>,
}

impl ClearReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Resources this clear tried to delete.
    pub fn attempted(&self) -> usize {
        self.removed + self.retired + self.failures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_ratio() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_ratio(), 0.0);
    }

    #[test]
    fn test_average_entry_size() {
        let stats = CacheStats {
            entries: 4,
            total_bytes: 4_000,
            ..Default::default()
        };
        assert_eq!(stats.average_entry_size(), 1_000);
        assert_eq!(CacheStats::default().average_entry_size(), 0);
    }
}
