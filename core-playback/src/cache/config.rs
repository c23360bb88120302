//! Cache configuration

use std::num::NonZeroUsize;

/// Configuration for [`AudioCache`](super::AudioCache).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of decoded cries kept (default: unbounded for the process lifetime)
    pub max_entries: Option<usize>,
}

impl CacheConfig {
    /// Create an unbounded cache configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict the least recently used cry once more than `entries` are cached.
    pub fn with_max_entries(mut self, entries: usize) -> Self {
        self.max_entries = Some(entries);
        self
    }

    /// Capacity for the underlying LRU, `None` when unbounded.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.max_entries.and_then(NonZeroUsize::new)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_entries == Some(0) {
            return Err("max_entries must be at least 1 (leave unset for unbounded)".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, None);
        assert_eq!(config.capacity(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bounded() {
        let config = CacheConfig::new().with_max_entries(8);
        assert_eq!(config.capacity(), NonZeroUsize::new(8));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_is_invalid() {
        assert!(CacheConfig::new().with_max_entries(0).validate().is_err());
    }
}
