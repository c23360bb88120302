//! # Audio Cache Module
//!
//! Maps a cry's source URL to its decoded, playable resource.
//!
//! ## Overview
//!
//! - Process-lifetime only: the cache is empty on every cold start
//! - Optional LRU bound, evicted resources are deleted from storage
//! - Best-effort `clear` that never fails as a whole
//!
//! ```text
//! ┌────────────────────────────────────────┐
//! │     AudioCache                         │
//! │  - lookup()   (sync, no I/O)           │
//! │  - store()                             │
//! │  - clear()                             │
//! └────────┬───────────────────────────────┘
//!          │
//!          ├──> LruCache<String, CacheEntry> (parking_lot::Mutex)
//!          └──> FileSystemAccess (resource deletion)
//! ```

pub mod audio_cache;
pub mod config;
pub mod stats;

pub use audio_cache::{AudioCache, CacheEntry};
pub use config::CacheConfig;
pub use stats::{CacheStats, ClearReport};
