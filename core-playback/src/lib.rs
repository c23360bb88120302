//! # Cry Playback Module
//!
//! Fetches a creature's cry by URL, transcodes it to WAV once, caches the
//! decoded file by URL and plays it.
//!
//! ## Overview
//!
//! - [`AudioCache`]: URL-keyed, process-lifetime cache of decoded cries
//! - [`Transcoder`] / [`SymphoniaTranscoder`]: Ogg Vorbis to 16-bit PCM WAV
//! - [`FetchClient`]: single-shot downloads over the host `HttpClient`
//! - [`PlaybackController`]: at most one cry audible at a time
//! - [`CryPipeline`]: the request state machine tying them together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_playback::{AudioCache, CacheConfig, CryPipeline, FetchClient, PlaybackController, SymphoniaTranscoder};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let cache = Arc::new(AudioCache::new(CacheConfig::default(), fs.clone()));
//! let transcoder = Arc::new(SymphoniaTranscoder::new(fs, cache_dir, temp_dir));
//! let pipeline = CryPipeline::new(
//!     cache,
//!     FetchClient::new(http, Duration::from_secs(30)),
//!     transcoder,
//!     Arc::new(PlaybackController::new(audio)),
//! );
//!
//! let outcome = pipeline.request("https://example.com/cries/25.ogg").await?;
//! ```

pub mod cache;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod transcode;

pub use cache::{AudioCache, CacheConfig, CacheEntry, CacheStats, ClearReport};
pub use controller::{PlaybackController, PlaybackSession, SessionState};
pub use error::{CryError, ErrorKind, FetchError, PlaybackError, Result, TranscodeError};
pub use fetch::FetchClient;
pub use pipeline::{normalize_source, CryPipeline, PlaybackOutcome};
pub use transcode::{DecodedAudio, SourceFormat, SymphoniaTranscoder, Transcoder};
