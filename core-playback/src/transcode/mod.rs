//! # Transcode Engine
//!
//! Turns a downloaded cry (Ogg Vorbis) into 16-bit PCM WAV that the platform
//! audio output can play directly.
//!
//! ## Overview
//!
//! ```text
//! Bytes ─> sniff ─> <temp>/<uuid>.ogg ─> symphonia ─> hound ─> <cache>/<uuid>.wav
//! ```
//!
//! Decoding needs a file-backed source, so the payload is first written to a
//! transient file. The decode itself runs on the blocking pool.

mod engine;
mod format;

pub use engine::SymphoniaTranscoder;
pub use format::SourceFormat;

use crate::error::TranscodeError;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Handle to decoded audio persisted at a stable, playable location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedAudio {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Frames per channel
    pub frames: u64,
    pub duration: Duration,
    /// Size of the WAV file on disk
    pub size_bytes: u64,
}

impl DecodedAudio {
    /// Duration of `frames` at `sample_rate`, zero when the rate is unknown.
    pub fn duration_of(frames: u64, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(frames as f64 / sample_rate as f64)
    }
}

/// Converts a compressed payload into a decoded, playable resource.
///
/// Implementations must not leave a partial output behind on failure.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn decode(&self, input: Bytes) -> Result<DecodedAudio, TranscodeError>;
}
