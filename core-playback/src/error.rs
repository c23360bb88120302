//! # Cry Pipeline Error Types
//!
//! Every failure of a cry request is terminal for that request and carries
//! the kind that occurred. The host maps [`ErrorKind`] to user-facing text.

use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`CryPipeline::request`](crate::CryPipeline::request).
#[derive(Error, Debug)]
pub enum CryError {
    /// The input was not an absolute http(s) URL. Nothing was fetched or cached.
    #[error("Invalid cry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("Decode failed: {0}")]
    DecodeFailed(#[from] TranscodeError),

    #[error("Playback failed: {0}")]
    PlaybackFailed(#[from] PlaybackError),

    /// Only produced while clearing the cache, where it is logged and counted.
    #[error("Cache I/O failed for {path:?}: {message}")]
    CacheIoFailed { path: PathBuf, message: String },
}

impl CryError {
    pub fn invalid_url(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        CryError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CryError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            CryError::FetchFailed(_) => ErrorKind::FetchFailed,
            CryError::DecodeFailed(_) => ErrorKind::DecodeFailed,
            CryError::PlaybackFailed(_) => ErrorKind::PlaybackFailed,
            CryError::CacheIoFailed { .. } => ErrorKind::CacheIoFailed,
        }
    }

    /// Always `false`: nothing in the pipeline is retried automatically.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Stable, data-free classification of a [`CryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidUrl,
    FetchFailed,
    DecodeFailed,
    PlaybackFailed,
    CacheIoFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidUrl => "InvalidUrl",
            ErrorKind::FetchFailed => "FetchFailed",
            ErrorKind::DecodeFailed => "DecodeFailed",
            ErrorKind::PlaybackFailed => "PlaybackFailed",
            ErrorKind::CacheIoFailed => "CacheIoFailed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fetch Errors
// ============================================================================

/// Network retrieval failures. 4xx and 5xx are not distinguished by the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
}

impl From<BridgeError> for FetchError {
    fn from(err: BridgeError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

// ============================================================================
// Decode Errors
// ============================================================================

/// Transcoding failures, kept distinct so callers can tell bad input from a
/// broken decoder or a full disk.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscodeError {
    /// Input bytes are empty, not a recognised container, or hold no audio track.
    #[error("Malformed or unsupported input: {0}")]
    MalformedInput(String),

    #[error("Decoder failure: {0}")]
    Decoder(String),

    /// Writing the transient input or the decoded output failed.
    #[error("Transient storage failure: {0}")]
    Storage(String),
}

impl TranscodeError {
    pub fn is_input_error(&self) -> bool {
        matches!(self, TranscodeError::MalformedInput(_))
    }
}

// ============================================================================
// Playback Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Resource unreadable: {0}")]
    ResourceUnreadable(String),

    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The previous cry could not be stopped, so the new one was not started.
    #[error("Failed to stop the current cry: {0}")]
    StopFailed(String),
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAvailable(msg) => PlaybackError::DeviceUnavailable(msg),
            BridgeError::OperationFailed(msg) => PlaybackError::DeviceUnavailable(msg),
            BridgeError::InvalidData(msg) => PlaybackError::ResourceUnreadable(msg),
            BridgeError::Io(e) => PlaybackError::ResourceUnreadable(e.to_string()),
        }
    }
}

/// Result type for cry pipeline operations.
pub type Result<T> = std::result::Result<T, CryError>;
