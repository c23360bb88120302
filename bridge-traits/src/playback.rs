//! Playback bridge traits and supporting types.
//!
//! A host adapter turns a decoded, directly playable file into audible output.
//! The adapter may host several sessions; keeping only one audible at a time
//! is the job of the core's playback controller, not of the adapter.

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for playback sessions managed by a host adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackSessionId(Uuid);

impl PlaybackSessionId {
    /// Generate a new session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlaybackSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlaybackSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Options supplied alongside a playback request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Output volume (0.0 = muted, 1.0 = unity gain).
    pub volume: f32,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

/// Request to start playing a local, already decoded file.
#[derive(Debug, Clone)]
pub struct PlaybackRequest {
    pub path: PathBuf,
    pub options: PlaybackOptions,
}

impl PlaybackRequest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: PlaybackOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PlaybackOptions) -> Self {
        self.options = options;
        self
    }
}

/// Adapter-side view of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Session unknown to the adapter (never started or already pruned).
    Idle,
    Playing,
    /// Stopped by an explicit `stop` call.
    Stopped,
    /// Reached the end of the resource on its own.
    Completed,
}

impl PlaybackState {
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Trait for platform-specific adapters that drive native audio output.
///
/// Error contract:
/// - missing or unreadable resource: [`BridgeError::Io`](crate::BridgeError::Io)
/// - undecodable resource: [`BridgeError::InvalidData`](crate::BridgeError::InvalidData)
/// - no usable output device: [`BridgeError::NotAvailable`](crate::BridgeError::NotAvailable)
#[async_trait::async_trait]
pub trait PlaybackAdapter: Send + Sync {
    /// Start playing the requested file and return the new session's id.
    ///
    /// Playback completion is not reported back; poll [`state`](Self::state).
    async fn play(&self, request: PlaybackRequest) -> Result<PlaybackSessionId>;

    /// Stop a session. Stopping an unknown or finished session is not an error.
    async fn stop(&self, session: PlaybackSessionId) -> Result<()>;

    /// Current state of a session.
    async fn state(&self, session: PlaybackSessionId) -> Result<PlaybackState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_options_default_to_unity_gain() {
        let opts = PlaybackOptions::default();
        assert_eq!(opts.volume, 1.0);
    }

    #[test]
    fn session_id_is_unique() {
        let a = PlaybackSessionId::new();
        let b = PlaybackSessionId::new();
        assert_ne!(a, b);
        assert_eq!(a, PlaybackSessionId::from_uuid(*a.as_uuid()));
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }

    #[test]
    fn only_playing_is_active() {
        assert!(PlaybackState::Playing.is_active());
        assert!(!PlaybackState::Completed.is_active());
        assert!(!PlaybackState::Stopped.is_active());
        assert!(!PlaybackState::Idle.is_active());
    }

    #[test]
    fn request_builder_keeps_path() {
        let request = PlaybackRequest::new("/tmp/cry.wav")
            .with_options(PlaybackOptions { volume: 0.5 });
        assert_eq!(request.path, PathBuf::from("/tmp/cry.wav"));
        assert_eq!(request.options.volume, 0.5);
    }
}
