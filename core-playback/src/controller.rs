//! # Playback Controller
//!
//! Owns the single active playback session. Starting a new cry stops the
//! previous one first, under the same lock, so two cries never overlap. When
//! the previous cry cannot be stopped the new one is refused.

use crate::error::PlaybackError;
use crate::transcode::DecodedAudio;
use bridge_traits::playback::{
    PlaybackAdapter, PlaybackOptions, PlaybackRequest, PlaybackSessionId, PlaybackState,
};
use chrono::{DateTime, Utc};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::logging::strip_path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Controller-side state of playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Playing,
}

/// The cry currently playing. The resource is borrowed from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub id: PlaybackSessionId,
    pub resource: PathBuf,
    pub started_at: DateTime<Utc>,
}

/// Drives a [`PlaybackAdapter`] with at most one session in `Playing`.
pub struct PlaybackController {
    adapter: Arc<dyn PlaybackAdapter>,
    session: Mutex<Option<PlaybackSession>>,
    options: PlaybackOptions,
    event_bus: Option<Arc<EventBus>>,
}

impl PlaybackController {
    pub fn new(adapter: Arc<dyn PlaybackAdapter>) -> Self {
        Self {
            adapter,
            session: Mutex::new(None),
            options: PlaybackOptions::default(),
            event_bus: None,
        }
    }

    /// Set event bus for playback events.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Volume applied to every new session, clamped to `[0.0, 1.0]`.
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.options.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Play `resource`, stopping any current session before starting.
    ///
    /// If the previous session cannot be stopped it stays current and
    /// [`PlaybackError::StopFailed`] is returned without starting the new one.
    /// If the new one fails to start, the controller is left idle.
    #[instrument(skip(self, resource), fields(file = %strip_path(&resource.path.to_string_lossy())))]
    pub async fn play(&self, resource: &DecodedAudio) -> Result<PlaybackSessionId, PlaybackError> {
        let mut current = self.session.lock().await;

        if let Some(previous) = current.take() {
            if let Err(e) = self.halt(&previous).await {
                *current = Some(previous);
                return Err(e);
            }
        }

        let request = PlaybackRequest::new(&resource.path).with_options(self.options);
        let id = self.adapter.play(request).await.map_err(|e| {
            warn!(error = %e, "Adapter refused to play cry");
            PlaybackError::from(e)
        })?;

        info!(session = %id, "Cry playing");
        *current = Some(PlaybackSession {
            id,
            resource: resource.path.clone(),
            started_at: Utc::now(),
        });
        self.emit(PlaybackEvent::Started {
            session_id: id.to_string(),
            path: resource.path.clone(),
        });

        Ok(id)
    }

    /// Stop the current session, if any. Returns whether one was playing.
    ///
    /// A session the adapter fails to stop stays current and the failure is
    /// [`PlaybackError::StopFailed`].
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<bool, PlaybackError> {
        let mut current = self.session.lock().await;

        let Some(id) = current.as_ref().map(|session| session.id) else {
            debug!("Nothing to stop");
            return Ok(false);
        };

        // The session stays current if the adapter cannot stop it.
        self.adapter.stop(id).await.map_err(|e| {
            warn!(session = %id, error = %e, "Failed to stop cry");
            PlaybackError::StopFailed(e.to_string())
        })?;

        *current = None;
        info!(session = %id, "Cry stopped");
        self.emit(PlaybackEvent::Stopped {
            session_id: id.to_string(),
        });
        Ok(true)
    }

    /// Session the controller believes is playing.
    ///
    /// Natural completion is only noticed by [`refresh`](Self::refresh).
    pub async fn current(&self) -> Option<PlaybackSession> {
        self.session.lock().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        match self.session.lock().await.as_ref() {
            Some(_) => SessionState::Playing,
            None => SessionState::Idle,
        }
    }

    /// Ask the adapter whether the current session is still playing and
    /// reset to idle if it has finished.
    pub async fn refresh(&self) -> Result<Option<PlaybackSession>, PlaybackError> {
        let mut current = self.session.lock().await;

        let Some(session) = current.as_ref() else {
            return Ok(None);
        };

        let state = self.adapter.state(session.id).await?;
        if state.is_active() {
            return Ok(current.clone());
        }

        debug!(session = %session.id, ?state, "Session finished");
        *current = None;
        Ok(None)
    }

    async fn halt(&self, previous: &PlaybackSession) -> Result<(), PlaybackError> {
        match self.adapter.stop(previous.id).await {
            Ok(()) => {
                debug!(session = %previous.id, "Superseded session stopped");
                self.emit(PlaybackEvent::Stopped {
                    session_id: previous.id.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    session = %previous.id,
                    error = %e,
                    "Failed to stop superseded session, not starting new cry"
                );
                Err(PlaybackError::StopFailed(e.to_string()))
            }
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(event));
        }
    }
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use mockall::mock;
    use mockall::predicate::eq;
    use std::time::Duration;

    mock! {
        Audio {}

        #[async_trait]
        impl PlaybackAdapter for Audio {
            async fn play(&self, request: PlaybackRequest) -> BridgeResult<PlaybackSessionId>;
            async fn stop(&self, session: PlaybackSessionId) -> BridgeResult<()>;
            async fn state(&self, session: PlaybackSessionId) -> BridgeResult<PlaybackState>;
        }
    }

    fn resource(name: &str) -> DecodedAudio {
        DecodedAudio {
            path: PathBuf::from(format!("/cache/{}.wav", name)),
            sample_rate: 22_050,
            channels: 1,
            frames: 11_025,
            duration: Duration::from_millis(500),
            size_bytes: 22_094,
        }
    }

    #[tokio::test]
    async fn test_play_then_refresh_after_completion() {
        let id = PlaybackSessionId::new();
        let mut audio = MockAudio::new();
        audio.expect_play().times(1).returning(move |_| Ok(id));
        audio
            .expect_state()
            .with(eq(id))
            .times(1)
            .returning(|_| Ok(PlaybackState::Completed));

        let controller = PlaybackController::new(Arc::new(audio));
        assert_eq!(controller.play(&resource("a")).await.unwrap(), id);
        assert_eq!(controller.state().await, SessionState::Playing);

        assert!(controller.refresh().await.unwrap().is_none());
        assert_eq!(controller.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_stop_without_session_is_noop() {
        let audio = MockAudio::new();
        let controller = PlaybackController::new(Arc::new(audio));
        assert!(!controller.stop().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_stop_of_previous_refuses_new_session() {
        let first = PlaybackSessionId::new();

        let mut audio = MockAudio::new();
        audio.expect_play().times(1).returning(move |_| Ok(first));
        audio
            .expect_stop()
            .with(eq(first))
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("sink wedged".to_string())));

        let controller = PlaybackController::new(Arc::new(audio));
        controller.play(&resource("a")).await.unwrap();
        let err = controller.play(&resource("b")).await.unwrap_err();

        assert!(matches!(err, PlaybackError::StopFailed(_)));
        let current = controller.current().await.unwrap();
        assert_eq!(current.id, first);
        assert_eq!(current.resource, PathBuf::from("/cache/a.wav"));
    }

    #[tokio::test]
    async fn test_failed_stop_keeps_session() {
        let id = PlaybackSessionId::new();

        let mut audio = MockAudio::new();
        audio.expect_play().times(1).returning(move |_| Ok(id));
        audio
            .expect_stop()
            .times(1)
            .returning(|_| Err(BridgeError::NotAvailable("audio thread gone".to_string())));

        let controller = PlaybackController::new(Arc::new(audio));
        controller.play(&resource("a")).await.unwrap();

        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, PlaybackError::StopFailed(_)));
        assert_eq!(controller.current().await.map(|s| s.id), Some(id));
    }

    #[tokio::test]
    async fn test_device_unavailable_leaves_controller_idle() {
        let mut audio = MockAudio::new();
        audio
            .expect_play()
            .returning(|_| Err(BridgeError::NotAvailable("no output device".to_string())));

        let controller = PlaybackController::new(Arc::new(audio));
        let err = controller.play(&resource("a")).await.unwrap_err();

        assert!(matches!(err, PlaybackError::DeviceUnavailable(_)));
        assert_eq!(controller.state().await, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_forwarded() {
        let mut audio = MockAudio::new();
        audio
            .expect_play()
            .withf(|req| (req.options.volume - 1.0).abs() < f32::EPSILON)
            .times(1)
            .returning(|_| Ok(PlaybackSessionId::new()));

        let controller = PlaybackController::new(Arc::new(audio)).with_volume(3.0);
        controller.play(&resource("a")).await.unwrap();
    }
}
