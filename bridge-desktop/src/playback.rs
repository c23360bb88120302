//! Playback adapter backed by rodio.
//!
//! rodio's `OutputStream` is not `Send`, so it lives on a dedicated audio
//! thread together with every `Sink`. The async side talks to that thread
//! through a command channel and waits for a oneshot reply.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    playback::{PlaybackAdapter, PlaybackRequest, PlaybackSessionId, PlaybackState},
};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::BufReader;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// How many finished sessions the audio thread remembers for `state` queries.
const FINISHED_HISTORY: usize = 64;

enum AudioCommand {
    Play {
        request: PlaybackRequest,
        reply: oneshot::Sender<Result<PlaybackSessionId>>,
    },
    Stop {
        session: PlaybackSessionId,
        reply: oneshot::Sender<Result<()>>,
    },
    State {
        session: PlaybackSessionId,
        reply: oneshot::Sender<Result<PlaybackState>>,
    },
}

/// Desktop [`PlaybackAdapter`] playing WAV files through the default output device.
///
/// The output device is opened on the first successful `play`, so constructing
/// the adapter on a machine without audio hardware succeeds.
pub struct RodioPlaybackAdapter {
    commands: Sender<AudioCommand>,
}

impl RodioPlaybackAdapter {
    /// Spawn the audio thread.
    pub fn new() -> Result<Self> {
        let (commands, receiver) = channel();

        thread::Builder::new()
            .name("cry-audio".to_string())
            .spawn(move || AudioThread::default().run(receiver))
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to spawn audio thread: {}", e)))?;

        Ok(Self { commands })
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> AudioCommand,
    ) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| BridgeError::NotAvailable("Audio thread has exited".to_string()))?;
        response
            .await
            .map_err(|_| BridgeError::NotAvailable("Audio thread dropped the request".to_string()))?
    }
}

#[async_trait]
impl PlaybackAdapter for RodioPlaybackAdapter {
    async fn play(&self, request: PlaybackRequest) -> Result<PlaybackSessionId> {
        self.request(|reply| AudioCommand::Play { request, reply })
            .await
    }

    async fn stop(&self, session: PlaybackSessionId) -> Result<()> {
        self.request(|reply| AudioCommand::Stop { session, reply })
            .await
    }

    async fn state(&self, session: PlaybackSessionId) -> Result<PlaybackState> {
        self.request(|reply| AudioCommand::State { session, reply })
            .await
    }
}

#[derive(Default)]
struct AudioThread {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sinks: HashMap<PlaybackSessionId, Sink>,
    finished: VecDeque<(PlaybackSessionId, PlaybackState)>,
}

impl AudioThread {
    fn run(mut self, receiver: Receiver<AudioCommand>) {
        debug!("Audio thread started");

        // Exits once every adapter handle (and so every sender) is gone.
        while let Ok(command) = receiver.recv() {
            self.prune_completed();

            match command {
                AudioCommand::Play { request, reply } => {
                    let _ = reply.send(self.play(request));
                }
                AudioCommand::Stop { session, reply } => {
                    self.stop(session);
                    let _ = reply.send(Ok(()));
                }
                AudioCommand::State { session, reply } => {
                    let _ = reply.send(Ok(self.state(session)));
                }
            }
        }

        for (_, sink) in self.sinks.drain() {
            sink.stop();
        }
        debug!("Audio thread stopped");
    }

    fn play(&mut self, request: PlaybackRequest) -> Result<PlaybackSessionId> {
        // Open and decode before touching the device so a bad file is reported as such.
        let file = File::open(&request.path)?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            BridgeError::InvalidData(format!(
                "Cannot decode {}: {}",
                request.path.display(),
                e
            ))
        })?;

        let handle = self.output_handle()?;
        let sink = Sink::try_new(handle)
            .map_err(|e| BridgeError::NotAvailable(format!("Failed to create sink: {}", e)))?;

        sink.set_volume(request.options.volume);
        sink.append(source);

        let session = PlaybackSessionId::new();
        info!(session = %session, path = ?request.path, "Playback started");
        self.sinks.insert(session, sink);
        Ok(session)
    }

    fn stop(&mut self, session: PlaybackSessionId) {
        if let Some(sink) = self.sinks.remove(&session) {
            sink.stop();
            self.remember(session, PlaybackState::Stopped);
            info!(session = %session, "Playback stopped");
        } else {
            debug!(session = %session, "Stop requested for inactive session");
        }
    }

    fn state(&self, session: PlaybackSessionId) -> PlaybackState {
        if self.sinks.contains_key(&session) {
            return PlaybackState::Playing;
        }

        self.finished
            .iter()
            .find(|(id, _)| *id == session)
            .map(|(_, state)| *state)
            .unwrap_or(PlaybackState::Idle)
    }

    fn output_handle(&mut self) -> Result<&OutputStreamHandle> {
        if self.output.is_none() {
            let output = OutputStream::try_default().map_err(|e| {
                warn!(error = %e, "No audio output device available");
                BridgeError::NotAvailable(format!("Audio output device unavailable: {}", e))
            })?;
            self.output = Some(output);
        }

        match self.output.as_ref() {
            Some((_, handle)) => Ok(handle),
            None => Err(BridgeError::NotAvailable(
                "Audio output device unavailable".to_string(),
            )),
        }
    }

    fn prune_completed(&mut self) {
        let done: Vec<PlaybackSessionId> = self
            .sinks
            .iter()
            .filter(|(_, sink)| sink.empty())
            .map(|(id, _)| *id)
            .collect();

        for session in done {
            self.sinks.remove(&session);
            self.remember(session, PlaybackState::Completed);
            debug!(session = %session, "Playback completed");
        }
    }

    fn remember(&mut self, session: PlaybackSessionId, state: PlaybackState) {
        if self.finished.len() == FINISHED_HISTORY {
            self.finished.pop_front();
        }
        self.finished.push_back((session, state));
    }
}
