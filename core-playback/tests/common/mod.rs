//! Recording stubs shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::playback::{PlaybackAdapter, PlaybackRequest, PlaybackSessionId, PlaybackState};
use bridge_traits::storage::{FileMetadata, FileSystemAccess};
use bytes::Bytes;
use core_playback::{
    AudioCache, CacheConfig, CryPipeline, DecodedAudio, FetchClient, PlaybackController,
    TranscodeError, Transcoder,
};
use core_runtime::events::{CoreEvent, EventBus, PipelineEvent, PipelineState, Receiver};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CRY_URL: &str = "https://example/cry.ogg";
pub const OGG_BYTES: &[u8] = b"OggS\x00\x02fake-vorbis-payload";

// ============================================================================
// HTTP
// ============================================================================

/// Answers every request with the same status and body, counting calls.
pub struct CountingHttp {
    calls: AtomicUsize,
    status: u16,
    body: Bytes,
    delay: Option<Duration>,
    urls: Mutex<Vec<String>>,
}

impl CountingHttp {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::with_status(200))
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self::with_status(status))
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::with_status(200)
        })
    }

    fn with_status(status: u16) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            status,
            body: Bytes::from_static(OGG_BYTES),
            delay: None,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl HttpClient for CountingHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(request.url.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(HttpResponse::new(self.status, self.body.clone()))
    }
}

// ============================================================================
// File system
// ============================================================================

/// Tracks which files exist; deleting an unknown file reports NotFound.
#[derive(Default)]
pub struct MemoryFs {
    files: Mutex<HashSet<PathBuf>>,
    deleted: Mutex<Vec<PathBuf>>,
    locked: Mutex<HashSet<PathBuf>>,
}

impl MemoryFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, path: impl Into<PathBuf>) {
        self.files.lock().insert(path.into());
    }

    /// Make deleting `path` fail with PermissionDenied.
    pub fn lock_file(&self, path: impl Into<PathBuf>) {
        self.locked.lock().insert(path.into());
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().contains(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    pub fn deleted(&self) -> Vec<PathBuf> {
        self.deleted.lock().clone()
    }
}

#[async_trait]
impl FileSystemAccess for MemoryFs {
    async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/cache"))
    }

    async fn get_temp_directory(&self) -> BridgeResult<PathBuf> {
        Ok(PathBuf::from("/tmp"))
    }

    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        Ok(self.contains(path))
    }

    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        if self.contains(path) {
            Ok(FileMetadata {
                size: 1_024,
                modified_at: None,
                is_directory: false,
            })
        } else {
            Err(std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }
    }

    async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
        Ok(())
    }

    async fn list_directory(&self, dir: &Path) -> BridgeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .lock()
            .iter()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }

    async fn write_file(&self, path: &Path, _data: Bytes) -> BridgeResult<()> {
        self.add(path);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> BridgeResult<()> {
        self.deleted.lock().push(path.to_path_buf());
        if self.locked.lock().contains(path) {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into());
        }
        if self.files.lock().remove(path) {
            Ok(())
        } else {
            Err(std::io::Error::from(std::io::ErrorKind::NotFound).into())
        }
    }
}

// ============================================================================
// Transcoder
// ============================================================================

/// Deterministic decoder: output `/cache/decoded-<n>.wav`, one frame per input byte.
pub struct StubTranscoder {
    calls: AtomicUsize,
    fs: Arc<MemoryFs>,
    failure: Option<TranscodeError>,
}

impl StubTranscoder {
    pub fn new(fs: Arc<MemoryFs>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fs,
            failure: None,
        })
    }

    pub fn failing(fs: Arc<MemoryFs>, failure: TranscodeError) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fs,
            failure: Some(failure),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn decode(&self, input: Bytes) -> Result<DecodedAudio, TranscodeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let path = PathBuf::from(format!("/cache/decoded-{}.wav", n));
        self.fs.add(&path);
        Ok(DecodedAudio {
            path,
            sample_rate: 22_050,
            channels: 1,
            frames: input.len() as u64,
            duration: DecodedAudio::duration_of(input.len() as u64, 22_050),
            size_bytes: 44 + input.len() as u64 * 2,
        })
    }
}

// ============================================================================
// Playback adapter
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCall {
    Play(PathBuf, PlaybackSessionId),
    Stop(PlaybackSessionId),
}

/// Records plays and stops; a session is active from its play until its stop.
#[derive(Default)]
pub struct RecordingAudio {
    log: Mutex<Vec<AudioCall>>,
    active: Mutex<Vec<PlaybackSessionId>>,
    device_missing: AtomicBool,
    stop_fails: AtomicBool,
    opens_from: Option<(Arc<MemoryFs>, Duration)>,
}

impl RecordingAudio {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without_device() -> Arc<Self> {
        let audio = Self::default();
        audio.device_missing.store(true, Ordering::SeqCst);
        Arc::new(audio)
    }

    /// Opens the resource in `fs` only after `delay`, like a device that
    /// spins up before reading. A file deleted meanwhile fails the play.
    pub fn opening_after(fs: Arc<MemoryFs>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            opens_from: Some((fs, delay)),
            ..Self::default()
        })
    }

    /// Make every later stop fail, as if the output had wedged.
    pub fn fail_stops(&self) {
        self.stop_fails.store(true, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<AudioCall> {
        self.log.lock().clone()
    }

    pub fn plays(&self) -> Vec<PathBuf> {
        self.log
            .lock()
            .iter()
            .filter_map(|call| match call {
                AudioCall::Play(path, _) => Some(path.clone()),
                AudioCall::Stop(_) => None,
            })
            .collect()
    }

    pub fn active(&self) -> Vec<PlaybackSessionId> {
        self.active.lock().clone()
    }
}

#[async_trait]
impl PlaybackAdapter for RecordingAudio {
    async fn play(&self, request: PlaybackRequest) -> BridgeResult<PlaybackSessionId> {
        if self.device_missing.load(Ordering::SeqCst) {
            return Err(BridgeError::NotAvailable("no output device".to_string()));
        }

        if let Some((fs, delay)) = &self.opens_from {
            tokio::time::sleep(*delay).await;
            if !fs.contains(&request.path) {
                return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
            }
        }

        let id = PlaybackSessionId::new();
        self.log.lock().push(AudioCall::Play(request.path, id));
        self.active.lock().push(id);
        Ok(id)
    }

    async fn stop(&self, session: PlaybackSessionId) -> BridgeResult<()> {
        if self.stop_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("sink did not stop".to_string()));
        }
        self.log.lock().push(AudioCall::Stop(session));
        self.active.lock().retain(|id| *id != session);
        Ok(())
    }

    async fn state(&self, session: PlaybackSessionId) -> BridgeResult<PlaybackState> {
        if self.active.lock().contains(&session) {
            Ok(PlaybackState::Playing)
        } else {
            Ok(PlaybackState::Idle)
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub pipeline: Arc<CryPipeline>,
    pub http: Arc<CountingHttp>,
    pub fs: Arc<MemoryFs>,
    pub transcoder: Arc<StubTranscoder>,
    pub audio: Arc<RecordingAudio>,
    pub bus: Arc<EventBus>,
}

pub struct HarnessBuilder {
    http: Arc<CountingHttp>,
    fs: Arc<MemoryFs>,
    transcode_failure: Option<TranscodeError>,
    audio: Arc<RecordingAudio>,
    dedupe: bool,
    max_entries: Option<usize>,
}

impl HarnessBuilder {
    pub fn http(mut self, http: Arc<CountingHttp>) -> Self {
        self.http = http;
        self
    }

    pub fn transcode_failure(mut self, failure: TranscodeError) -> Self {
        self.transcode_failure = Some(failure);
        self
    }

    pub fn audio(mut self, audio: Arc<RecordingAudio>) -> Self {
        self.audio = audio;
        self
    }

    /// Audio that opens each resource `delay` after being asked to play it.
    pub fn audio_opening_after(mut self, delay: Duration) -> Self {
        self.audio = RecordingAudio::opening_after(self.fs.clone(), delay);
        self
    }

    pub fn dedupe(mut self, enabled: bool) -> Self {
        self.dedupe = enabled;
        self
    }

    pub fn max_entries(mut self, entries: usize) -> Self {
        self.max_entries = Some(entries);
        self
    }

    pub fn build(self) -> Harness {
        let bus = Arc::new(EventBus::new(256));
        let transcoder = match self.transcode_failure {
            Some(failure) => StubTranscoder::failing(self.fs.clone(), failure),
            None => StubTranscoder::new(self.fs.clone()),
        };

        let mut cache_config = CacheConfig::new();
        if let Some(entries) = self.max_entries {
            cache_config = cache_config.with_max_entries(entries);
        }

        let cache = Arc::new(
            AudioCache::new(cache_config, self.fs.clone()).with_event_bus(bus.clone()),
        );
        let controller =
            Arc::new(PlaybackController::new(self.audio.clone()).with_event_bus(bus.clone()));
        let pipeline = CryPipeline::new(
            cache,
            FetchClient::new(self.http.clone(), Duration::from_secs(5)),
            transcoder.clone(),
            controller,
        )
        .with_dedupe(self.dedupe)
        .with_event_bus(bus.clone());

        Harness {
            pipeline: Arc::new(pipeline),
            http: self.http,
            fs: self.fs,
            transcoder,
            audio: self.audio,
            bus,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder {
        http: CountingHttp::ok(),
        fs: MemoryFs::new(),
        transcode_failure: None,
        audio: RecordingAudio::new(),
        dedupe: true,
        max_entries: None,
    }
}

/// Drain every event currently buffered on `rx`.
pub fn drain(rx: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Pipeline states in the order they were emitted.
pub fn states(events: &[CoreEvent]) -> Vec<PipelineState> {
    events
        .iter()
        .filter_map(|event| match event {
            CoreEvent::Pipeline(PipelineEvent::StateChanged { state, .. }) => Some(*state),
            _ => None,
        })
        .collect()
}
