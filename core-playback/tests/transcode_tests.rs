//! Pipeline runs with the real decoder writing to a temporary directory.

mod common;

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use common::RecordingAudio;
use core_playback::{
    AudioCache, CacheConfig, CryError, CryPipeline, FetchClient, PlaybackController,
    SymphoniaTranscoder, TranscodeError,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CRY_URL: &str = "https://example/cries/25.wav";
const OGG_CRY_URL: &str = "https://example/cries/latest/25.ogg";

/// Mono 8 kHz Ogg Vorbis stream: 63 short blocks of silence, 7936 frames.
const OGG_VORBIS_CRY: &[u8] = include_bytes!("fixtures/cry.ogg");

struct StaticHttp {
    body: Bytes,
}

#[async_trait]
impl HttpClient for StaticHttp {
    async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(200, self.body.clone()))
    }
}

fn wav_fixture() -> Bytes {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for n in 0..800i32 {
            writer.write_sample(((n % 64) * 256 - 8_192) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    Bytes::from(cursor.into_inner())
}

struct Setup {
    pipeline: CryPipeline,
    audio: Arc<RecordingAudio>,
    _root: TempDir,
    cache_dir: PathBuf,
    temp_dir: PathBuf,
}

fn setup(body: Bytes) -> Setup {
    let root = TempDir::new().unwrap();
    let cache_dir = root.path().join("cries");
    let temp_dir = root.path().join("scratch");
    std::fs::create_dir_all(&temp_dir).unwrap();

    let fs = Arc::new(TokioFileSystem::with_directories(
        cache_dir.clone(),
        temp_dir.clone(),
    ));
    let audio = RecordingAudio::new();
    let pipeline = CryPipeline::new(
        Arc::new(AudioCache::new(CacheConfig::default(), fs.clone())),
        FetchClient::new(Arc::new(StaticHttp { body }), Duration::from_secs(5)),
        Arc::new(SymphoniaTranscoder::new(fs, cache_dir.clone(), temp_dir.clone())),
        Arc::new(PlaybackController::new(audio.clone())),
    );

    Setup {
        pipeline,
        audio,
        _root: root,
        cache_dir,
        temp_dir,
    }
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_decoded_cry_is_playable_wav() {
    let s = setup(wav_fixture());

    let outcome = s.pipeline.request(CRY_URL).await.unwrap();

    assert!(outcome.resource.path.starts_with(&s.cache_dir));
    assert_eq!(outcome.resource.sample_rate, 8_000);
    assert_eq!(outcome.resource.channels, 1);
    assert_eq!(outcome.resource.frames, 800);
    assert_eq!(outcome.resource.duration.as_millis(), 100);

    let reader = hound::WavReader::open(&outcome.resource.path).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.duration(), 800);

    assert_eq!(s.audio.plays(), vec![outcome.resource.path.clone()]);
    // Transient input is removed once decoded.
    assert_eq!(file_count(&s.temp_dir), 0);
}

#[tokio::test]
async fn test_ogg_vorbis_cry_decodes_to_wav() {
    let s = setup(Bytes::from_static(OGG_VORBIS_CRY));

    let outcome = s.pipeline.request(OGG_CRY_URL).await.unwrap();

    assert!(!outcome.cache_hit);
    assert_eq!(outcome.resource.sample_rate, 8_000);
    assert_eq!(outcome.resource.channels, 1);
    assert!(outcome.resource.frames > 0);
    assert!(outcome.resource.path.starts_with(&s.cache_dir));

    let reader = hound::WavReader::open(&outcome.resource.path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(spec.sample_rate, 8_000);
    assert_eq!(spec.channels, 1);
    assert_eq!(u64::from(reader.duration()), outcome.resource.frames);

    assert_eq!(s.audio.plays(), vec![outcome.resource.path.clone()]);
    assert_eq!(file_count(&s.temp_dir), 0);
}

#[tokio::test]
async fn test_clear_removes_decoded_files_from_disk() {
    let s = setup(wav_fixture());

    let outcome = s.pipeline.request(CRY_URL).await.unwrap();
    assert!(outcome.resource.path.exists());

    let report = s.pipeline.clear_cache().await;

    assert_eq!(report.removed, 1);
    assert!(!outcome.resource.path.exists());
    assert_eq!(file_count(&s.cache_dir), 0);
}

#[tokio::test]
async fn test_garbage_payload_fails_without_caching() {
    let s = setup(Bytes::from_static(b"<html>404 not found</html>"));

    let err = s.pipeline.request(CRY_URL).await.unwrap_err();

    assert!(matches!(
        err,
        CryError::DecodeFailed(TranscodeError::MalformedInput(_))
    ));
    assert!(s.pipeline.cache().is_empty());
    assert_eq!(file_count(&s.cache_dir), 0);
    assert!(s.audio.log().is_empty());
}

#[tokio::test]
async fn test_empty_payload_fails_without_caching() {
    let s = setup(Bytes::new());

    let err = s.pipeline.request(CRY_URL).await.unwrap_err();

    assert!(matches!(err, CryError::DecodeFailed(_)));
    assert!(s.pipeline.cache().lookup(CRY_URL).is_none());
}
