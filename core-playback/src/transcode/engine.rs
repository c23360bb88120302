//! # Symphonia Transcoder
//!
//! Decodes with symphonia and writes 16-bit PCM WAV with hound.

use super::{format::SourceFormat, DecodedAudio, Transcoder};
use crate::error::TranscodeError;
use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_runtime::logging::strip_path;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use symphonia::core::audio::{SampleBuffer, SignalSpec};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Give up after this many undecodable packets in a row.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// [`Transcoder`] backed by symphonia (ogg/vorbis, wav/pcm) and hound.
///
/// Transient inputs go to `temp_dir`, decoded WAVs to `cache_dir`. Both
/// directories must be on the local filesystem because symphonia and hound
/// read and write them directly.
pub struct SymphoniaTranscoder {
    fs: Arc<dyn FileSystemAccess>,
    cache_dir: PathBuf,
    temp_dir: PathBuf,
    remove_transient: bool,
}

impl SymphoniaTranscoder {
    pub fn new(fs: Arc<dyn FileSystemAccess>, cache_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            fs,
            cache_dir,
            temp_dir,
            remove_transient: true,
        }
    }

    /// Keep or delete the transient input after decoding (default: delete).
    pub fn with_remove_transient(mut self, remove: bool) -> Self {
        self.remove_transient = remove;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Delete output and transient files left by an earlier process.
    ///
    /// Only files this transcoder names (`<uuid>.wav` in the cache directory,
    /// `<uuid>.<ext>` in the temp directory) are touched. Call it before the
    /// cache is in use; a missing directory counts as empty. Returns the
    /// number of files deleted.
    #[instrument(skip(self))]
    pub async fn purge_stale(&self) -> usize {
        let removed = self.purge_dir(&self.cache_dir, |ext| ext == "wav").await
            + self
                .purge_dir(&self.temp_dir, |ext| {
                    SourceFormat::ALL.iter().any(|f| f.extension() == ext)
                })
                .await;

        if removed > 0 {
            info!(removed, "Purged stale cry files");
        }
        removed
    }

    async fn purge_dir(&self, dir: &Path, owned_ext: impl Fn(&str) -> bool) -> usize {
        let entries = match self.fs.list_directory(dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return 0,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Failed to list directory for purge");
                return 0;
            }
        };

        let mut removed = 0;
        for path in entries.into_iter().filter(|p| is_generated(p, &owned_ext)) {
            match self.fs.delete_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => warn!(
                    file = %strip_path(&path.to_string_lossy()),
                    error = %e,
                    "Failed to purge stale file"
                ),
            }
        }
        removed
    }

    async fn discard(&self, path: &Path) {
        match self.fs.delete_file(path).await {
            Ok(()) => debug!(file = %strip_path(&path.to_string_lossy()), "Removed scratch file"),
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(
                file = %strip_path(&path.to_string_lossy()),
                error = %e,
                "Failed to remove scratch file"
            ),
        }
    }
}

#[async_trait]
impl Transcoder for SymphoniaTranscoder {
    #[instrument(skip(self, input), fields(bytes = input.len()))]
    async fn decode(&self, input: Bytes) -> Result<DecodedAudio, TranscodeError> {
        if input.is_empty() {
            return Err(TranscodeError::MalformedInput("empty payload".to_string()));
        }

        let format = SourceFormat::sniff(&input).ok_or_else(|| {
            TranscodeError::MalformedInput("unrecognised container signature".to_string())
        })?;

        let id = Uuid::new_v4();
        let transient = self.temp_dir.join(format!("{}.{}", id, format.extension()));
        let output = self.cache_dir.join(format!("{}.wav", id));

        self.fs
            .write_file(&transient, input)
            .await
            .map_err(|e| TranscodeError::Storage(format!("failed to write transient input: {}", e)))?;

        let decoded = match self.fs.create_dir_all(&self.cache_dir).await {
            Ok(()) => {
                let (src, dst) = (transient.clone(), output.clone());
                tokio::task::spawn_blocking(move || decode_to_wav(&src, &dst, format))
                    .await
                    .unwrap_or_else(|e| {
                        Err(TranscodeError::Decoder(format!("decode task failed: {}", e)))
                    })
            }
            Err(e) => Err(TranscodeError::Storage(format!(
                "failed to create cache directory: {}",
                e
            ))),
        };

        if self.remove_transient {
            self.discard(&transient).await;
        }

        let summary = match decoded {
            Ok(summary) => summary,
            Err(e) => {
                self.discard(&output).await;
                return Err(e);
            }
        };

        let size_bytes = match self.fs.metadata(&output).await {
            Ok(meta) => meta.size,
            Err(e) => {
                self.discard(&output).await;
                return Err(TranscodeError::Storage(format!(
                    "decoded output unreadable: {}",
                    e
                )));
            }
        };

        info!(
            format = %format,
            sample_rate = summary.sample_rate,
            channels = summary.channels,
            frames = summary.frames,
            file = %strip_path(&output.to_string_lossy()),
            "Cry decoded"
        );

        Ok(DecodedAudio {
            path: output,
            sample_rate: summary.sample_rate,
            channels: summary.channels,
            frames: summary.frames,
            duration: DecodedAudio::duration_of(summary.frames, summary.sample_rate),
            size_bytes,
        })
    }
}

/// Whether `path` is `<uuid>.<ext>` with an extension accepted by `owned_ext`.
fn is_generated(path: &Path, owned_ext: impl Fn(&str) -> bool) -> bool {
    let ext_owned = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(owned_ext);
    let stem_is_uuid = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| Uuid::parse_str(stem).is_ok());
    ext_owned && stem_is_uuid
}

struct WavSummary {
    sample_rate: u32,
    channels: u16,
    frames: u64,
}

/// Blocking decode of `source` into a 16-bit WAV at `output`.
///
/// The WAV is created on the first decoded packet, so a stream without audio
/// leaves nothing behind.
fn decode_to_wav(
    source: &Path,
    output: &Path,
    format: SourceFormat,
) -> Result<WavSummary, TranscodeError> {
    let file = File::open(source)
        .map_err(|e| TranscodeError::Storage(format!("failed to reopen transient input: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &format.hint(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TranscodeError::MalformedInput(format!("failed to probe {}: {}", format, e)))?;

    let mut reader = probed.format;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TranscodeError::MalformedInput("no audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TranscodeError::MalformedInput(format!("unsupported codec: {}", e)))?;

    let mut writer: Option<(hound::WavWriter<BufWriter<File>>, SignalSpec)> = None;
    let mut frames: u64 = 0;
    let mut consecutive_errors = 0;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!(frames, "Reached end of stream");
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                return Err(TranscodeError::Decoder(
                    "track list changed mid-stream".to_string(),
                ));
            }
            Err(e) => {
                return Err(TranscodeError::Decoder(format!("failed to read packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => {
                consecutive_errors = 0;
                decoded
            }
            Err(SymphoniaError::DecodeError(err)) => {
                consecutive_errors += 1;
                warn!(
                    attempt = consecutive_errors,
                    max = MAX_CONSECUTIVE_ERRORS,
                    error = err,
                    "Skipping undecodable packet"
                );
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(TranscodeError::Decoder(format!(
                        "{} consecutive packets failed to decode: {}",
                        MAX_CONSECUTIVE_ERRORS, err
                    )));
                }
                continue;
            }
            Err(e) => return Err(TranscodeError::Decoder(e.to_string())),
        };

        let spec = *decoded.spec();
        let packet_frames = decoded.frames();
        if packet_frames == 0 {
            continue;
        }

        if writer.is_none() {
            let wav_spec = hound::WavSpec {
                channels: spec.channels.count() as u16,
                sample_rate: spec.rate,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let created = hound::WavWriter::create(output, wav_spec)
                .map_err(|e| TranscodeError::Storage(format!("failed to create WAV: {}", e)))?;
            writer = Some((created, spec));
        }

        let Some((wav, first_spec)) = writer.as_mut() else {
            continue;
        };
        if *first_spec != spec {
            return Err(TranscodeError::Decoder(format!(
                "signal changed mid-stream from {} Hz to {} Hz",
                first_spec.rate, spec.rate
            )));
        }

        let mut samples = SampleBuffer::<i16>::new(packet_frames as u64, spec);
        samples.copy_interleaved_ref(decoded);
        for &sample in samples.samples() {
            wav.write_sample(sample)
                .map_err(|e| TranscodeError::Storage(format!("WAV write failed: {}", e)))?;
        }
        frames += packet_frames as u64;
    }

    let Some((wav, spec)) = writer else {
        return Err(TranscodeError::MalformedInput(
            "stream contained no audio frames".to_string(),
        ));
    };

    wav.finalize()
        .map_err(|e| TranscodeError::Storage(format!("failed to finalize WAV: {}", e)))?;

    Ok(WavSummary {
        sample_rate: spec.rate,
        channels: spec.channels.count() as u16,
        frames,
    })
}
