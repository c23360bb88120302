//! Container sniffing for downloaded cry payloads.

use std::fmt;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Containers the transcoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Ogg container, normally carrying Vorbis
    Ogg,
    /// RIFF/WAVE, already PCM but re-encoded to the cache format
    Wav,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 2] = [SourceFormat::Ogg, SourceFormat::Wav];

    /// Detect the container from its magic bytes.
    ///
    /// ```rust
    /// use core_playback::transcode::SourceFormat;
    ///
    /// assert_eq!(SourceFormat::sniff(b"OggS\0\x02"), Some(SourceFormat::Ogg));
    /// assert_eq!(SourceFormat::sniff(b"<html>"), None);
    /// ```
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"OggS") {
            return Some(SourceFormat::Ogg);
        }

        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Some(SourceFormat::Wav);
        }

        debug!(
            prefix = ?&bytes[..bytes.len().min(4)],
            "Payload does not start with a known container signature"
        );
        None
    }

    /// File extension used for the transient copy.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Ogg => "ogg",
            SourceFormat::Wav => "wav",
        }
    }

    /// Probe hint for symphonia.
    pub fn hint(&self) -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(self.extension());
        hint
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
