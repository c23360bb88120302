//! # Host Bridge Traits
//!
//! Capabilities the cry pipeline needs from its host, expressed as traits so
//! each platform can ship its own implementation.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - single-shot async HTTP
//! - [`FileSystemAccess`](storage::FileSystemAccess) - cache and scratch file I/O
//! - [`PlaybackAdapter`](playback::PlaybackAdapter) - audible output of decoded files
//! - [`LoggerSink`](logging::LoggerSink) - forward structured logs to the host
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Others   | injected by the host through `CryConfig` |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the original message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod logging;
pub mod playback;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use playback::{
    PlaybackAdapter, PlaybackOptions, PlaybackRequest, PlaybackSessionId, PlaybackState,
};
pub use storage::{FileMetadata, FileSystemAccess};
