//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs` and `dirs`
//! - `PlaybackAdapter` using `rodio` on a dedicated audio thread
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, RodioPlaybackAdapter, TokioFileSystem};
//! use std::time::Duration;
//!
//! let http = ReqwestHttpClient::new(Duration::from_secs(30), Duration::from_secs(10), "my-app/1.0")?;
//! let fs = TokioFileSystem::new();
//! let audio = RodioPlaybackAdapter::new()?;
//! ```

mod filesystem;
mod http;
mod playback;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use playback::RodioPlaybackAdapter;
