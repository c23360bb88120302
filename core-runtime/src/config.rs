//! # Configuration
//!
//! `CryConfig` holds the settings and host bridges the cry pipeline needs.
//! It is built through [`CryConfigBuilder`], which validates values and
//! fails fast with actionable messages when a bridge is missing.
//!
//! ## Bridges
//!
//! - `HttpClient` - downloads (desktop default: reqwest)
//! - `FileSystemAccess` - cache and scratch files (desktop default: tokio fs)
//! - `PlaybackAdapter` - audio output (desktop default: rodio)
//!
//! With the `desktop-shims` feature the desktop defaults are injected for any
//! bridge the host leaves out. Without it every bridge is required.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CryConfig;
//! use std::time::Duration;
//!
//! let config = CryConfig::builder()
//!     .cache_dir("/tmp/cries")
//!     .http_timeout(Duration::from_secs(15))
//!     .max_cache_entries(64)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient, PlaybackAdapter};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_CREATURE_API_BASE: &str = "https://pokeapi.co/api/v2";

/// Default `User-Agent` sent with every request.
pub fn default_user_agent() -> String {
    format!("cry-pipeline/{}", env!("CARGO_PKG_VERSION"))
}

/// Validated configuration for the cry pipeline.
#[derive(Clone)]
pub struct CryConfig {
    /// Where decoded audio is stored; `None` uses the filesystem bridge default
    pub cache_dir: Option<PathBuf>,

    /// Where transient downloads are written; `None` uses the filesystem bridge default
    pub temp_dir: Option<PathBuf>,

    /// Whole-request timeout applied by the fetch client
    pub http_timeout: Duration,

    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Upper bound on cached cries; `None` keeps everything for the process lifetime
    pub max_cache_entries: Option<NonZeroUsize>,

    /// Collapse concurrent cache misses for the same URL into one fetch+decode
    pub dedupe_in_flight: bool,

    /// Delete the downloaded source file once it has been decoded
    pub remove_transient_files: bool,

    pub event_buffer_size: usize,

    /// Base URL of the creature API used to resolve names to cry URLs
    pub creature_api_base: String,

    pub http_client: Arc<dyn HttpClient>,

    pub file_system: Arc<dyn FileSystemAccess>,

    pub playback_adapter: Arc<dyn PlaybackAdapter>,
}

impl std::fmt::Debug for CryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryConfig")
            .field("cache_dir", &self.cache_dir)
            .field("temp_dir", &self.temp_dir)
            .field("http_timeout", &self.http_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("max_cache_entries", &self.max_cache_entries)
            .field("dedupe_in_flight", &self.dedupe_in_flight)
            .field("remove_transient_files", &self.remove_transient_files)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("creature_api_base", &self.creature_api_base)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("playback_adapter", &"PlaybackAdapter { ... }")
            .finish()
    }
}

impl CryConfig {
    /// Creates a new builder for constructing a `CryConfig`.
    pub fn builder() -> CryConfigBuilder {
        CryConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Timeouts are non-zero
    /// - User agent is not blank
    /// - Event buffer can hold at least one event
    /// - Creature API base is an absolute http(s) URL
    /// - Directory overrides are not empty paths
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout.is_zero() {
            return Err(Error::Config(
                "HTTP timeout must be greater than zero".to_string(),
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(Error::Config(
                "Connect timeout must be greater than zero".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be at least 1".to_string(),
            ));
        }

        for (name, dir) in [("Cache", &self.cache_dir), ("Temp", &self.temp_dir)] {
            if matches!(dir, Some(path) if path.as_os_str().is_empty()) {
                return Err(Error::Config(format!(
                    "{} directory override cannot be empty",
                    name
                )));
            }
        }

        match url::Url::parse(&self.creature_api_base) {
            Ok(base) if matches!(base.scheme(), "http" | "https") && base.has_host() => Ok(()),
            Ok(base) => Err(Error::Config(format!(
                "Creature API base must be an http(s) URL, got scheme '{}'",
                base.scheme()
            ))),
            Err(e) => Err(Error::Config(format!(
                "Creature API base is not a valid URL: {}",
                e
            ))),
        }
    }
}

/// Builder for [`CryConfig`].
///
/// Every field is optional. [`build()`](CryConfigBuilder::build) fills in
/// defaults, injects desktop bridges when available, and validates.
#[derive(Default)]
pub struct CryConfigBuilder {
    cache_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    http_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    max_cache_entries: Option<usize>,
    dedupe_in_flight: Option<bool>,
    remove_transient_files: Option<bool>,
    event_buffer_size: Option<usize>,
    creature_api_base: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    playback_adapter: Option<Arc<dyn PlaybackAdapter>>,
}

impl CryConfigBuilder {
    /// Sets the directory for decoded audio.
    pub fn cache_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Sets the directory for transient downloads.
    pub fn temp_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.temp_dir = Some(path.into());
        self
    }

    /// Default: 30 seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Default: 10 seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Bound the cache; the least recently used cry is evicted past this size.
    ///
    /// `0` is rejected by [`build()`](Self::build).
    pub fn max_cache_entries(mut self, entries: usize) -> Self {
        self.max_cache_entries = Some(entries);
        self
    }

    /// Default: `true`.
    pub fn dedupe_in_flight(mut self, enabled: bool) -> Self {
        self.dedupe_in_flight = Some(enabled);
        self
    }

    /// Default: `true`.
    pub fn remove_transient_files(mut self, enabled: bool) -> Self {
        self.remove_transient_files = Some(enabled);
        self
    }

    /// Default: 100.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Default: `https://pokeapi.co/api/v2`.
    pub fn creature_api_base(mut self, base: impl Into<String>) -> Self {
        self.creature_api_base = Some(base.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn playback_adapter(mut self, adapter: Arc<dyn PlaybackAdapter>) -> Self {
        self.playback_adapter = Some(adapter);
        self
    }

    /// Builds the final `CryConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no desktop default exists
    /// - [`Error::Config`] when a value is out of range
    pub fn build(self) -> Result<CryConfig> {
        let http_timeout = self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT);
        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let user_agent = self.user_agent.unwrap_or_else(default_user_agent);

        let max_cache_entries = match self.max_cache_entries {
            None => None,
            Some(n) => Some(NonZeroUsize::new(n).ok_or_else(|| {
                Error::Config(
                    "max_cache_entries must be at least 1. Leave it unset for an unbounded cache."
                        .to_string(),
                )
            })?),
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(http_timeout, connect_timeout, &user_agent)?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let playback_adapter = match self.playback_adapter {
            Some(adapter) => adapter,
            None => provide_default_playback_adapter()?,
        };

        let config = CryConfig {
            cache_dir: self.cache_dir,
            temp_dir: self.temp_dir,
            http_timeout,
            connect_timeout,
            user_agent,
            max_cache_entries,
            dedupe_in_flight: self.dedupe_in_flight.unwrap_or(true),
            remove_transient_files: self.remove_transient_files.unwrap_or(true),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            creature_api_base: self
                .creature_api_base
                .unwrap_or_else(|| DEFAULT_CREATURE_API_BASE.to_string()),
            http_client,
            file_system,
            playback_adapter,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: &str,
) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new(timeout, connect_timeout, user_agent)?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _timeout: Duration,
    _connect_timeout: Duration,
    _user_agent: &str,
) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject one with CryConfigBuilder::http_client."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Ok(Arc::new(bridge_desktop::TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "No file system implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
                 Other hosts: inject one with CryConfigBuilder::file_system."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
    Ok(Arc::new(bridge_desktop::RodioPlaybackAdapter::new()?))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_playback_adapter() -> Result<Arc<dyn PlaybackAdapter>> {
    Err(Error::CapabilityMissing {
        capability: "PlaybackAdapter".to_string(),
        message: "No playback adapter provided. \
                 Desktop: enable the 'desktop-shims' feature to use RodioPlaybackAdapter. \
                 Other hosts: inject one with CryConfigBuilder::playback_adapter."
            .to_string(),
    })
}
