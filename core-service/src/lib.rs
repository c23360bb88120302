//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! audio output) into the cry pipeline and adds the creature lookup that
//! turns a name into a cry URL. Desktop hosts typically enable the
//! `desktop-shims` feature, which lets [`CryConfig`] fall back to the
//! `bridge-desktop` adapters when no bridge is injected.
//!
//! ```rust,ignore
//! use core_runtime::config::CryConfig;
//! use core_service::CoreService;
//!
//! let config = CryConfig::builder().build()?;
//! let core = CoreService::new(config).await?;
//! let outcome = core.play_cry_for("pikachu").await?;
//! ```

pub mod creature;
pub mod error;

pub use creature::CreatureClient;
pub use error::{CoreError, Result};

use std::path::Path;
use std::sync::Arc;

use bridge_traits::{http::HttpClient, playback::PlaybackAdapter, storage::FileSystemAccess};
use core_playback::{
    AudioCache, CacheConfig, ClearReport, CryPipeline, FetchClient, PlaybackController,
    PlaybackOutcome, SymphoniaTranscoder,
};
use core_runtime::config::CryConfig;
use core_runtime::events::{EventBus, EventStream};
use tracing::{info, instrument};

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub playback_adapter: Arc<dyn PlaybackAdapter>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        playback_adapter: Arc<dyn PlaybackAdapter>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            playback_adapter,
        }
    }
}

impl From<&CryConfig> for CoreDependencies {
    fn from(config: &CryConfig) -> Self {
        Self::new(
            Arc::clone(&config.http_client),
            Arc::clone(&config.file_system),
            Arc::clone(&config.playback_adapter),
        )
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    deps: Arc<CoreDependencies>,
    pipeline: Arc<CryPipeline>,
    creatures: CreatureClient,
    event_bus: Arc<EventBus>,
}

impl CoreService {
    /// Build the pipeline described by `config`.
    ///
    /// The cache and temp directories come from the config when set, otherwise
    /// from the filesystem bridge, and are created if missing. Decoded and
    /// transient files left there by an earlier process are deleted, so a
    /// cache directory must not be shared by two live services.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Runtime`] if the config is invalid
    /// - [`CoreError::InitializationFailed`] if a directory cannot be resolved
    ///   or created
    #[instrument(skip(config))]
    pub async fn new(config: CryConfig) -> Result<Self> {
        config.validate()?;

        let deps = CoreDependencies::from(&config);
        let fs = Arc::clone(&deps.filesystem);

        let cache_dir = match &config.cache_dir {
            Some(dir) => dir.clone(),
            None => fs
                .get_cache_directory()
                .await
                .map_err(|e| init_failed("resolve cache directory", e))?,
        };
        let temp_dir = match &config.temp_dir {
            Some(dir) => dir.clone(),
            None => fs
                .get_temp_directory()
                .await
                .map_err(|e| init_failed("resolve temp directory", e))?,
        };
        ensure_dir(fs.as_ref(), &cache_dir).await?;
        ensure_dir(fs.as_ref(), &temp_dir).await?;

        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        let mut cache_config = CacheConfig::new();
        if let Some(entries) = config.max_cache_entries {
            cache_config = cache_config.with_max_entries(entries.get());
        }
        let cache = Arc::new(
            AudioCache::new(cache_config, Arc::clone(&fs)).with_event_bus(Arc::clone(&event_bus)),
        );

        let transcoder = Arc::new(
            SymphoniaTranscoder::new(Arc::clone(&fs), cache_dir.clone(), temp_dir.clone())
                .with_remove_transient(config.remove_transient_files),
        );
        let purged = transcoder.purge_stale().await;
        let fetcher = FetchClient::new(Arc::clone(&deps.http_client), config.http_timeout);
        let controller = Arc::new(
            PlaybackController::new(Arc::clone(&deps.playback_adapter))
                .with_event_bus(Arc::clone(&event_bus)),
        );

        let pipeline = CryPipeline::new(cache, fetcher, transcoder, controller)
            .with_dedupe(config.dedupe_in_flight)
            .with_event_bus(Arc::clone(&event_bus));

        let creatures = CreatureClient::new(
            Arc::clone(&deps.http_client),
            config.creature_api_base.clone(),
            config.http_timeout,
        );

        info!(
            dedupe = config.dedupe_in_flight,
            max_cache_entries = config.max_cache_entries.map(|n| n.get()),
            purged,
            "Cry service ready"
        );

        Ok(Self {
            deps: Arc::new(deps),
            pipeline: Arc::new(pipeline),
            creatures,
            event_bus,
        })
    }

    /// Play the cry at `url`.
    pub async fn play_cry(&self, url: &str) -> Result<PlaybackOutcome> {
        Ok(self.pipeline.request(url).await?)
    }

    /// Look up `name` and play its cry.
    pub async fn play_cry_for(&self, name: &str) -> Result<PlaybackOutcome> {
        let url = self.cry_url_for(name).await?;
        self.play_cry(&url).await
    }

    /// Resolve the cry URL of the creature called `name`.
    pub async fn cry_url_for(&self, name: &str) -> Result<String> {
        self.creatures.cry_url(name).await
    }

    /// Drop every cached cry and delete its file.
    pub async fn clear_cache(&self) -> ClearReport {
        self.pipeline.clear_cache().await
    }

    /// Stop the current cry. Returns whether one was playing.
    pub async fn stop_playback(&self) -> Result<bool> {
        self.pipeline
            .stop_playback()
            .await
            .map_err(|e| CoreError::Cry(e.into()))
    }

    /// Subscribe to pipeline, cache and playback events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn pipeline(&self) -> &Arc<CryPipeline> {
        &self.pipeline
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("pipeline", &self.pipeline)
            .field("creatures", &self.creatures)
            .finish()
    }
}

fn init_failed(action: &str, error: impl std::fmt::Display) -> CoreError {
    CoreError::InitializationFailed(format!("failed to {}: {}", action, error))
}

async fn ensure_dir(fs: &dyn FileSystemAccess, dir: &Path) -> Result<()> {
    fs.create_dir_all(dir)
        .await
        .map_err(|e| init_failed(&format!("create {}", dir.display()), e))
}
