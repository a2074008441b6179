use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod core;
pub mod models;
pub mod platforms;
pub mod storage;

use crate::core::cache::TtlCache;
use crate::core::orchestrator::DownloadOrchestrator;
use crate::core::paths::ArtifactStore;
use crate::core::platform::Platform;
use crate::core::registry::ExtractorRegistry;
use crate::models::media::MediaInfo;
use crate::models::settings::{AppSettings, CredentialSettings};
use crate::storage::jobs::{JobStore, JsonJobStore};

const INFO_CACHE_CAPACITY: usize = 256;
const INFO_CACHE_TTL_SECS: u64 = 300;

/// Everything an embedding server needs to serve the operations in
/// [`api`]. Built once at startup and shared behind an `Arc`.
pub struct AppState {
    pub settings: AppSettings,
    pub registry: Arc<ExtractorRegistry>,
    pub jobs: Arc<dyn JobStore>,
    pub artifacts: ArtifactStore,
    pub orchestrator: DownloadOrchestrator,
    pub info_cache: TtlCache<String, MediaInfo>,
}

impl AppState {
    /// Loads settings, opens the persistent job store under the data dir,
    /// and wires the default extractor set.
    pub async fn init() -> anyhow::Result<Self> {
        let settings = storage::config::load_settings().await;
        let jobs: Arc<dyn JobStore> = Arc::new(
            JsonJobStore::open(storage::config::data_dir().join("jobs.json")).await?,
        );
        let registry = default_registry(&settings.credentials);
        let artifacts = ArtifactStore::from_settings(&settings.download.base_dir);
        Ok(Self::with_parts(settings, registry, jobs, artifacts))
    }

    pub fn with_parts(
        settings: AppSettings,
        registry: ExtractorRegistry,
        jobs: Arc<dyn JobStore>,
        artifacts: ArtifactStore,
    ) -> Self {
        let registry = Arc::new(registry);
        let orchestrator = DownloadOrchestrator::new(
            Arc::clone(&registry),
            Arc::clone(&jobs),
            artifacts.clone(),
            settings.download.max_concurrent,
        );
        Self {
            settings,
            registry,
            jobs,
            artifacts,
            orchestrator,
            info_cache: TtlCache::new(
                INFO_CACHE_CAPACITY,
                Duration::from_secs(INFO_CACHE_TTL_SECS),
            ),
        }
    }
}

/// The stock extractor set. Streaming extraction covers both the primary
/// video platform and generic video hosts through the same subprocess
/// wrapper; DRM-locked services get a refusing extractor so their URLs
/// fail with a clear message instead of an unsupported-platform error.
pub fn default_registry(credentials: &CredentialSettings) -> ExtractorRegistry {
    use crate::platforms::aggregator::LinkAggregatorExtractor;
    use crate::platforms::gallery::GallerySiteExtractor;
    use crate::platforms::locked::LockedMediaExtractor;
    use crate::platforms::social::SocialPostExtractor;
    use crate::platforms::streaming::StreamingMediaExtractor;

    let mut registry = ExtractorRegistry::new();
    registry.register(
        Platform::YouTube,
        Arc::new(StreamingMediaExtractor::new(Platform::YouTube)),
    );
    registry.register(
        Platform::GenericVideo,
        Arc::new(StreamingMediaExtractor::new(Platform::GenericVideo)),
    );
    registry.register(
        Platform::Instagram,
        Arc::new(SocialPostExtractor::new(credentials.instagram.clone())),
    );
    registry.register(
        Platform::Reddit,
        Arc::new(LinkAggregatorExtractor::new(credentials.reddit.clone())),
    );
    registry.register(Platform::GallerySite, Arc::new(GallerySiteExtractor::new()));
    registry.register(Platform::DrmLocked, Arc::new(LockedMediaExtractor::new()));
    registry
}

pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
