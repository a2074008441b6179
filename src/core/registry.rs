use std::collections::HashMap;
use std::sync::Arc;

use crate::core::platform::Platform;
use crate::platforms::traits::Extractor;

/// 1:1 map from platform id to its extraction strategy. Call sites consult
/// this once instead of re-implementing platform conditionals; `Unknown`
/// deliberately has no entry.
pub struct ExtractorRegistry {
    extractors: HashMap<Platform, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    pub fn register(&mut self, platform: Platform, extractor: Arc<dyn Extractor>) {
        if self.extractors.insert(platform, extractor).is_some() {
            tracing::warn!("[registry] extractor for {} replaced", platform);
        }
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&platform).cloned()
    }

    pub fn supports(&self, platform: Platform) -> bool {
        self.extractors.contains_key(&platform)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
    use crate::platforms::traits::ExtractError;
    use async_trait::async_trait;
    use std::path::Path;
    use tokio::sync::mpsc;

    struct NullExtractor;

    #[async_trait]
    impl Extractor for NullExtractor {
        fn name(&self) -> &'static str {
            "null"
        }

        async fn fetch_info(&self, _url: &str) -> Result<MediaInfo, ExtractError> {
            Ok(MediaInfo {
                title: "t".into(),
                uploader: "u".into(),
                platform: Platform::YouTube,
                duration_seconds: None,
                view_count: None,
                upload_date: None,
                thumbnail_url: None,
                media_type: MediaType::Video,
                media_count: 1,
            })
        }

        async fn fetch_media(
            &self,
            _url: &str,
            _opts: &DownloadOptions,
            _dest_dir: &Path,
            _progress: mpsc::Sender<f64>,
        ) -> Result<ArtifactDescriptor, ExtractError> {
            Err(ExtractError::Transient("null".into()))
        }
    }

    #[test]
    fn lookup_is_one_to_one() {
        let mut registry = ExtractorRegistry::new();
        registry.register(Platform::YouTube, Arc::new(NullExtractor));
        assert!(registry.supports(Platform::YouTube));
        assert!(registry.get(Platform::YouTube).is_some());
        assert!(registry.get(Platform::Reddit).is_none());
    }

    #[test]
    fn unknown_platform_has_no_extractor() {
        let registry = ExtractorRegistry::new();
        assert!(!registry.supports(Platform::Unknown));
    }
}
