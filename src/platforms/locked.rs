use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::platform::Platform;
use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
use crate::platforms::traits::{ExtractError, Extractor};

/// Streaming services whose content is DRM-protected. Registered so these
/// URLs get a clear refusal instead of a confusing extractor failure.
pub struct LockedMediaExtractor;

impl LockedMediaExtractor {
    pub fn new() -> Self {
        Self
    }

    fn refusal(url: &str) -> ExtractError {
        ExtractError::PolicyBlocked(format!(
            "conteúdo protegido por DRM não pode ser baixado: {}",
            url
        ))
    }
}

impl Default for LockedMediaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for LockedMediaExtractor {
    fn name(&self) -> &'static str {
        "locked_media"
    }

    async fn fetch_info(&self, _url: &str) -> Result<MediaInfo, ExtractError> {
        Ok(MediaInfo {
            title: "Conteúdo protegido".to_string(),
            uploader: "unknown".to_string(),
            platform: Platform::DrmLocked,
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
        url: &str,
        _opts: &DownloadOptions,
        _dest_dir: &Path,
        _progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError> {
        Err(Self::refusal(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::DownloadOptions;

    #[tokio::test]
    async fn download_is_always_refused() {
        let extractor = LockedMediaExtractor::new();
        let (tx, _rx) = mpsc::channel(4);
        let err = extractor
            .fetch_media(
                "https://www.netflix.com/watch/1",
                &DownloadOptions::default(),
                Path::new("/tmp"),
                tx,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::PolicyBlocked(_)));
    }
}
