use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::platform::Platform;
use crate::core::ytdlp;
use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
use crate::platforms::traits::{ExtractError, Extractor};

/// Direct-video platforms, backed by a yt-dlp subprocess. Quality capping,
/// audio-only extraction and container conversion are all handed to the
/// wrapped tool as post-processing steps.
pub struct StreamingMediaExtractor {
    platform: Platform,
}

impl StreamingMediaExtractor {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn parse_info(&self, json: &serde_json::Value) -> MediaInfo {
        let title = json
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();

        let uploader = json
            .get("uploader")
            .or_else(|| json.get("channel"))
            .or_else(|| json.get("uploader_id"))
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string();

        let has_video = json
            .get("formats")
            .and_then(|v| v.as_array())
            .map(|formats| {
                formats.iter().any(|f| {
                    f.get("vcodec")
                        .and_then(|v| v.as_str())
                        .map(|v| v != "none")
                        .unwrap_or(false)
                })
            })
            .unwrap_or(true);

        MediaInfo {
            title,
            uploader,
            platform: self.platform,
            duration_seconds: json.get("duration").and_then(|v| v.as_f64()),
            view_count: json.get("view_count").and_then(|v| v.as_u64()),
            upload_date: json
                .get("upload_date")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            thumbnail_url: json
                .get("thumbnail")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            media_type: if has_video {
                MediaType::Video
            } else {
                MediaType::Audio
            },
            media_count: 1,
        }
    }
}

#[async_trait]
impl Extractor for StreamingMediaExtractor {
    fn name(&self) -> &'static str {
        "streaming"
    }

    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ExtractError> {
        let ytdlp = ytdlp::find_ytdlp()
            .await
            .map_err(|e| ExtractError::Transient(e.to_string()))?;
        let json = ytdlp::dump_info(&ytdlp, url)
            .await
            .map_err(|e| ExtractError::from_signature(e.to_string()))?;
        Ok(self.parse_info(&json))
    }

    async fn fetch_media(
        &self,
        url: &str,
        opts: &DownloadOptions,
        dest_dir: &Path,
        progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError> {
        let ytdlp = ytdlp::find_ytdlp()
            .await
            .map_err(|e| ExtractError::Transient(e.to_string()))?;

        tokio::fs::create_dir_all(dest_dir).await?;

        ytdlp::download_media(
            &ytdlp,
            url,
            dest_dir,
            ytdlp::quality_height(&opts.quality),
            opts.audio_only,
            &opts.output_format,
            progress,
        )
        .await
        .map_err(|e| ExtractError::from_signature(e.to_string()))
    }
}
