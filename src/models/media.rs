use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::platform::Platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: String,
    pub uploader: String,
    pub platform: Platform,
    pub duration_seconds: Option<f64>,
    pub view_count: Option<u64>,
    pub upload_date: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media_type: MediaType,
    pub media_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Audio,
    Image,
    Gallery,
}

/// Request parameters forwarded to an extractor. The destination directory
/// is NOT part of these options; it is always supplied by the orchestrator
/// so the artifact layout stays centralized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub quality: String,
    pub audio_only: bool,
    pub output_format: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: "best".into(),
            audio_only: false,
            output_format: "mp4".into(),
        }
    }
}

/// What an extractor hands back on success: the exact file it produced.
/// No directory scanning — the file either exists at this path or the
/// download did not happen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
}
