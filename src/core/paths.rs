use std::path::{Path, PathBuf};

use crate::core::filename::sanitize;
use crate::core::platform::Platform;

/// Deterministic artifact layout: base dir → platform namespace → uploader
/// → file. The one mapping shared by the download writer and the later
/// file-serving and deletion paths; any divergence between them silently
/// breaks retrieval, so they all go through this type.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    base_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Honors `ANYFETCH_DOWNLOAD_DIR` over the configured base dir.
    pub fn from_settings(configured: &Path) -> Self {
        if let Ok(dir) = std::env::var("ANYFETCH_DOWNLOAD_DIR") {
            return Self::new(dir);
        }
        Self::new(configured)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The native-video platform writes straight into the base dir;
    /// everything else gets a named subdirectory so identically-named
    /// uploaders on different platforms cannot collide.
    fn namespace(platform: Platform) -> Option<&'static str> {
        match platform {
            Platform::YouTube => None,
            Platform::Instagram => Some("Instagram"),
            Platform::Reddit => Some("Reddit"),
            Platform::GallerySite => Some("Galleries"),
            Platform::GenericVideo | Platform::DrmLocked | Platform::Unknown => Some("Other"),
        }
    }

    pub fn dir_for(&self, platform: Platform, uploader: &str) -> PathBuf {
        let mut dir = self.base_dir.clone();
        if let Some(ns) = Self::namespace(platform) {
            dir.push(ns);
        }
        dir.push(sanitize(uploader));
        dir
    }

    pub fn path_for(&self, platform: Platform, uploader: &str, filename: &str) -> PathBuf {
        self.dir_for(platform, uploader).join(sanitize(filename))
    }

    /// Create-if-absent; already-existing directories are fine, so two jobs
    /// for the same uploader can race here safely.
    pub async fn ensure_dir(&self, platform: Platform, uploader: &str) -> std::io::Result<PathBuf> {
        let dir = self.dir_for(platform, uploader);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}
