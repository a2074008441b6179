use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub schema_version: u32,
    pub download: DownloadSettings,
    pub credentials: CredentialSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    pub base_dir: PathBuf,
    pub max_concurrent: usize,
    pub default_quality: String,
    pub default_format: String,
}

/// Credential material is injected into the extractor registry at startup;
/// nothing else in the crate reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialSettings {
    pub instagram: Option<InstagramCredentials>,
    pub reddit: Option<RedditCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            download: DownloadSettings {
                base_dir: dirs::download_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("anyfetch"),
                max_concurrent: 3,
                default_quality: "best".into(),
                default_format: "mp4".into(),
            },
            credentials: CredentialSettings::default(),
        }
    }
}
