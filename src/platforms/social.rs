use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::core::direct;
use crate::core::platform::Platform;
use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
use crate::models::settings::InstagramCredentials;
use crate::platforms::traits::{ExtractError, Extractor};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const IG_APP_ID: &str = "936619743392459";

/// Single-post/story platforms behind an authenticated web API. Credentials
/// are optional: a failed or missing login degrades to anonymous access,
/// which works for public posts; private content then surfaces an
/// auth-required error instead of a generic failure.
pub struct SocialPostExtractor {
    client: reqwest::Client,
    credentials: Option<InstagramCredentials>,
    login_attempted: Mutex<bool>,
}

impl SocialPostExtractor {
    pub fn new(credentials: Option<InstagramCredentials>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            credentials,
            login_attempted: Mutex::new(false),
        }
    }

    fn extract_shortcode(url: &str) -> Option<String> {
        let parsed = url::Url::parse(url).ok()?;
        let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();
        match segments.first() {
            Some(&"p") | Some(&"reel") | Some(&"tv") => segments.get(1).map(|s| s.to_string()),
            _ => None,
        }
    }

    /// Best-effort session login. Failure is logged and swallowed — public
    /// posts keep working anonymously.
    async fn ensure_login(&self) {
        let Some(creds) = &self.credentials else {
            return;
        };
        let mut attempted = self.login_attempted.lock().await;
        if *attempted {
            return;
        }
        *attempted = true;

        let result = self
            .client
            .post("https://www.instagram.com/accounts/login/ajax/")
            .header("X-IG-App-ID", IG_APP_ID)
            .form(&[
                ("username", creds.username.as_str()),
                ("enc_password", creds.password.as_str()),
            ])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!("[social] login succeeded for {}", creds.username);
            }
            Ok(resp) => {
                tracing::warn!(
                    "[social] login failed (HTTP {}), continuing unauthenticated",
                    resp.status()
                );
            }
            Err(e) => {
                tracing::warn!("[social] login failed, continuing unauthenticated: {}", e);
            }
        }
    }

    async fn fetch_post_json(&self, shortcode: &str) -> Result<serde_json::Value, ExtractError> {
        let url = format!(
            "https://www.instagram.com/p/{}/?__a=1&__d=dis",
            shortcode
        );
        let response = self
            .client
            .get(&url)
            .header("X-IG-App-ID", IG_APP_ID)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ExtractError::AuthRequired(format!(
                "HTTP {} ao consultar o post {}",
                status, shortcode
            )));
        }
        if status.as_u16() == 404 {
            return Err(ExtractError::NotFound(format!(
                "post {} não existe ou foi removido",
                shortcode
            )));
        }
        if status.as_u16() == 429 {
            return Err(ExtractError::RateLimited(format!(
                "HTTP 429 ao consultar o post {}",
                shortcode
            )));
        }
        if !status.is_success() {
            return Err(ExtractError::Transient(format!(
                "HTTP {} ao consultar o post {}",
                status, shortcode
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Transient(format!("resposta inválida: {}", e)))?;

        // anonymous sessions get an empty shell for private posts
        let media = json
            .pointer("/graphql/shortcode_media")
            .or_else(|| json.pointer("/items/0"))
            .cloned();
        media.ok_or_else(|| {
            ExtractError::AuthRequired(format!(
                "post {} não acessível sem sessão autenticada",
                shortcode
            ))
        })
    }

    fn parse_info(media: &serde_json::Value) -> MediaInfo {
        let is_video = media
            .get("is_video")
            .and_then(|v| v.as_bool())
            .unwrap_or_else(|| media.get("video_url").is_some());

        let caption = media
            .pointer("/edge_media_to_caption/edges/0/node/text")
            .or_else(|| media.pointer("/caption/text"))
            .and_then(|v| v.as_str())
            .unwrap_or("Post");
        let title: String = caption.chars().take(100).collect();

        let uploader = media
            .pointer("/owner/username")
            .or_else(|| media.pointer("/user/username"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        let sidecar_count = media
            .pointer("/edge_sidecar_to_children/edges")
            .and_then(|v| v.as_array())
            .map(|a| a.len() as u32);

        MediaInfo {
            title,
            uploader,
            platform: Platform::Instagram,
            duration_seconds: media.get("video_duration").and_then(|v| v.as_f64()),
            view_count: media
                .get("video_view_count")
                .or_else(|| media.pointer("/edge_media_preview_like/count"))
                .and_then(|v| v.as_u64()),
            upload_date: media
                .get("taken_at_timestamp")
                .and_then(|v| v.as_i64())
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y%m%d").to_string()),
            thumbnail_url: media
                .get("display_url")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            media_type: if sidecar_count.unwrap_or(1) > 1 {
                MediaType::Gallery
            } else if is_video {
                MediaType::Video
            } else {
                MediaType::Image
            },
            media_count: sidecar_count.unwrap_or(1),
        }
    }

    fn media_url(media: &serde_json::Value) -> Option<(String, &'static str)> {
        if let Some(video) = media.get("video_url").and_then(|v| v.as_str()) {
            return Some((video.to_string(), "mp4"));
        }
        media
            .get("display_url")
            .and_then(|v| v.as_str())
            .map(|s| (s.to_string(), "jpg"))
    }
}

#[async_trait]
impl Extractor for SocialPostExtractor {
    fn name(&self) -> &'static str {
        "social_post"
    }

    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ExtractError> {
        let shortcode = Self::extract_shortcode(url).ok_or_else(|| {
            ExtractError::NotFound(format!("URL de post não reconhecida: {}", url))
        })?;
        self.ensure_login().await;
        let media = self.fetch_post_json(&shortcode).await?;
        Ok(Self::parse_info(&media))
    }

    async fn fetch_media(
        &self,
        url: &str,
        _opts: &DownloadOptions,
        dest_dir: &Path,
        progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError> {
        let shortcode = Self::extract_shortcode(url).ok_or_else(|| {
            ExtractError::NotFound(format!("URL de post não reconhecida: {}", url))
        })?;
        self.ensure_login().await;
        let media = self.fetch_post_json(&shortcode).await?;

        let (media_url, ext) = Self::media_url(&media).ok_or_else(|| {
            ExtractError::Transient(format!("post {} não contém mídia baixável", shortcode))
        })?;

        tokio::fs::create_dir_all(dest_dir).await?;
        let output = dest_dir.join(format!("{}.{}", shortcode, ext));

        let size = direct::download_direct(&self.client, &media_url, &output, &progress)
            .await
            .map_err(|e| ExtractError::from_signature(e.to_string()))?;

        Ok(ArtifactDescriptor {
            path: output,
            size_bytes: size,
        })
    }
}
