use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::direct;
use crate::core::platform::Platform;
use crate::models::media::{ArtifactDescriptor, DownloadOptions, MediaInfo, MediaType};
use crate::models::settings::RedditCredentials;
use crate::platforms::traits::{ExtractError, Extractor};

const USER_AGENT: &str = "anyfetch/0.1 (media fetcher)";

/// Link-aggregator posts (Reddit and mirrors). The public `.json` endpoint
/// is tried first; when an app credential pair is configured, a 403/429 from
/// the public endpoint triggers one retry through the OAuth API.
pub struct LinkAggregatorExtractor {
    client: reqwest::Client,
    credentials: Option<RedditCredentials>,
}

enum PostMedia {
    Video { url: String, duration: Option<f64> },
    Gif { url: String },
    Image { url: String },
    Gallery { items: Vec<GalleryItem> },
}

struct GalleryItem {
    url: String,
    ext: String,
}

impl LinkAggregatorExtractor {
    pub fn new(credentials: Option<RedditCredentials>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            credentials,
        }
    }

    fn extract_post_id(url: &str) -> Option<String> {
        let parsed = url::Url::parse(url).ok()?;
        let segments: Vec<&str> = parsed.path().split('/').filter(|s| !s.is_empty()).collect();

        if segments.len() >= 4 && segments[0] == "r" && segments[2] == "comments" {
            return Some(segments[3].to_string());
        }

        if segments.first() == Some(&"comments") {
            return segments.get(1).map(|s| s.to_string());
        }

        None
    }

    async fn fetch_post_data(&self, post_id: &str) -> Result<serde_json::Value, ExtractError> {
        let url = format!("https://www.reddit.com/comments/{}.json", post_id);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 403 || status == 429 {
            if self.credentials.is_some() {
                tracing::info!("[aggregator] HTTP {} no endpoint público, tentando OAuth", status);
                return self.fetch_post_data_oauth(post_id).await;
            }
            return Err(ExtractError::RateLimited(format!(
                "HTTP {} ao consultar o post {}",
                status, post_id
            )));
        }
        if status == 404 {
            return Err(ExtractError::NotFound(format!(
                "post {} não existe ou foi removido",
                post_id
            )));
        }
        if !response.status().is_success() {
            return Err(ExtractError::Transient(format!(
                "HTTP {} ao consultar o post {}",
                status, post_id
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Transient(format!("resposta inválida: {}", e)))?;
        Self::unwrap_listing(json, post_id)
    }

    async fn fetch_post_data_oauth(&self, post_id: &str) -> Result<serde_json::Value, ExtractError> {
        let token = self.acquire_token().await?;
        let url = format!("https://oauth.reddit.com/comments/{}.json", post_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractError::from_signature(format!(
                "HTTP {} ao consultar o post {} via OAuth",
                response.status(),
                post_id
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Transient(format!("resposta inválida: {}", e)))?;
        Self::unwrap_listing(json, post_id)
    }

    async fn acquire_token(&self) -> Result<String, ExtractError> {
        let creds = self.credentials.as_ref().ok_or_else(|| {
            ExtractError::AuthRequired("credenciais de API não configuradas".into())
        })?;

        let response = self
            .client
            .post("https://www.reddit.com/api/v1/access_token")
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractError::AuthRequired(format!(
                "HTTP {} ao obter token de acesso",
                response.status()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Transient(format!("resposta inválida: {}", e)))?;
        json.get("access_token")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ExtractError::AuthRequired("token de acesso ausente na resposta".into()))
    }

    fn unwrap_listing(
        json: serde_json::Value,
        post_id: &str,
    ) -> Result<serde_json::Value, ExtractError> {
        json.as_array()
            .and_then(|arr| arr.first())
            .and_then(|listing| listing.pointer("/data/children/0/data"))
            .cloned()
            .ok_or_else(|| ExtractError::NotFound(format!("post {} não encontrado", post_id)))
    }

    fn parse_media(data: &serde_json::Value) -> Option<PostMedia> {
        let is_gallery = data
            .get("is_gallery")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if is_gallery {
            if let Some(gallery) = Self::parse_gallery(data) {
                return Some(gallery);
            }
        }

        if let Some(url) = data.get("url").and_then(|v| v.as_str()) {
            if url.ends_with(".gif") {
                return Some(PostMedia::Gif {
                    url: url.to_string(),
                });
            }
        }

        if let Some(video) = data.pointer("/secure_media/reddit_video") {
            let fallback = video.get("fallback_url").and_then(|v| v.as_str())?;
            let url = fallback.split('?').next().unwrap_or(fallback).to_string();
            return Some(PostMedia::Video {
                url,
                duration: video.get("duration").and_then(|v| v.as_f64()),
            });
        }

        if let Some(url) = data.get("url").and_then(|v| v.as_str()) {
            let is_media = data
                .get("is_reddit_media_domain")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            if is_media
                || url.contains("i.redd.it")
                || url.ends_with(".jpg")
                || url.ends_with(".jpeg")
                || url.ends_with(".png")
            {
                return Some(PostMedia::Image {
                    url: url.to_string(),
                });
            }
        }

        None
    }

    fn parse_gallery(data: &serde_json::Value) -> Option<PostMedia> {
        let gallery_data = data.get("gallery_data")?.get("items")?.as_array()?;
        let media_metadata = data.get("media_metadata")?;

        let mut items = Vec::new();
        for item in gallery_data {
            let media_id = item.get("media_id").and_then(|v| v.as_str())?;
            let meta = media_metadata.get(media_id)?;

            let mime = meta.get("m").and_then(|v| v.as_str()).unwrap_or("image/jpeg");
            let ext = match mime {
                "image/png" => "png",
                "image/gif" => "gif",
                "image/webp" => "webp",
                _ => "jpg",
            };

            let url = meta
                .get("s")
                .and_then(|s| s.get("u").or_else(|| s.get("gif")))
                .and_then(|v| v.as_str())
                .map(|u| u.replace("&amp;", "&"));

            if let Some(url) = url {
                items.push(GalleryItem {
                    url,
                    ext: ext.to_string(),
                });
            }
        }

        if items.is_empty() {
            return None;
        }
        Some(PostMedia::Gallery { items })
    }

    fn parse_info(data: &serde_json::Value) -> MediaInfo {
        let media = Self::parse_media(data);
        let (media_type, media_count, duration) = match &media {
            Some(PostMedia::Video { duration, .. }) => (MediaType::Video, 1, *duration),
            Some(PostMedia::Gif { .. }) => (MediaType::Video, 1, None),
            Some(PostMedia::Gallery { items }) => (MediaType::Gallery, items.len() as u32, None),
            Some(PostMedia::Image { .. }) | None => (MediaType::Image, 1, None),
        };

        MediaInfo {
            title: data
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or("Post")
                .to_string(),
            uploader: data
                .get("author")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string(),
            platform: Platform::Reddit,
            duration_seconds: duration,
            view_count: data.get("ups").and_then(|v| v.as_u64()),
            upload_date: data
                .get("created_utc")
                .and_then(|v| v.as_f64())
                .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
                .map(|dt| dt.format("%Y%m%d").to_string()),
            thumbnail_url: data
                .get("thumbnail")
                .and_then(|v| v.as_str())
                .filter(|t| t.starts_with("http"))
                .map(|s| s.to_string()),
            media_type,
            media_count,
        }
    }
}

#[async_trait]
impl Extractor for LinkAggregatorExtractor {
    fn name(&self) -> &'static str {
        "link_aggregator"
    }

    async fn fetch_info(&self, url: &str) -> Result<MediaInfo, ExtractError> {
        let post_id = Self::extract_post_id(url).ok_or_else(|| {
            ExtractError::NotFound(format!("URL de post não reconhecida: {}", url))
        })?;
        let data = self.fetch_post_data(&post_id).await?;
        Ok(Self::parse_info(&data))
    }

    async fn fetch_media(
        &self,
        url: &str,
        _opts: &DownloadOptions,
        dest_dir: &Path,
        progress: mpsc::Sender<f64>,
    ) -> Result<ArtifactDescriptor, ExtractError> {
        let post_id = Self::extract_post_id(url).ok_or_else(|| {
            ExtractError::NotFound(format!("URL de post não reconhecida: {}", url))
        })?;
        let data = self.fetch_post_data(&post_id).await?;
        let media = Self::parse_media(&data).ok_or_else(|| {
            ExtractError::Transient(format!("post {} não contém mídia baixável", post_id))
        })?;

        tokio::fs::create_dir_all(dest_dir).await?;

        let descriptor = match media {
            PostMedia::Video { url, .. } => {
                let output = dest_dir.join(format!("{}.mp4", post_id));
                let size = direct::download_direct(&self.client, &url, &output, &progress)
                    .await
                    .map_err(|e| ExtractError::from_signature(e.to_string()))?;
                ArtifactDescriptor {
                    path: output,
                    size_bytes: size,
                }
            }
            PostMedia::Gif { url } => {
                let output = dest_dir.join(format!("{}.gif", post_id));
                let size = direct::download_direct(&self.client, &url, &output, &progress)
                    .await
                    .map_err(|e| ExtractError::from_signature(e.to_string()))?;
                ArtifactDescriptor {
                    path: output,
                    size_bytes: size,
                }
            }
            PostMedia::Image { url } => {
                let ext = if url.ends_with(".png") { "png" } else { "jpg" };
                let output = dest_dir.join(format!("{}.{}", post_id, ext));
                let size = direct::download_direct(&self.client, &url, &output, &progress)
                    .await
                    .map_err(|e| ExtractError::from_signature(e.to_string()))?;
                ArtifactDescriptor {
                    path: output,
                    size_bytes: size,
                }
            }
            PostMedia::Gallery { items } => {
                // gallery items land side by side; the first is the
                // representative artifact and total size covers all of them
                let total = items.len();
                let mut first_path = None;
                let mut total_bytes = 0u64;
                for (i, item) in items.iter().enumerate() {
                    let output = dest_dir.join(format!("{}_{:02}.{}", post_id, i + 1, item.ext));
                    let size = direct::download_direct(&self.client, &item.url, &output, &progress)
                        .await
                        .map_err(|e| ExtractError::from_signature(e.to_string()))?;
                    total_bytes += size;
                    if first_path.is_none() {
                        first_path = Some(output);
                    }
                    let pct = ((i + 1) as f64 / total as f64) * 100.0;
                    let _ = progress.try_send(pct);
                }
                ArtifactDescriptor {
                    path: first_path.ok_or_else(|| {
                        ExtractError::Transient("galeria vazia".into())
                    })?,
                    size_bytes: total_bytes,
                }
            }
        };

        let _ = progress.try_send(100.0);
        Ok(descriptor)
    }
}
