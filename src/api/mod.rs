pub mod error;

pub use error::ApiError;

use std::path::PathBuf;

use serde::Serialize;

use crate::core::orchestrator::SubmitError;
use crate::core::platform::Platform;
use crate::models::job::{DownloadRequest, Job, JobQuery, JobStatus};
use crate::models::media::MediaInfo;
use crate::storage::config;
use crate::AppState;

// stats and deletion look at the whole history, not the default page
const FULL_HISTORY_LIMIT: usize = 100_000;

#[derive(Debug, Serialize)]
pub struct DownloadStarted {
    pub job_id: String,
    pub status: &'static str,
    pub platform: Platform,
}

#[derive(Debug, Serialize)]
pub struct ArtifactHandle {
    pub path: PathBuf,
    pub filename: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub file_removed: bool,
}

#[derive(Debug, Serialize)]
pub struct PlatformCapability {
    pub id: Platform,
    pub name: &'static str,
    pub formats: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct DownloadStats {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub success_rate: f64,
}

pub fn health() -> serde_json::Value {
    serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })
}

/// Inspects a URL without starting a download. Results are cached briefly
/// so repeated probes of the same URL do not hammer the upstream site.
pub async fn media_info(state: &AppState, url: &str) -> Result<MediaInfo, ApiError> {
    let platform = Platform::detect(url);
    if platform == Platform::Unknown {
        return Err(ApiError::InvalidInput(format!(
            "não foi possível identificar a plataforma da URL: {}",
            url
        )));
    }
    let extractor = state.registry.get(platform).ok_or_else(|| {
        ApiError::InvalidInput(format!("plataforma sem suporte: {}", platform))
    })?;

    if let Some(cached) = state.info_cache.get(&url.to_string()).await {
        return Ok(cached);
    }

    let info = extractor.fetch_info(url).await?;
    state.info_cache.insert(url.to_string(), info.clone()).await;
    Ok(info)
}

pub async fn start_download(
    state: &AppState,
    request: DownloadRequest,
) -> Result<DownloadStarted, ApiError> {
    let job = state.orchestrator.submit(request).await.map_err(|e| match e {
        SubmitError::Storage(inner) => ApiError::Storage(inner),
        other => ApiError::InvalidInput(other.to_string()),
    })?;
    Ok(DownloadStarted {
        job_id: job.id,
        status: "started",
        platform: job.platform,
    })
}

pub async fn job_status(state: &AppState, id: &str) -> Result<Job, ApiError> {
    state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("registro não encontrado: {}", id)))
}

pub async fn list_jobs(state: &AppState, query: &JobQuery) -> Result<Vec<Job>, ApiError> {
    Ok(state.jobs.list(query).await?)
}

/// Resolves a completed job to its on-disk artifact. The path comes from
/// the same layout the writer used, never from the client.
pub async fn fetch_artifact(state: &AppState, id: &str) -> Result<ArtifactHandle, ApiError> {
    let job = job_status(state, id).await?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::NotDone(format!(
            "download ainda não concluído (status: {})",
            job.status
        )));
    }
    let filename = job.filename.clone().ok_or_else(|| {
        ApiError::NotFound(format!("registro {} não tem arquivo associado", id))
    })?;

    let uploader = job.uploader.as_deref().unwrap_or("unknown");
    let path = state.artifacts.path_for(job.platform, uploader, &filename);

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::NotFound(format!("arquivo não encontrado: {}", filename)))?;

    Ok(ArtifactHandle {
        path,
        filename,
        size_bytes: meta.len(),
    })
}

/// Removes the record and, when present, its artifact. A missing file is
/// logged and ignored so stale records can always be cleaned up.
pub async fn delete_download(state: &AppState, id: &str) -> Result<DeleteOutcome, ApiError> {
    let job = job_status(state, id).await?;

    let mut file_removed = false;
    if let Some(filename) = &job.filename {
        let uploader = job.uploader.as_deref().unwrap_or("unknown");
        let path = state.artifacts.path_for(job.platform, uploader, filename);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => file_removed = true,
            Err(e) => {
                tracing::warn!("[api] artifact of job {} not removed: {}", id, e);
            }
        }
    }

    let deleted = state.jobs.delete(id).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("registro não encontrado: {}", id)));
    }
    Ok(DeleteOutcome {
        deleted,
        file_removed,
    })
}

pub fn supported_platforms() -> Vec<PlatformCapability> {
    vec![
        PlatformCapability {
            id: Platform::YouTube,
            name: Platform::YouTube.display_name(),
            formats: &["mp4", "webm", "mkv", "mp3"],
        },
        PlatformCapability {
            id: Platform::Instagram,
            name: Platform::Instagram.display_name(),
            formats: &["mp4", "jpg"],
        },
        PlatformCapability {
            id: Platform::Reddit,
            name: Platform::Reddit.display_name(),
            formats: &["mp4", "gif", "jpg", "png"],
        },
        PlatformCapability {
            id: Platform::GenericVideo,
            name: Platform::GenericVideo.display_name(),
            formats: &["mp4", "webm", "mkv", "mp3"],
        },
        PlatformCapability {
            id: Platform::GallerySite,
            name: Platform::GallerySite.display_name(),
            formats: &["jpg", "png", "gif", "webp"],
        },
    ]
}

pub async fn stats(state: &AppState) -> Result<DownloadStats, ApiError> {
    let all = state
        .jobs
        .list(&JobQuery {
            limit: Some(FULL_HISTORY_LIMIT),
            ..Default::default()
        })
        .await?;

    let total = all.len();
    let completed = all.iter().filter(|j| j.status == JobStatus::Completed).count();
    let failed = all.iter().filter(|j| j.status == JobStatus::Failed).count();
    let in_progress = total - completed - failed;
    let success_rate = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };

    Ok(DownloadStats {
        total,
        completed,
        failed,
        in_progress,
        success_rate,
    })
}

/// Which credential sets are configured, without the values themselves.
pub fn auth_status(state: &AppState) -> serde_json::Value {
    config::credential_summary(&state.settings.credentials)
}
