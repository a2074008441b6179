use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::core::paths::ArtifactStore;
use crate::core::platform::Platform;
use crate::core::progress;
use crate::core::registry::ExtractorRegistry;
use crate::models::job::{DownloadRequest, Job, JobStatus, JobUpdate};
use crate::models::media::DownloadOptions;
use crate::platforms::traits::{ExtractError, Extractor};
use crate::storage::jobs::{JobStore, StorageError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("não foi possível identificar a plataforma da URL: {0}")]
    UnknownPlatform(String),
    #[error("plataforma sem suporte: {0}")]
    Unsupported(Platform),
    #[error("identificador de plataforma inválido: {0}")]
    InvalidPlatformId(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Drives the download lifecycle: validates a request, records the job,
/// and runs the fetch in a background task gated by a concurrency permit.
/// Submission returns as soon as the record exists; callers observe the
/// rest through the job store.
pub struct DownloadOrchestrator {
    registry: Arc<ExtractorRegistry>,
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    permits: Arc<Semaphore>,
}

impl DownloadOrchestrator {
    pub fn new(
        registry: Arc<ExtractorRegistry>,
        jobs: Arc<dyn JobStore>,
        artifacts: ArtifactStore,
        max_concurrent: usize,
    ) -> Self {
        Self {
            registry,
            jobs,
            artifacts,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    fn resolve_platform(request: &DownloadRequest) -> Result<Platform, SubmitError> {
        if request.platform == "auto" {
            return Ok(Platform::detect(&request.url));
        }
        Platform::from_str(&request.platform)
            .map_err(|_| SubmitError::InvalidPlatformId(request.platform.clone()))
    }

    /// Validates the request, persists a pending job, and spawns the
    /// background fetch. All rejection happens before the job exists, so
    /// every stored record corresponds to a real extraction attempt.
    pub async fn submit(&self, request: DownloadRequest) -> Result<Job, SubmitError> {
        let platform = Self::resolve_platform(&request)?;
        if platform == Platform::Unknown {
            return Err(SubmitError::UnknownPlatform(request.url.clone()));
        }
        let extractor = self
            .registry
            .get(platform)
            .ok_or(SubmitError::Unsupported(platform))?;

        let job = Job::new(&request, platform);
        self.jobs.insert(job.clone()).await?;
        tracing::info!(
            "[orchestrator] job {} accepted for {} ({})",
            job.id,
            job.source_url,
            platform
        );

        let jobs = Arc::clone(&self.jobs);
        let artifacts = self.artifacts.clone();
        let permits = Arc::clone(&self.permits);
        let job_for_task = job.clone();
        tokio::spawn(async move {
            // a closed semaphore never happens here; permits live as long
            // as the orchestrator
            let _permit = match permits.acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };
            run_job(extractor, jobs, artifacts, job_for_task).await;
        });

        Ok(job)
    }
}

async fn run_job(
    extractor: Arc<dyn Extractor>,
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    job: Job,
) {
    let job_id = job.id.clone();

    if let Err(e) = jobs
        .update(&job_id, JobUpdate::status(JobStatus::Downloading))
        .await
    {
        tracing::warn!("[orchestrator] job {} vanished before start: {}", job_id, e);
        return;
    }

    match execute(extractor, Arc::clone(&jobs), artifacts, &job).await {
        Ok((filename, size)) => {
            tracing::info!("[orchestrator] job {} completed: {}", job_id, filename);
            if let Err(e) = jobs
                .update(&job_id, JobUpdate::completed(filename, size))
                .await
            {
                tracing::warn!("[orchestrator] completion of job {} not stored: {}", job_id, e);
            }
        }
        Err(detail) => {
            tracing::warn!("[orchestrator] job {} failed: {}", job_id, detail);
            if let Err(e) = jobs.update(&job_id, JobUpdate::failed(detail)).await {
                tracing::warn!("[orchestrator] failure of job {} not stored: {}", job_id, e);
            }
        }
    }
}

async fn execute(
    extractor: Arc<dyn Extractor>,
    jobs: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    job: &Job,
) -> Result<(String, u64), String> {
    let info = extractor
        .fetch_info(&job.source_url)
        .await
        .map_err(|e| remediate(e, job.platform))?;

    let uploader = if info.uploader.trim().is_empty() {
        "unknown".to_string()
    } else {
        info.uploader.clone()
    };

    let _ = jobs
        .update(
            &job.id,
            JobUpdate {
                title: Some(info.title.clone()),
                uploader: Some(uploader.clone()),
                ..Default::default()
            },
        )
        .await;

    let dest_dir = artifacts
        .ensure_dir(job.platform, &uploader)
        .await
        .map_err(|e| format!("falha ao criar diretório de destino: {}", e))?;

    let (progress_tx, bridge) = progress::spawn_progress_bridge(Arc::clone(&jobs), job.id.clone());

    let opts = DownloadOptions {
        quality: job.requested_quality.clone(),
        audio_only: job.audio_only,
        output_format: job.output_format.clone(),
    };

    let result = extractor
        .fetch_media(&job.source_url, &opts, &dest_dir, progress_tx)
        .await;

    // sender side is gone once fetch_media returns; wait for the bridge to
    // drain so completion never races a pending progress write
    let _ = bridge.await;

    let descriptor = result.map_err(|e| remediate(e, job.platform))?;

    let meta = tokio::fs::metadata(&descriptor.path).await.map_err(|_| {
        format!(
            "arquivo não encontrado após o download: {}",
            descriptor.path.display()
        )
    })?;

    let raw_name = descriptor
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| "caminho de artefato inválido".to_string())?;

    // the record keeps only a filename; retrieval and deletion rebuild the
    // full path from the layout, so the artifact has to land exactly where
    // path_for will look for it. Extractors may hand back a nested path or
    // a name the sanitizer would rewrite; move the file into place here.
    let canonical = artifacts.path_for(job.platform, &uploader, &raw_name);
    if canonical != descriptor.path {
        tokio::fs::rename(&descriptor.path, &canonical)
            .await
            .map_err(|e| format!("falha ao mover artefato para o destino final: {}", e))?;
    }

    let filename = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| "caminho de artefato inválido".to_string())?;
    let size = if descriptor.size_bytes > 0 {
        descriptor.size_bytes
    } else {
        meta.len()
    };
    Ok((filename, size))
}

/// Rewrites auth and rate-limit failures into messages that tell the
/// operator which credentials to configure, instead of leaking raw
/// extractor output.
fn remediate(err: ExtractError, platform: Platform) -> String {
    match (&err, platform) {
        (ExtractError::AuthRequired(_), Platform::Instagram) => format!(
            "{}. Configure INSTAGRAM_USERNAME e INSTAGRAM_PASSWORD para acessar este conteúdo.",
            err
        ),
        (ExtractError::AuthRequired(_) | ExtractError::RateLimited(_), Platform::Reddit) => {
            format!(
                "{}. Configure REDDIT_CLIENT_ID e REDDIT_CLIENT_SECRET para usar a API oficial.",
                err
            )
        }
        _ => err.to_string(),
    }
}
