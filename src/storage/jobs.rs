use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::job::{Job, JobQuery, JobUpdate};

const DEFAULT_LIST_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("registro não encontrado: {0}")]
    NotFound(String),
    #[error("falha de E/S no armazenamento: {0}")]
    Io(#[from] std::io::Error),
    #[error("registro corrompido: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Durable record of download jobs keyed by job id. Updates go through
/// `JobUpdate` field sets rather than whole-record replaces, and each
/// implementation serializes writers per job under its own lock.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<(), StorageError>;
    async fn update(&self, id: &str, update: JobUpdate) -> Result<(), StorageError>;
    async fn get(&self, id: &str) -> Result<Option<Job>, StorageError>;
    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StorageError>;
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;
}

fn apply_query(jobs: &HashMap<String, Job>, query: &JobQuery) -> Vec<Job> {
    let mut matched: Vec<Job> = jobs
        .values()
        .filter(|j| query.status.map_or(true, |s| j.status == s))
        .filter(|j| query.platform.map_or(true, |p| j.platform == p))
        .cloned()
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matched.truncate(query.limit.unwrap_or(DEFAULT_LIST_LIMIT));
    matched
}

/// In-memory store; the default for tests and for embedders that bring
/// their own persistence behind this trait.
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: Job) -> Result<(), StorageError> {
        self.jobs.lock().await.insert(job.id.clone(), job);
        Ok(())
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<(), StorageError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        if !job.apply(update) {
            tracing::warn!("[jobs] update ignored, job {} is terminal", id);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StorageError> {
        Ok(self.jobs.lock().await.get(id).cloned())
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StorageError> {
        Ok(apply_query(&*self.jobs.lock().await, query))
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.jobs.lock().await.remove(id).is_some())
    }
}

/// JSON-file-backed store: the in-memory map flushed to disk on every
/// mutation, so job history survives restarts without pulling a database
/// into the crate.
pub struct JsonJobStore {
    jobs: Mutex<HashMap<String, Job>>,
    path: PathBuf,
}

impl JsonJobStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let jobs = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<Vec<Job>>(&raw)?
                .into_iter()
                .map(|j| (j.id.clone(), j))
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            jobs: Mutex::new(jobs),
            path,
        })
    }

    async fn flush(&self, jobs: &HashMap<String, Job>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let records: Vec<&Job> = jobs.values().collect();
        let json = serde_json::to_string_pretty(&records)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for JsonJobStore {
    async fn insert(&self, job: Job) -> Result<(), StorageError> {
        let mut jobs = self.jobs.lock().await;
        jobs.insert(job.id.clone(), job);
        self.flush(&jobs).await
    }

    async fn update(&self, id: &str, update: JobUpdate) -> Result<(), StorageError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        if !job.apply(update) {
            tracing::warn!("[jobs] update ignored, job {} is terminal", id);
            return Ok(());
        }
        self.flush(&jobs).await
    }

    async fn get(&self, id: &str) -> Result<Option<Job>, StorageError> {
        Ok(self.jobs.lock().await.get(id).cloned())
    }

    async fn list(&self, query: &JobQuery) -> Result<Vec<Job>, StorageError> {
        Ok(apply_query(&*self.jobs.lock().await, query))
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut jobs = self.jobs.lock().await;
        let removed = jobs.remove(id).is_some();
        if removed {
            self.flush(&jobs).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Platform;
    use crate::models::job::{DownloadRequest, JobStatus};

    fn job_for(url: &str, platform: Platform) -> Job {
        Job::new(
            &DownloadRequest {
                url: url.into(),
                quality: "best".into(),
                audio_only: false,
                output_format: "mp4".into(),
                platform: "auto".into(),
            },
            platform,
        )
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryJobStore::new();
        let job = job_for("https://youtu.be/a", Platform::YouTube);
        let id = job.id.clone();
        store.insert(job).await.unwrap();
        let fetched = store.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = MemoryJobStore::new();
        let err = store
            .update("nope", JobUpdate::progress(10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_sorts_by_creation_descending() {
        let store = MemoryJobStore::new();
        let mut older = job_for("https://youtu.be/a", Platform::YouTube);
        older.created_at = chrono::Utc::now() - chrono::Duration::seconds(60);
        let newer = job_for("https://youtu.be/b", Platform::YouTube);
        let newer_id = newer.id.clone();
        store.insert(older).await.unwrap();
        store.insert(newer).await.unwrap();

        let listed = store.list(&JobQuery::default()).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer_id);
    }

    #[tokio::test]
    async fn list_filters_by_platform_and_status() {
        let store = MemoryJobStore::new();
        let yt = job_for("https://youtu.be/a", Platform::YouTube);
        let ig = job_for("https://instagram.com/p/x", Platform::Instagram);
        let ig_id = ig.id.clone();
        store.insert(yt).await.unwrap();
        store.insert(ig).await.unwrap();
        store
            .update(&ig_id, JobUpdate::status(JobStatus::Downloading))
            .await
            .unwrap();

        let query = JobQuery {
            platform: Some(Platform::Instagram),
            ..Default::default()
        };
        let listed = store.list(&query).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].platform, Platform::Instagram);

        let query = JobQuery {
            status: Some(JobStatus::Downloading),
            ..Default::default()
        };
        let listed = store.list(&query).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, ig_id);
    }

    #[tokio::test]
    async fn list_honors_limit() {
        let store = MemoryJobStore::new();
        for i in 0..5 {
            store
                .insert(job_for(&format!("https://youtu.be/{}", i), Platform::YouTube))
                .await
                .unwrap();
        }
        let query = JobQuery {
            limit: Some(3),
            ..Default::default()
        };
        assert_eq!(store.list(&query).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let store = MemoryJobStore::new();
        let job = job_for("https://youtu.be/a", Platform::YouTube);
        let id = job.id.clone();
        store.insert(job).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_store_persists_across_reopen() {
        let path = std::env::temp_dir().join(format!("anyfetch-jobs-{}.json", uuid::Uuid::new_v4()));
        let job = job_for("https://youtu.be/a", Platform::YouTube);
        let id = job.id.clone();
        {
            let store = JsonJobStore::open(&path).await.unwrap();
            store.insert(job).await.unwrap();
        }
        let reopened = JsonJobStore::open(&path).await.unwrap();
        assert!(reopened.get(&id).await.unwrap().is_some());
        let _ = tokio::fs::remove_file(&path).await;
    }
}
