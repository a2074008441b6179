use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Position in the pending → downloading → terminal order. Terminal
    /// states share a rank; a job picks exactly one of them and stays there.
    fn rank(&self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Downloading => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "downloading" => Ok(JobStatus::Downloading),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("status desconhecido: {}", other)),
        }
    }
}

/// One requested media fetch and its tracked lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub source_url: String,
    pub platform: Platform,
    pub status: JobStatus,
    pub progress: f64,
    pub requested_quality: String,
    pub audio_only: bool,
    pub output_format: String,
    pub filename: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub title: Option<String>,
    pub uploader: Option<String>,
}

impl Job {
    pub fn new(request: &DownloadRequest, platform: Platform) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_url: request.url.clone(),
            platform,
            status: JobStatus::Pending,
            progress: 0.0,
            requested_quality: request.quality.clone(),
            audio_only: request.audio_only,
            output_format: request.output_format.clone(),
            filename: None,
            file_size_bytes: None,
            error_detail: None,
            created_at: Utc::now(),
            completed_at: None,
            title: None,
            uploader: None,
        }
    }

    /// Applies a field-set update, enforcing the lifecycle invariants:
    /// terminal jobs are frozen, status only moves forward, progress never
    /// regresses below its running maximum. Returns false when the whole
    /// update was rejected because the job is already terminal.
    pub fn apply(&mut self, update: JobUpdate) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        if let Some(status) = update.status {
            if status.rank() > self.status.rank() {
                self.status = status;
                match status {
                    JobStatus::Completed => {
                        self.progress = 100.0;
                        self.completed_at = Some(Utc::now());
                    }
                    JobStatus::Failed => {
                        // progress frozen at its last value
                    }
                    _ => {}
                }
            }
        }

        if let Some(p) = update.progress {
            if !self.status.is_terminal() {
                let p = p.clamp(0.0, 100.0);
                if p > self.progress {
                    self.progress = p;
                }
            }
        }

        if let Some(title) = update.title {
            self.title = Some(title);
        }
        if let Some(uploader) = update.uploader {
            self.uploader = Some(uploader);
        }
        if let Some(filename) = update.filename {
            self.filename = Some(filename);
        }
        if let Some(size) = update.file_size_bytes {
            self.file_size_bytes = Some(size);
        }
        if let Some(detail) = update.error_detail {
            if self.error_detail.is_none() {
                self.error_detail = Some(detail);
            }
        }

        true
    }
}

/// Partial update applied through `JobStore::update`. Only the fields that
/// are `Some` are touched, mirroring a conditional `$set` rather than a
/// whole-record replace.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<f64>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub filename: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub error_detail: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error_detail: Some(detail.into()),
            ..Default::default()
        }
    }

    pub fn completed(filename: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            filename: Some(filename.into()),
            file_size_bytes: Some(size_bytes),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default)]
    pub audio_only: bool,
    #[serde(default = "default_format")]
    pub output_format: String,
    /// "auto" lets the detector decide; an explicit platform id overrides it.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_quality() -> String {
    "best".into()
}

fn default_format() -> String {
    "mp4".into()
}

fn default_platform() -> String {
    "auto".into()
}

#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub limit: Option<usize>,
    pub status: Option<JobStatus>,
    pub platform: Option<Platform>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.into(),
            quality: "best".into(),
            audio_only: false,
            output_format: "mp4".into(),
            platform: "auto".into(),
        }
    }

    #[test]
    fn new_job_starts_pending_with_zero_progress() {
        let job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.filename.is_none());
        assert!(job.error_detail.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn progress_never_regresses() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::progress(40.0));
        job.apply(JobUpdate::progress(25.0));
        assert_eq!(job.progress, 40.0);
        job.apply(JobUpdate::progress(90.0));
        assert_eq!(job.progress, 90.0);
    }

    #[test]
    fn progress_is_clamped_to_range() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::progress(250.0));
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn completion_pins_progress_and_stamps_fields() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::progress(55.0));
        assert!(job.apply(JobUpdate::completed("video.mp4", 1024)));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.filename.as_deref(), Some("video.mp4"));
        assert_eq!(job.file_size_bytes, Some(1024));
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn failed_job_keeps_last_progress_and_detail() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::progress(31.0));
        job.apply(JobUpdate::failed("boom"));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 31.0);
        assert_eq!(job.error_detail.as_deref(), Some("boom"));
    }

    #[test]
    fn terminal_jobs_are_frozen() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::failed("first"));

        assert!(!job.apply(JobUpdate::status(JobStatus::Downloading)));
        assert!(!job.apply(JobUpdate::completed("late.mp4", 7)));
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.filename.is_none());
        assert_eq!(job.error_detail.as_deref(), Some("first"));
    }

    #[test]
    fn status_cannot_move_backwards() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        job.apply(JobUpdate::status(JobStatus::Pending));
        assert_eq!(job.status, JobStatus::Downloading);
    }

    #[test]
    fn error_detail_is_write_once() {
        let mut job = Job::new(&request("https://youtu.be/abc"), Platform::YouTube);
        job.apply(JobUpdate::status(JobStatus::Downloading));
        let mut update = JobUpdate::progress(10.0);
        update.error_detail = Some("early".into());
        job.apply(update);
        job.apply(JobUpdate::failed("late"));
        assert_eq!(job.error_detail.as_deref(), Some("early"));
    }
}
