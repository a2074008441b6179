use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::job::JobUpdate;
use crate::storage::jobs::JobStore;

const CHANNEL_CAPACITY: usize = 32;
const MIN_EMIT_INTERVAL_MS: u64 = 150;

/// Minimum-interval gate so a chatty extractor cannot turn every received
/// chunk into a store write.
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_emit: None,
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    pub fn should_emit(&mut self) -> bool {
        let now = Instant::now();
        let due = match self.last_emit {
            None => true,
            Some(last) => now.duration_since(last) >= self.min_interval,
        };
        if due {
            self.last_emit = Some(now);
        }
        due
    }
}

/// Bridges an extractor's progress callback to job-record updates.
///
/// The extractor sends fractions into a bounded channel and never touches
/// the store; a single forwarder task owned by the job drains the channel
/// and awaits each update, which keeps per-job update order intact. Values
/// are clamped to the running maximum here so out-of-order callbacks can
/// never surface a regression to observers.
pub fn spawn_progress_bridge(
    store: Arc<dyn JobStore>,
    job_id: String,
) -> (mpsc::Sender<f64>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<f64>(CHANNEL_CAPACITY);

    let forwarder = tokio::spawn(async move {
        let mut throttle = ProgressThrottle::new(MIN_EMIT_INTERVAL_MS);
        let mut max_seen: f64 = 0.0;

        while let Some(percent) = rx.recv().await {
            let percent = percent.clamp(0.0, 100.0);
            if percent <= max_seen {
                continue;
            }
            max_seen = percent;

            if !throttle.should_emit() && percent < 100.0 {
                continue;
            }

            if let Err(e) = store
                .update(&job_id, JobUpdate::progress(percent))
                .await
            {
                tracing::warn!("[progress] update for job {} failed: {}", job_id, e);
            }
        }
    });

    (tx, forwarder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::Platform;
    use crate::models::job::{DownloadRequest, Job, JobStatus};
    use crate::storage::jobs::MemoryJobStore;

    async fn downloading_job(store: &MemoryJobStore) -> String {
        let job = Job::new(
            &DownloadRequest {
                url: "https://youtu.be/a".into(),
                quality: "best".into(),
                audio_only: false,
                output_format: "mp4".into(),
                platform: "auto".into(),
            },
            Platform::YouTube,
        );
        let id = job.id.clone();
        store.insert(job).await.unwrap();
        store
            .update(&id, JobUpdate::status(JobStatus::Downloading))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn forwards_progress_into_the_store() {
        let store = Arc::new(MemoryJobStore::new());
        let id = downloading_job(&store).await;

        let (tx, handle) = spawn_progress_bridge(store.clone(), id.clone());
        tx.send(42.0).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.progress, 42.0);
    }

    #[tokio::test]
    async fn out_of_order_values_never_regress() {
        let store = Arc::new(MemoryJobStore::new());
        let id = downloading_job(&store).await;

        let (tx, handle) = spawn_progress_bridge(store.clone(), id.clone());
        for p in [10.0, 60.0, 30.0, 55.0, 100.0] {
            tx.send(p).await.unwrap();
        }
        drop(tx);
        handle.await.unwrap();

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.progress, 100.0);
    }

    #[tokio::test]
    async fn hundred_percent_bypasses_the_throttle() {
        let store = Arc::new(MemoryJobStore::new());
        let id = downloading_job(&store).await;

        let (tx, handle) = spawn_progress_bridge(store.clone(), id.clone());
        // rapid-fire sends land inside one throttle window
        tx.send(50.0).await.unwrap();
        tx.send(99.0).await.unwrap();
        tx.send(100.0).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let job = store.get(&id).await.unwrap().unwrap();
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn throttle_gates_by_interval() {
        let mut throttle = ProgressThrottle::new(10_000);
        assert!(throttle.should_emit());
        assert!(!throttle.should_emit());
    }

    #[test]
    fn first_emission_passes_regardless_of_clock_age() {
        // a fresh throttle has no prior emission to measure against
        let mut throttle = ProgressThrottle::new(u64::MAX / 2);
        assert!(throttle.should_emit());
    }
}
