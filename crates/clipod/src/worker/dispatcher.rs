//! Runs one pipeline task per accepted job.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use futures_util::future::join_all;
use futures_util::FutureExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{PersistError, StoreError};
use crate::jobs::{JobProgressBroadcaster, JobProgressEvent, JobStore, StatusTracker};
use crate::persistence::snapshot::is_safe_job_id;
use crate::persistence::{RestoreReport, SnapshotReport, SnapshotStore};
use crate::pipeline::{MediaStages, Pipeline, PipelineConfig, PipelineContext};
use crate::sanitize;
use crate::worker::job::{JobResult, VideoJob};

/// Error recorded on jobs restored while still in progress.
pub const INTERRUPTED_BY_RESTART: &str = "Interrupted by restart";

pub struct JobDispatcher {
    tracker: StatusTracker,
    pipeline: Arc<Pipeline>,
    snapshots: SnapshotStore,
    handles: Mutex<Vec<JoinHandle<JobResult>>>,
}

impl JobDispatcher {
    pub fn new(tracker: StatusTracker, pipeline: Arc<Pipeline>, snapshots: SnapshotStore) -> Self {
        Self {
            tracker,
            pipeline,
            snapshots,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Production constructor: a fresh store, the configured directories and
    /// the given stage implementations.
    pub fn from_config(config: &Config, stages: Arc<dyn MediaStages>) -> Self {
        let tracker = StatusTracker::with_broadcaster(
            Arc::new(JobStore::new()),
            JobProgressBroadcaster::default(),
        );
        let pipeline = Pipeline::new(Arc::new(PipelineConfig::from_config(config)), stages);
        let snapshots = SnapshotStore::new(config.status_directory());
        Self::new(tracker, Arc::new(pipeline), snapshots)
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub fn store(&self) -> &Arc<JobStore> {
        self.tracker.store()
    }

    /// Live transition events for every job, for streaming to clients.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<JobProgressEvent>> {
        self.tracker.subscribe()
    }

    fn lock_handles(&self) -> MutexGuard<'_, Vec<JoinHandle<JobResult>>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Dispatcher handle list was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Loads job records from the status directory into the store.
    ///
    /// No task drives a job restored mid-run, so each one is marked failed
    /// and its record rewritten.
    pub async fn restore(&self) -> Result<RestoreReport, PersistError> {
        let snapshots = self.snapshots.clone();
        let store = Arc::clone(self.tracker.store());
        let report = tokio::task::spawn_blocking(move || snapshots.restore(&store))
            .await
            .map_err(|e| PersistError::TaskFailed(e.to_string()))??;

        for job_id in &report.unfinished {
            warn!("Job {} was interrupted by a restart", job_id);
            if let Err(e) = self.tracker.mark_failed(job_id, INTERRUPTED_BY_RESTART) {
                warn!("Failed to mark job failed: {}", e);
            }
            write_record(&self.snapshots, &self.tracker, job_id).await;
        }
        Ok(report)
    }

    /// Creates a job for `url` and starts its pipeline. Returns the job id.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn submit(&self, url: &str) -> Result<String, StoreError> {
        self.submit_job(VideoJob::new(url))
    }

    /// Like [`submit`](Self::submit) with a caller-chosen id. A duplicate id,
    /// or one that is not a safe file name, is rejected and nothing is spawned.
    pub fn submit_job(&self, job: VideoJob) -> Result<String, StoreError> {
        if !is_safe_job_id(&job.id) {
            return Err(StoreError::InvalidJobId(job.id));
        }
        self.tracker.create(&job.id)?;
        let job_id = job.id.clone();

        let tracker = self.tracker.clone();
        let pipeline = Arc::clone(&self.pipeline);
        let snapshots = self.snapshots.clone();
        let span = info_span!("job", job.id = %job_id);

        let handle = tokio::spawn(
            async move {
                let result = run_to_terminal(&pipeline, &tracker, job).await;
                write_record(&snapshots, &tracker, &result.job_id).await;
                result
            }
            .instrument(span),
        );

        let mut handles = self.lock_handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);

        info!("Accepted job {}", job_id);
        Ok(job_id)
    }

    /// Number of pipeline tasks still running.
    pub fn running(&self) -> usize {
        self.lock_handles()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Waits for every running job to finish, then writes a full snapshot.
    ///
    /// Runs are not interrupted; a long stage delays shutdown until it
    /// returns.
    pub async fn shutdown(&self) -> Result<SnapshotReport, PersistError> {
        let handles = std::mem::take(&mut *self.lock_handles());
        info!("Waiting for {} job tasks before shutdown", handles.len());

        for outcome in join_all(handles).await {
            match outcome {
                Ok(result) => debug!(
                    job_id = %result.job_id,
                    success = result.success,
                    "Job task finished"
                ),
                Err(e) => error!("Job task failed to join: {}", e),
            }
        }

        let snapshots = self.snapshots.clone();
        let store = Arc::clone(self.tracker.store());
        let report = tokio::task::spawn_blocking(move || snapshots.snapshot(&store))
            .await
            .map_err(|e| PersistError::TaskFailed(e.to_string()))??;

        info!(
            written = report.written,
            failed = report.failed.len(),
            "Shutdown snapshot written"
        );
        Ok(report)
    }

    /// Drops terminal jobs last updated more than `retention` ago, from the
    /// store and from disk. Returns the purged ids.
    pub async fn purge_expired(&self, retention: chrono::Duration) -> Vec<String> {
        let cutoff = Utc::now() - retention;
        let purged = self.tracker.store().purge_terminal_before(cutoff);
        if purged.is_empty() {
            return purged;
        }

        let snapshots = self.snapshots.clone();
        let ids = purged.clone();
        let removal = tokio::task::spawn_blocking(move || {
            for job_id in &ids {
                if let Err(e) = snapshots.remove_job(job_id) {
                    log::error!("Failed to remove record for job {}: {}", job_id, e);
                }
            }
        })
        .await;
        if let Err(e) = removal {
            error!("Record removal task failed: {}", e);
        }

        info!(count = purged.len(), "Purged expired jobs");
        purged
    }
}

/// Runs the pipeline and guarantees the job ends terminal, even if a stage
/// implementation panics.
async fn run_to_terminal(pipeline: &Pipeline, tracker: &StatusTracker, job: VideoJob) -> JobResult {
    debug!("Starting pipeline for {}", sanitize::redact_url(&job.url));
    let fallback = job.clone();

    match AssertUnwindSafe(pipeline.run(PipelineContext::new(job), tracker))
        .catch_unwind()
        .await
    {
        Ok((result, _ctx)) => result,
        Err(_) => {
            let message = "Pipeline task panicked".to_string();
            error!("{}", message);
            if let Err(e) = tracker.mark_failed(&fallback.id, &message) {
                warn!("Failed to mark job failed: {}", e);
            }
            JobResult::failure(&fallback, message)
        }
    }
}

/// Writes the job's record once it is terminal. Disk IO runs on the blocking
/// pool; a failed write is logged and the job stays in memory.
async fn write_record(snapshots: &SnapshotStore, tracker: &StatusTracker, job_id: &str) {
    let job = match tracker.store().read(job_id) {
        Ok(job) => job,
        Err(e) => {
            warn!("Not saving record: {}", e);
            return;
        }
    };

    let snapshots = snapshots.clone();
    match tokio::task::spawn_blocking(move || snapshots.write_job(&job)).await {
        Ok(Ok(path)) => debug!("Saved job record {}", sanitize::redact_path(&path)),
        Ok(Err(e)) => error!("Failed to save job record: {}", e),
        Err(e) => error!("Record write task failed: {}", e),
    }
}
