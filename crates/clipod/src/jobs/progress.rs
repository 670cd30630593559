//! Job progress broadcaster for real-time status streaming.
//!
//! Polling the store stays the primary read path; this channel lets an
//! outer layer push the same snapshots to connected clients.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::jobs::model::{Job, JobStatus};

/// What kind of change produced an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    Created,
    Updated,
    ArtifactAdded,
    Completed,
    Failed,
}

/// Snapshot of a job's progress after one transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgressEvent {
    pub job_id: String,
    pub kind: ProgressKind,
    pub status: JobStatus,
    pub stage: String,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub artifact_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    pub fn from_job(job: &Job, kind: ProgressKind) -> Self {
        Self {
            job_id: job.job_id.clone(),
            kind,
            status: job.status,
            stage: job.stage.clone(),
            progress: job.progress,
            message: job.message.clone(),
            error: job.error.clone(),
            artifact_count: job.artifacts.len(),
            timestamp: job.updated_at,
        }
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    /// Creates a new job progress broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcaster_send_receive() {
        let broadcaster = JobProgressBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let job = Job::new("test-job");
        broadcaster.send(JobProgressEvent::from_job(&job, ProgressKind::Created));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.job_id, "test-job");
        assert_eq!(received.kind, ProgressKind::Created);
        assert_eq!(received.status, JobStatus::Initializing);
        assert_eq!(received.stage, "starting");
    }

    #[test]
    fn test_send_without_subscribers() {
        let broadcaster = JobProgressBroadcaster::default();
        broadcaster.send(JobProgressEvent::from_job(
            &Job::new("job-1"),
            ProgressKind::Updated,
        ));
    }

    #[test]
    fn test_event_counts_artifacts() {
        let mut job = Job::new("job-1");
        job.artifacts.push(crate::jobs::model::Artifact::new(
            "c1", "Clip", 0.0, 5.0, "/c1.mp4", "",
        ));
        let event = JobProgressEvent::from_job(&job, ProgressKind::ArtifactAdded);
        assert_eq!(event.artifact_count, 1);
    }
}
