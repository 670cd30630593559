//! Status transition API used by the pipeline.
//!
//! `StatusTracker` is the only writer of job state on behalf of a running
//! pipeline. It narrows the store to the valid transitions and decides two
//! policies:
//!
//! - an unknown job id is a logged no-op, so a pipeline whose job vanished
//!   (for example after a restore) keeps running to completion;
//! - any call on a terminal job is a logged no-op, so replaying a terminal
//!   transition is harmless.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::jobs::model::{Artifact, Job, JobStatus, JobUpdate};
use crate::jobs::progress::{JobProgressBroadcaster, JobProgressEvent, ProgressKind};
use crate::jobs::store::{check_artifact, JobStore};

/// Outcome of a tolerant transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The job is already `completed` or `failed`; nothing changed.
    IgnoredTerminal,
    /// The job does not exist; nothing changed.
    Missing,
}

#[derive(Clone)]
pub struct StatusTracker {
    store: Arc<JobStore>,
    broadcaster: Option<JobProgressBroadcaster>,
}

impl StatusTracker {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self {
            store,
            broadcaster: None,
        }
    }

    pub fn with_broadcaster(store: Arc<JobStore>, broadcaster: JobProgressBroadcaster) -> Self {
        Self {
            store,
            broadcaster: Some(broadcaster),
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Receiver for transition events, when a broadcaster is attached.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<JobProgressEvent>> {
        self.broadcaster.as_ref().map(JobProgressBroadcaster::subscribe)
    }

    fn publish(&self, job: &Job, kind: ProgressKind) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.send(JobProgressEvent::from_job(job, kind));
        }
    }

    /// Runs a mutation on a non-terminal job and maps the tolerant cases.
    fn transition(
        &self,
        job_id: &str,
        action: &str,
        kind: ProgressKind,
        f: impl FnOnce(&mut Job),
    ) -> Result<Transition, StoreError> {
        let outcome = self.store.update_active(job_id, |job| {
            f(job);
            Ok(job.clone())
        });
        match outcome {
            Ok(Some(job)) => {
                self.publish(&job, kind);
                Ok(Transition::Applied)
            }
            Ok(None) => {
                log::warn!("Ignoring {} for job {}: already terminal", action, job_id);
                Ok(Transition::IgnoredTerminal)
            }
            Err(StoreError::NotFound(_)) => {
                log::warn!("Attempted {} on non-existent job {}", action, job_id);
                Ok(Transition::Missing)
            }
            Err(e) => Err(e),
        }
    }

    /// Creates a job. Duplicate ids are rejected.
    pub fn create(&self, job_id: &str) -> Result<Job, StoreError> {
        let job = self.store.create(job_id)?;
        self.publish(&job, ProgressKind::Created);
        Ok(job)
    }

    /// Reports stage, progress or message. The first report moves an
    /// `initializing` job to `processing`.
    pub fn apply(&self, job_id: &str, update: &JobUpdate) -> Result<Transition, StoreError> {
        let outcome = self.transition(job_id, "update", ProgressKind::Updated, |job| {
            job.apply(update);
            if job.status == JobStatus::Initializing {
                job.status = JobStatus::Processing;
            }
        })?;
        if outcome == Transition::Applied {
            log::debug!("Updated job {}: {:?}", job_id, update);
        }
        Ok(outcome)
    }

    pub fn append_artifact(
        &self,
        job_id: &str,
        artifact: Artifact,
    ) -> Result<Transition, StoreError> {
        check_artifact(job_id, &artifact)?;
        let title = artifact.title.clone();
        let outcome = self.transition(
            job_id,
            "artifact append",
            ProgressKind::ArtifactAdded,
            |job| {
                job.push_artifact(artifact);
            },
        )?;
        if outcome == Transition::Applied {
            log::info!("Added artifact to job {}: {}", job_id, title);
        }
        Ok(outcome)
    }

    pub fn mark_completed(&self, job_id: &str) -> Result<Transition, StoreError> {
        let outcome = self.transition(job_id, "completion", ProgressKind::Completed, Job::complete)?;
        if outcome == Transition::Applied {
            log::info!("Job {} completed", job_id);
        }
        Ok(outcome)
    }

    pub fn mark_failed(&self, job_id: &str, error: &str) -> Result<Transition, StoreError> {
        let outcome = self.transition(job_id, "failure", ProgressKind::Failed, |job| {
            job.fail(error)
        })?;
        if outcome == Transition::Applied {
            log::error!("Job {} failed: {}", job_id, error);
        }
        Ok(outcome)
    }
}
