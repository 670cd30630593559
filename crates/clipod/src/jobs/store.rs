//! In-memory job store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::jobs::model::{Artifact, Job, JobStatus, JobUpdate};

/// Authoritative in-memory state of every known job.
///
/// One `RwLock` guards the whole map. Critical sections are plain field
/// assignment plus a clock read; the lock is never held across an `.await`
/// or an external call.
///
/// The mutators here are raw: they do not refuse changes to a `completed`
/// or `failed` job. Running pipelines write through
/// [`StatusTracker`](crate::jobs::StatusTracker), which does.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

/// Number of jobs per status.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JobCounts {
    pub initializing: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Runs `f` on the job under the write lock.
    fn with_job<T>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut Job) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut jobs = self.write_guard();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))?;
        f(job)
    }

    /// Installs a fresh job. An existing id is rejected, never overwritten.
    pub fn create(&self, job_id: &str) -> Result<Job, StoreError> {
        let job = {
            let mut jobs = self.write_guard();
            if jobs.contains_key(job_id) {
                return Err(StoreError::DuplicateJob(job_id.to_string()));
            }
            let job = Job::new(job_id);
            jobs.insert(job_id.to_string(), job.clone());
            job
        };
        log::info!("Created job {}", job_id);
        Ok(job)
    }

    pub fn exists(&self, job_id: &str) -> bool {
        self.read_guard().contains_key(job_id)
    }

    /// Returns a copy of the job.
    pub fn read(&self, job_id: &str) -> Result<Job, StoreError> {
        self.read_guard()
            .get(job_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
    }

    /// Overwrites the supplied fields and returns the updated job.
    pub fn apply(&self, job_id: &str, update: &JobUpdate) -> Result<Job, StoreError> {
        let job = self.with_job(job_id, |job| {
            job.apply(update);
            Ok(job.clone())
        })?;
        log::debug!("Updated job {}: {:?}", job_id, update);
        Ok(job)
    }

    pub fn set_status(&self, job_id: &str, status: JobStatus) -> Result<Job, StoreError> {
        self.with_job(job_id, |job| {
            job.status = status;
            job.touch();
            Ok(job.clone())
        })
    }

    /// Appends an artifact and returns the job's new artifact count.
    ///
    /// The artifact's duration is recomputed from its time range.
    pub fn append_artifact(&self, job_id: &str, artifact: Artifact) -> Result<usize, StoreError> {
        check_artifact(job_id, &artifact)?;
        let title = artifact.title.clone();
        let count = self.with_job(job_id, |job| Ok(job.push_artifact(artifact)))?;
        log::info!("Added artifact to job {}: {}", job_id, title);
        Ok(count)
    }

    /// Sets status `completed`, stage `finished` and progress 100.
    pub fn mark_completed(&self, job_id: &str) -> Result<Job, StoreError> {
        let job = self.with_job(job_id, |job| {
            job.complete();
            Ok(job.clone())
        })?;
        log::info!("Job {} completed", job_id);
        Ok(job)
    }

    /// Sets status `failed` and records the error. Stage and progress stay.
    pub fn mark_failed(&self, job_id: &str, error: &str) -> Result<Job, StoreError> {
        let job = self.with_job(job_id, |job| {
            job.fail(error);
            Ok(job.clone())
        })?;
        log::error!("Job {} failed: {}", job_id, error);
        Ok(job)
    }

    /// Runs `f` only if the job is not terminal, in the same critical section
    /// as the check. Returns `Ok(None)` for a terminal job.
    pub(crate) fn update_active<T>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut Job) -> Result<T, StoreError>,
    ) -> Result<Option<T>, StoreError> {
        self.with_job(job_id, |job| {
            if job.is_terminal() {
                Ok(None)
            } else {
                f(job).map(Some)
            }
        })
    }

    /// Installs a job read back from disk, replacing any job with the same id.
    pub fn insert_restored(&self, job: Job) {
        self.write_guard().insert(job.job_id.clone(), job);
    }

    /// Returns copies of all jobs, newest first.
    pub fn all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.read_guard().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> JobCounts {
        let jobs = self.read_guard();
        let mut counts = JobCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Initializing => counts.initializing += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Drops terminal jobs last updated before `cutoff`. Returns their ids.
    pub fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        let mut jobs = self.write_guard();
        let expired: Vec<String> = jobs
            .values()
            .filter(|job| job.is_terminal() && job.updated_at < cutoff)
            .map(|job| job.job_id.clone())
            .collect();
        for job_id in &expired {
            jobs.remove(job_id);
        }
        drop(jobs);

        if !expired.is_empty() {
            log::info!("Purged {} expired jobs", expired.len());
        }
        expired
    }
}

pub(crate) fn check_artifact(job_id: &str, artifact: &Artifact) -> Result<(), StoreError> {
    match artifact.range_problem() {
        Some(reason) => Err(StoreError::InvalidArtifact {
            job_id: job_id.to_string(),
            artifact_id: artifact.id.clone(),
            reason,
        }),
        None => Ok(()),
    }
}
