//! Read and submit contracts consumed by an HTTP layer.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::error::ServiceError;
use crate::jobs::{Artifact, Job, JobStatus};
use crate::worker::JobDispatcher;

/// Where a clip lives.
#[derive(Debug, Clone, Serialize)]
pub struct ClipLocation {
    pub job_id: String,
    pub clip: Artifact,
}

#[derive(Clone)]
pub struct ClipService {
    dispatcher: Arc<JobDispatcher>,
}

impl ClipService {
    pub fn new(dispatcher: Arc<JobDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<JobDispatcher> {
        &self.dispatcher
    }

    /// Validates the URL and starts a job for it. Returns the job id.
    pub fn submit(&self, url: &str) -> Result<String, ServiceError> {
        let url = validate_url(url)?;
        Ok(self.dispatcher.submit(url)?)
    }

    /// Snapshot of one job. Never blocks on a running stage.
    pub fn status(&self, job_id: &str) -> Result<Job, ServiceError> {
        self.dispatcher
            .store()
            .read(job_id)
            .map_err(|_| ServiceError::NotFound(job_id.to_string()))
    }

    /// Clips of one job. Empty until the job is terminal, so a client never
    /// sees a partial list.
    pub fn job_clips(&self, job_id: &str) -> Result<Vec<Artifact>, ServiceError> {
        let job = self.status(job_id)?;
        if job.is_terminal() {
            Ok(job.artifacts)
        } else {
            Ok(Vec::new())
        }
    }

    /// Clips of every completed job, newest job first.
    pub fn all_clips(&self) -> Vec<Artifact> {
        self.dispatcher
            .store()
            .all()
            .into_iter()
            .filter(|job| job.status == JobStatus::Completed)
            .flat_map(|job| job.artifacts)
            .collect()
    }

    pub fn find_clip(&self, clip_id: &str) -> Result<ClipLocation, ServiceError> {
        self.dispatcher
            .store()
            .all()
            .into_iter()
            .filter(|job| job.status == JobStatus::Completed)
            .find_map(|job| {
                let job_id = job.job_id;
                job.artifacts
                    .into_iter()
                    .find(|clip| clip.id == clip_id)
                    .map(|clip| ClipLocation { job_id, clip })
            })
            .ok_or_else(|| ServiceError::ClipNotFound(clip_id.to_string()))
    }

    /// Path of a clip's video file, checked to exist on disk.
    pub fn clip_file(&self, clip_id: &str) -> Result<PathBuf, ServiceError> {
        let location = self.find_clip(clip_id)?;
        let path = PathBuf::from(&location.clip.file_path);
        if path.is_file() {
            Ok(path)
        } else {
            log::warn!(
                "Clip {} of job {} is missing its file",
                clip_id,
                location.job_id
            );
            Err(ServiceError::ClipNotFound(clip_id.to_string()))
        }
    }
}

/// Accepts absolute `http` and `https` URLs with a host.
pub fn validate_url(url: &str) -> Result<&str, ServiceError> {
    let trimmed = url.trim();
    let invalid = |reason: &str| ServiceError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.chars().any(char::is_whitespace) {
        return Err(invalid("URL contains whitespace"));
    }

    let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs are supported"));
    }

    // The parser repairs `https:host` and `https:///host`; require a real authority
    let authority = &trimmed[parsed.scheme().len()..];
    if !authority.starts_with("://") || authority[3..].starts_with('/') {
        return Err(invalid("URL has no host"));
    }
    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(trimmed),
        _ => Err(invalid("URL has no host")),
    }
}
