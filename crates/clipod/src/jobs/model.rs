//! Job and artifact records shared by the store, the tracker and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage name of a freshly created job.
pub const STAGE_STARTING: &str = "starting";
/// Stage name set by `mark_completed`.
pub const STAGE_FINISHED: &str = "finished";

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Initializing,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are the only terminal statuses.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Initializing => "initializing",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A produced output of a job, usually one rendered clip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    pub id: String,
    pub title: String,
    /// Start of the source range, in seconds.
    pub start_time: f64,
    /// End of the source range, in seconds.
    pub end_time: f64,
    /// Always `end_time - start_time`; recomputed when the artifact is stored.
    #[serde(default)]
    pub duration: f64,
    pub file_path: String,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl Artifact {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: f64,
        end_time: f64,
        file_path: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time,
            end_time,
            duration: end_time - start_time,
            file_path: file_path.into(),
            thumbnail_path: None,
            description: description.into(),
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_path: impl Into<String>) -> Self {
        self.thumbnail_path = Some(thumbnail_path.into());
        self
    }

    /// Checks the time range, returning a reason when it is unusable.
    pub(crate) fn range_problem(&self) -> Option<String> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Some("time range must be finite".to_string());
        }
        if self.end_time < self.start_time {
            return Some(format!(
                "end {} is before start {}",
                self.end_time, self.start_time
            ));
        }
        None
    }
}

/// Full state of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(alias = "current_step")]
    pub stage: String,
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, alias = "clips")]
    pub artifacts: Vec<Artifact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh job in the `initializing` state.
    pub fn new(job_id: &str) -> Self {
        let now = Utc::now();
        Self {
            job_id: job_id.to_string(),
            status: JobStatus::Initializing,
            stage: STAGE_STARTING.to_string(),
            progress: 0.0,
            message: Some("Job initialized".to_string()),
            error: None,
            artifacts: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Overwrites the fields present in `update` and stamps `updated_at`.
    pub(crate) fn apply(&mut self, update: &JobUpdate) {
        if let Some(stage) = &update.stage {
            self.stage = stage.clone();
        }
        if let Some(progress) = update.progress {
            self.progress = clamp_progress(progress, &self.job_id);
        }
        if let Some(message) = &update.message {
            self.message = Some(message.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        self.touch();
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Appends an artifact with its duration derived from the time range.
    pub(crate) fn push_artifact(&mut self, mut artifact: Artifact) -> usize {
        artifact.duration = artifact.end_time - artifact.start_time;
        self.artifacts.push(artifact);
        self.touch();
        self.artifacts.len()
    }

    pub(crate) fn complete(&mut self) {
        self.apply(
            &JobUpdate::step(STAGE_FINISHED, 100.0).message("Processing completed successfully"),
        );
        self.status = JobStatus::Completed;
    }

    pub(crate) fn fail(&mut self, error: &str) {
        self.apply(
            &JobUpdate::new()
                .message(&format!("Processing failed: {}", error))
                .error(error),
        );
        self.status = JobStatus::Failed;
    }
}

fn clamp_progress(progress: f64, job_id: &str) -> f64 {
    if progress.is_nan() {
        log::warn!("Ignoring NaN progress for job {}, using 0", job_id);
        return 0.0;
    }
    if !(0.0..=100.0).contains(&progress) {
        log::warn!(
            "Progress {} for job {} is outside 0-100, clamping",
            progress,
            job_id
        );
    }
    progress.clamp(0.0, 100.0)
}

/// Field updates accepted by `apply`.
///
/// Only stage, progress, message and error are writable. Unknown keys in a
/// JSON update are ignored so newer callers keep working.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    #[serde(default, alias = "current_step", skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage and progress together, the usual per-step report.
    pub fn step(stage: &str, progress: f64) -> Self {
        Self {
            stage: Some(stage.to_string()),
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }

    pub fn progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stage.is_none()
            && self.progress.is_none()
            && self.message.is_none()
            && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("job-1");
        assert_eq!(job.status, JobStatus::Initializing);
        assert_eq!(job.stage, "starting");
        assert_eq!(job.progress, 0.0);
        assert!(job.artifacts.is_empty());
        assert!(job.error.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Initializing.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Initializing).unwrap();
        assert_eq!(json, "\"initializing\"");
        let status: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, JobStatus::Failed);
    }

    #[test]
    fn test_artifact_new_derives_duration() {
        let artifact = Artifact::new("a1", "Clip 1", 10.0, 25.0, "/clips/a1.mp4", "desc");
        assert_eq!(artifact.duration, 15.0);
        assert!(artifact.range_problem().is_none());
    }

    #[test]
    fn test_artifact_range_problems() {
        let reversed = Artifact::new("a1", "t", 20.0, 10.0, "/x.mp4", "");
        assert!(reversed.range_problem().is_some());

        let infinite = Artifact::new("a2", "t", 0.0, f64::INFINITY, "/x.mp4", "");
        assert!(infinite.range_problem().is_some());
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let mut job = Job::new("job-1");
        job.apply(&JobUpdate::new().message("hello"));
        assert_eq!(job.stage, "starting");
        assert_eq!(job.progress, 0.0);
        assert_eq!(job.message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_apply_clamps_progress() {
        let mut job = Job::new("job-1");
        job.apply(&JobUpdate::new().progress(140.0));
        assert_eq!(job.progress, 100.0);
        job.apply(&JobUpdate::new().progress(-3.0));
        assert_eq!(job.progress, 0.0);
    }

    #[test]
    fn test_update_ignores_unknown_fields() {
        let update: JobUpdate = serde_json::from_str(
            r#"{"stage":"downloading","progress":5.0,"status":"completed","eta":12}"#,
        )
        .unwrap();
        assert_eq!(update.stage.as_deref(), Some("downloading"));
        assert_eq!(update.progress, Some(5.0));
        assert!(update.message.is_none());
    }

    #[test]
    fn test_update_accepts_legacy_step_key() {
        let update: JobUpdate = serde_json::from_str(r#"{"current_step":"analyzing"}"#).unwrap();
        assert_eq!(update.stage.as_deref(), Some("analyzing"));
    }

    #[test]
    fn test_job_json_shape() {
        let mut job = Job::new("abc");
        job.artifacts
            .push(Artifact::new("c1", "Clip", 1.0, 4.0, "/c1.mp4", "d"));
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["job_id"], "abc");
        assert_eq!(value["status"], "initializing");
        assert_eq!(value["stage"], "starting");
        assert_eq!(value["artifacts"][0]["duration"], 3.0);
        assert!(value["artifacts"][0]["thumbnail_path"].is_null());
    }
}
