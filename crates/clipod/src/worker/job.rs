use crate::jobs::Artifact;

/// A video submitted for clipping.
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub id: String,
    pub url: String,
}

impl VideoJob {
    /// Creates a job with a fresh UUID v4 id.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), url)
    }

    pub fn with_id(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: String,
    pub success: bool,
    pub artifacts: Vec<Artifact>,
    pub error: Option<String>,
}

impl JobResult {
    pub fn success(job: &VideoJob, artifacts: Vec<Artifact>) -> Self {
        Self {
            job_id: job.id.clone(),
            success: true,
            artifacts,
            error: None,
        }
    }

    pub fn failure(job: &VideoJob, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            success: false,
            artifacts: Vec::new(),
            error: Some(error),
        }
    }
}
