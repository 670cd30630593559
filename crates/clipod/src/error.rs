use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipodError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Stage failed: {0}")]
    Stage(#[from] StageError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job already exists: {0}")]
    DuplicateJob(String),

    #[error("Job id '{0}' cannot be used as a file name")]
    InvalidJobId(String),

    #[error("Invalid artifact '{artifact_id}' for job {job_id}: {reason}")]
    InvalidArtifact {
        job_id: String,
        artifact_id: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write record '{path}': {source}")]
    WriteRecord {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize job {job_id}: {source}")]
    Serialize {
        job_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job id '{0}' cannot be used as a record file name")]
    InvalidJobId(String),

    #[error("Malformed record '{path}': {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    #[error("Snapshot task failed: {0}")]
    TaskFailed(String),
}

/// Failure of an external stage collaborator.
///
/// The core never interprets the cause; the pipeline turns it into the
/// job's error message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to {stage}: {message}")]
pub struct StageError {
    pub stage: String,
    pub message: String,
}

impl StageError {
    pub fn new(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Clip not found: {0}")]
    ClipNotFound(String),

    #[error("Invalid video URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to dispatch job: {0}")]
    Dispatch(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("A global subscriber is already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("A log bridge is already installed: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, ClipodError>;
