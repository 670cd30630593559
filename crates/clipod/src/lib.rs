pub mod config;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod persistence;
pub mod pipeline;
pub mod sanitize;
pub mod service;
pub mod worker;

pub use config::{load_config, Config, LogFormat};
pub use error::{
    ClipodError, ConfigError, PersistError, Result, ServiceError, StageError, StoreError,
};
pub use jobs::{Artifact, Job, JobStatus, JobStore, JobUpdate, StatusTracker, Transition};
pub use persistence::SnapshotStore;
pub use pipeline::{MediaStages, Pipeline, PipelineConfig, PipelineContext};
pub use service::ClipService;
pub use worker::{JobDispatcher, VideoJob};
