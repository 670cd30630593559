//! Test harness for isolated execution of the job engine.
//!
//! Each harness owns a temp directory with `status/` and `clips/`
//! subdirectories and a dispatcher wired to a `FakeStages`.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use clipod::config::Config;
use clipod::jobs::Job;
use clipod::{ClipService, JobDispatcher, SnapshotStore};

use super::stages::FakeStages;

pub struct TestHarness {
    temp_dir: TempDir,
    pub status_dir: PathBuf,
    pub clips_dir: PathBuf,
    pub stages: Arc<FakeStages>,
    pub dispatcher: Arc<JobDispatcher>,
    pub service: ClipService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_stages(FakeStages::default())
    }

    pub fn with_stages(stages: FakeStages) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config {
            data_directory: temp_dir.path().display().to_string(),
            ..Default::default()
        };

        let stages = Arc::new(stages);
        let dispatcher = Arc::new(JobDispatcher::from_config(&config, stages.clone()));
        let service = ClipService::new(Arc::clone(&dispatcher));

        Self {
            status_dir: config.status_directory(),
            clips_dir: config.clips_directory(),
            temp_dir,
            stages,
            dispatcher,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn snapshots(&self) -> SnapshotStore {
        SnapshotStore::new(&self.status_dir)
    }

    /// Polls until the job is terminal. Panics after five seconds.
    pub async fn wait_terminal(&self, job_id: &str) -> Job {
        let poll = async {
            loop {
                let job = self.service.status(job_id).expect("job should exist");
                if job.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), poll)
            .await
            .expect("job did not reach a terminal state in time")
    }
}
