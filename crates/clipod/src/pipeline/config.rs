use std::path::PathBuf;

use crate::config::Config;

pub struct PipelineConfig {
    /// Rendered clips go to `<clips_directory>/<job_id>/`.
    pub clips_directory: PathBuf,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            clips_directory: config.clips_directory(),
        }
    }

    pub fn job_clips_directory(&self, job_id: &str) -> PathBuf {
        self.clips_directory.join(job_id)
    }
}
