use std::path::PathBuf;

use crate::jobs::Artifact;
use crate::worker::job::VideoJob;

use super::error::PipelineWarning;
use super::highlight::Highlight;
use super::stages::Transcript;

pub struct PipelineContext {
    // Input
    pub job: VideoJob,

    // Download result
    pub video_path: Option<PathBuf>,

    // Transcription result
    pub transcript: Option<Transcript>,

    // Analysis result, in reply order
    pub highlights: Vec<Highlight>,

    // Clips appended to the job
    pub artifacts: Vec<Artifact>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl PipelineContext {
    pub fn new(job: VideoJob) -> Self {
        Self {
            job,
            video_path: None,
            transcript: None,
            highlights: Vec::new(),
            artifacts: Vec::new(),
            warnings: Vec::new(),
        }
    }
}
