//! The external collaborators a pipeline run calls.
//!
//! Implementations wrap a download tool, a speech-to-text model, a language
//! model and a media encoder. Each call may take minutes and may fail; the
//! pipeline never holds the job store lock while awaiting one.

use std::path::PathBuf;

use async_trait::async_trait;

use super::highlight::Highlight;

/// Error type returned by stage implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Transcription output.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Plain text, fed to the analyze step.
    pub text: String,
    /// SubRip subtitles with timings against the source video.
    pub srt: String,
}

/// Everything the encoder needs to cut one clip.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub job_id: String,
    pub clip_id: String,
    pub video_path: PathBuf,
    pub output_path: PathBuf,
    pub highlight: Highlight,
    /// Subtitles for the clip only, shifted to start at zero.
    pub subtitles: String,
}

/// Files produced for one clip.
#[derive(Debug, Clone)]
pub struct RenderedClip {
    pub file_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
}

#[async_trait]
pub trait MediaStages: Send + Sync {
    /// Fetches the video and returns the local file.
    async fn download(&self, url: &str, job_id: &str) -> Result<PathBuf, BoxError>;

    async fn transcribe(&self, video_path: &std::path::Path, job_id: &str)
        -> Result<Transcript, BoxError>;

    /// Returns the model's raw reply: a JSON array of highlights, possibly
    /// wrapped in a markdown code fence.
    async fn analyze(&self, transcript: &Transcript, job_id: &str) -> Result<String, BoxError>;

    async fn render(&self, request: RenderRequest) -> Result<RenderedClip, BoxError>;
}
