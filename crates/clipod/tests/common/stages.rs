//! Scriptable stand-in for the external media stages.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use clipod::pipeline::{BoxError, MediaStages, RenderRequest, RenderedClip, Transcript};

pub const SAMPLE_SRT: &str = "1
00:00:08,000 --> 00:00:12,000
So here is the thing.

2
00:00:20,000 --> 00:00:27,500
Nobody expected this.

3
00:01:05,000 --> 00:01:09,000
And that is the end.
";

pub const SAMPLE_REPLY: &str = r#"```json
[
  {"start_time": "00:00:10", "end_time": "00:00:25", "title": "Clip 1", "description": "The setup"},
  {"start_time": "01:00", "end_time": "01:10", "title": "Clip 2: finale", "description": "The ending"}
]
```"#;

pub struct FakeStages {
    pub reply: String,
    pub srt: String,
    /// `download`, `transcribe` or `analyze`: that stage returns an error.
    pub failing_stage: Option<&'static str>,
    /// Titles whose render fails.
    pub failing_renders: Vec<String>,
    /// When set, `download` waits for a notification before returning.
    pub download_gate: Option<Arc<Notify>>,
    /// Notified as soon as `download` is entered.
    pub download_started: Arc<Notify>,
    pub panic_in_analyze: bool,
    pub render_requests: Mutex<Vec<RenderRequest>>,
}

impl Default for FakeStages {
    fn default() -> Self {
        Self {
            reply: SAMPLE_REPLY.to_string(),
            srt: SAMPLE_SRT.to_string(),
            failing_stage: None,
            failing_renders: Vec::new(),
            download_gate: None,
            download_started: Arc::new(Notify::new()),
            panic_in_analyze: false,
            render_requests: Mutex::new(Vec::new()),
        }
    }
}

impl FakeStages {
    pub fn failing(stage: &'static str) -> Self {
        Self {
            failing_stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            download_gate: Some(gate),
            ..Default::default()
        }
    }

    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            ..Default::default()
        }
    }

    fn check(&self, stage: &str) -> Result<(), BoxError> {
        if self.failing_stage == Some(stage) {
            return Err(format!("{} backend unavailable", stage).into());
        }
        Ok(())
    }
}

#[async_trait]
impl MediaStages for FakeStages {
    async fn download(&self, _url: &str, job_id: &str) -> Result<PathBuf, BoxError> {
        self.download_started.notify_one();
        if let Some(gate) = &self.download_gate {
            gate.notified().await;
        }
        self.check("download")?;
        Ok(PathBuf::from(format!("/downloads/{}/source.mp4", job_id)))
    }

    async fn transcribe(&self, _video: &Path, _job_id: &str) -> Result<Transcript, BoxError> {
        self.check("transcribe")?;
        Ok(Transcript {
            text: "So here is the thing. Nobody expected this. And that is the end.".to_string(),
            srt: self.srt.clone(),
        })
    }

    async fn analyze(&self, _transcript: &Transcript, _job_id: &str) -> Result<String, BoxError> {
        if self.panic_in_analyze {
            panic!("model client crashed");
        }
        self.check("analyze")?;
        Ok(self.reply.clone())
    }

    async fn render(&self, request: RenderRequest) -> Result<RenderedClip, BoxError> {
        self.render_requests.lock().unwrap().push(request.clone());
        if self.failing_renders.contains(&request.highlight.title) {
            return Err("ffmpeg exited with status 1".into());
        }
        tokio::fs::write(&request.output_path, b"fake mp4").await?;
        Ok(RenderedClip {
            file_path: request.output_path,
            thumbnail_path: None,
        })
    }
}
