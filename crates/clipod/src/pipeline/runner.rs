use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::error::StageError;
use crate::jobs::{Artifact, JobUpdate, StatusTracker, Transition};
use crate::sanitize;
use crate::worker::job::JobResult;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineWarning;
use super::highlight::parse_highlights;
use super::naming;
use super::stages::{MediaStages, RenderRequest};
use super::subtitles;

const PROGRESS_DOWNLOADING: f64 = 5.0;
const PROGRESS_TRANSCRIBING: f64 = 25.0;
const PROGRESS_ANALYZING: f64 = 50.0;
const PROGRESS_GENERATING: f64 = 75.0;
/// Share of the bar spent rendering, split evenly across clips.
const PROGRESS_RENDER_SPAN: f64 = 20.0;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    stages: Arc<dyn MediaStages>,
}

impl Pipeline {
    pub fn new(config: Arc<PipelineConfig>, stages: Arc<dyn MediaStages>) -> Self {
        Self { config, stages }
    }

    /// Run the full pipeline for a single video.
    ///
    /// Every run ends in exactly one terminal transition: `mark_completed`
    /// when the stages succeed, `mark_failed` with the stage error otherwise.
    pub async fn run(
        &self,
        mut ctx: PipelineContext,
        tracker: &StatusTracker,
    ) -> (JobResult, PipelineContext) {
        let span = info_span!("pipeline",
            job_id = %ctx.job.id,
            url = %sanitize::redact_url(&ctx.job.url),
        );

        async move {
            let outcome = self.run_stages(&mut ctx, tracker).await;
            match outcome {
                Ok(()) => {
                    if let Err(e) = tracker.mark_completed(&ctx.job.id) {
                        warn!("Failed to mark job completed: {}", e);
                    }
                    info!(
                        clips = ctx.artifacts.len(),
                        skipped = ctx.warnings.len(),
                        "Pipeline finished"
                    );
                    let result = JobResult::success(&ctx.job, ctx.artifacts.clone());
                    (result, ctx)
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    warn!(error = %err_msg, "Pipeline failed");
                    if let Err(e) = tracker.mark_failed(&ctx.job.id, &err_msg) {
                        warn!("Failed to mark job failed: {}", e);
                    }
                    (JobResult::failure(&ctx.job, err_msg), ctx)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        ctx: &mut PipelineContext,
        tracker: &StatusTracker,
    ) -> Result<(), StageError> {
        self.step_download(ctx, tracker)
            .instrument(info_span!("download"))
            .await?;
        self.step_transcribe(ctx, tracker)
            .instrument(info_span!("transcribe"))
            .await?;
        self.step_analyze(ctx, tracker)
            .instrument(info_span!("analyze"))
            .await?;
        self.step_generate_clips(ctx, tracker)
            .instrument(info_span!("generate_clips"))
            .await
    }

    async fn step_download(
        &self,
        ctx: &mut PipelineContext,
        tracker: &StatusTracker,
    ) -> Result<(), StageError> {
        report(
            tracker,
            &ctx.job.id,
            JobUpdate::step("downloading", PROGRESS_DOWNLOADING).message("Downloading video"),
        );

        let video_path = self
            .stages
            .download(&ctx.job.url, &ctx.job.id)
            .await
            .map_err(|e| StageError::new("download video", e.to_string()))?;

        debug!("Downloaded {}", sanitize::redact_path(&video_path));
        ctx.video_path = Some(video_path);
        Ok(())
    }

    async fn step_transcribe(
        &self,
        ctx: &mut PipelineContext,
        tracker: &StatusTracker,
    ) -> Result<(), StageError> {
        report(
            tracker,
            &ctx.job.id,
            JobUpdate::step("transcribing", PROGRESS_TRANSCRIBING)
                .message("Transcribing video audio"),
        );

        let video_path = ctx
            .video_path
            .clone()
            .ok_or_else(|| StageError::new("transcribe video", "no downloaded video"))?;
        let transcript = self
            .stages
            .transcribe(&video_path, &ctx.job.id)
            .await
            .map_err(|e| StageError::new("transcribe video", e.to_string()))?;

        ctx.transcript = Some(transcript);
        Ok(())
    }

    async fn step_analyze(
        &self,
        ctx: &mut PipelineContext,
        tracker: &StatusTracker,
    ) -> Result<(), StageError> {
        report(
            tracker,
            &ctx.job.id,
            JobUpdate::step("analyzing", PROGRESS_ANALYZING)
                .message("Analyzing transcript for highlights"),
        );

        let transcript = ctx
            .transcript
            .clone()
            .ok_or_else(|| StageError::new("identify highlights", "no transcript"))?;
        let reply = self
            .stages
            .analyze(&transcript, &ctx.job.id)
            .await
            .map_err(|e| StageError::new("identify highlights", e.to_string()))?;

        ctx.highlights = parse_highlights(&reply)
            .map_err(|e| StageError::new("identify highlights", e.to_string()))?;
        info!(count = ctx.highlights.len(), "Identified highlights");
        Ok(())
    }

    /// Renders one clip per highlight. A clip that fails to render is logged
    /// and skipped; only a failure to prepare the output directory fails the
    /// job.
    async fn step_generate_clips(
        &self,
        ctx: &mut PipelineContext,
        tracker: &StatusTracker,
    ) -> Result<(), StageError> {
        let job_id = ctx.job.id.clone();
        let highlights = ctx.highlights.clone();
        let total = highlights.len();

        report(
            tracker,
            &job_id,
            JobUpdate::step("generating_clips", PROGRESS_GENERATING)
                .message(&format!("Generating {} clips", total)),
        );

        let clips_dir = self.config.job_clips_directory(&job_id);
        tokio::fs::create_dir_all(&clips_dir)
            .await
            .map_err(|e| StageError::new("generate clips", e.to_string()))?;

        let video_path = ctx
            .video_path
            .clone()
            .ok_or_else(|| StageError::new("generate clips", "no downloaded video"))?;
        let srt = ctx
            .transcript
            .as_ref()
            .map(|t| t.srt.clone())
            .unwrap_or_default();

        for (index, highlight) in highlights.into_iter().enumerate() {
            let clip_id = naming::short_clip_id();
            let request = RenderRequest {
                job_id: job_id.clone(),
                clip_id: clip_id.clone(),
                video_path: video_path.clone(),
                output_path: clips_dir.join(naming::clip_file_name(&clip_id, &highlight.title)),
                subtitles: subtitles::extract_segment(
                    &srt,
                    highlight.start_seconds,
                    highlight.end_seconds,
                ),
                highlight: highlight.clone(),
            };

            let rendered = self
                .stages
                .render(request)
                .instrument(info_span!("render_clip", clip_id = %clip_id))
                .await;

            match rendered {
                Ok(rendered) => {
                    let mut artifact = Artifact::new(
                        &clip_id,
                        &highlight.title,
                        highlight.start_seconds,
                        highlight.end_seconds,
                        rendered.file_path.display().to_string(),
                        &highlight.description,
                    );
                    if let Some(thumbnail) = rendered.thumbnail_path {
                        artifact = artifact.with_thumbnail(thumbnail.display().to_string());
                    }

                    match tracker.append_artifact(&job_id, artifact.clone()) {
                        Ok(Transition::Applied) => {
                            debug!("Generated clip {}", sanitize::redact_path(&rendered.file_path));
                            ctx.artifacts.push(artifact);
                        }
                        Ok(outcome) => {
                            warn!("Clip {} not recorded: {:?}", clip_id, outcome);
                            ctx.warnings.push(PipelineWarning::ArtifactRejected {
                                clip_id,
                                error: format!("job did not accept the clip ({:?})", outcome),
                            });
                        }
                        Err(e) => {
                            warn!("Rejected clip {}: {}", clip_id, e);
                            ctx.warnings.push(PipelineWarning::ArtifactRejected {
                                clip_id,
                                error: e.to_string(),
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!("Error generating clip {}: {}", index + 1, e);
                    ctx.warnings.push(PipelineWarning::ClipSkipped {
                        title: highlight.title,
                        error: e.to_string(),
                    });
                }
            }

            let progress =
                PROGRESS_GENERATING + PROGRESS_RENDER_SPAN * (index + 1) as f64 / total as f64;
            report(tracker, &job_id, JobUpdate::new().progress(progress));
        }

        Ok(())
    }
}

/// Progress reports are best effort: a report the tracker refuses is logged,
/// never fatal.
fn report(tracker: &StatusTracker, job_id: &str, update: JobUpdate) {
    if let Err(e) = tracker.apply(job_id, &update) {
        warn!("Failed to report progress for job {}: {}", job_id, e);
    }
}
