/// A problem that did not fail the job.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineWarning {
    ClipSkipped { title: String, error: String },
    ArtifactRejected { clip_id: String, error: String },
}
