pub mod config;
pub mod context;
pub mod error;
pub mod highlight;
pub mod naming;
pub mod runner;
pub mod stages;
pub mod subtitles;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::PipelineWarning;
pub use highlight::{parse_highlights, Highlight};
pub use runner::Pipeline;
pub use stages::{BoxError, MediaStages, RenderRequest, RenderedClip, Transcript};
