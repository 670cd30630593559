pub mod dispatcher;
pub mod job;

pub use dispatcher::JobDispatcher;
pub use job::{JobResult, VideoJob};
