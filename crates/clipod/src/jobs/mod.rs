//! Job records, the in-memory store and the transition API over it.

pub mod model;
pub mod progress;
pub mod store;
pub mod tracker;

pub use model::{Artifact, Job, JobStatus, JobUpdate};
pub use progress::{JobProgressBroadcaster, JobProgressEvent, ProgressKind};
pub use store::{JobCounts, JobStore};
pub use tracker::{StatusTracker, Transition};
