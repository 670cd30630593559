//! Flat-file backup and restore of the job store.

pub mod snapshot;

pub use snapshot::{RestoreReport, SnapshotReport, SnapshotStore};
