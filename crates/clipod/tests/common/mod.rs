//! Shared test utilities for clipod integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a dispatcher and service to temp directories
//! - `FakeStages`, a scriptable `MediaStages` implementation

pub mod harness;
pub mod stages;

pub use harness::TestHarness;
pub use stages::{FakeStages, SAMPLE_REPLY, SAMPLE_SRT};
