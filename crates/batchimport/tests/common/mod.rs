//! Shared test utilities for batchimport integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs against a temp directory and SQLite file
//! - Builders for sales files and import configurations
//! - A recording sink that captures chunk boundaries

pub mod builders;
pub mod harness;
pub mod sinks;

pub use builders::*;
pub use harness::TestHarness;
pub use sinks::{chunk_sizes, RecordingSink};
