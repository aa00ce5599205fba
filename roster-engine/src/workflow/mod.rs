//! Batch consolidation workflow
//!
//! A run is synchronous and single-threaded: each stage consumes the full
//! output of the previous one before the next starts. Cancellation, when a
//! host supplies a flag, is honored between stages only.

pub mod pipeline;

pub use pipeline::{Pipeline, PipelineInput, RunResult, SkippedSource, TierOutput};
