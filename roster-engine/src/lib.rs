//! roster-engine library interface
//!
//! Contact consolidation and tiered classification: standardize heterogeneous
//! contact exports, deduplicate, apply override lists, classify into
//! capacity-limited tiers, rescue unrepresented organizations, backfill
//! emails and explain every decision in an audit trail.

pub mod config;
pub mod error;
pub mod loaders;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::config::{EngineConfig, OverrideConfig, RosterConfig};
pub use crate::error::{EngineError, EngineResult};
pub use crate::workflow::{Pipeline, PipelineInput, RunResult, SkippedSource, TierOutput};
