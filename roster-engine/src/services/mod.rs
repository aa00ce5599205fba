//! Pipeline stages
//!
//! Each stage consumes the full output of its predecessor and returns an
//! outcome value; no stage mutates engine state across runs.

pub mod audit_trail;
pub mod capacity_allocator;
pub mod deduplicator;
pub mod email_inferencer;
pub mod override_resolver;
pub mod rescue_engine;
pub mod similarity;
pub mod standardizer;
pub mod tier_classifier;

pub use audit_trail::{AuditTrail, StageOutcomes};
pub use capacity_allocator::{Admission, AllocationOutcome, CapacityAllocator, CapacityRejection};
pub use deduplicator::{DedupOutcome, Deduplicator, DuplicateLink};
pub use email_inferencer::{EmailFillOutcome, EmailPattern, EmailSchemaInferencer, LocalPartRule};
pub use override_resolver::{
    ForcedMatch, OverrideAction, OverrideOutcome, OverrideRemoval, OverrideResolver,
};
pub use rescue_engine::{RescueEngine, RescueOutcome};
pub use similarity::{JaroWinkler, NormalizedLevenshtein, SimilarityKind, SimilarityStrategy};
pub use standardizer::{ColumnMap, Standardizer};
pub use tier_classifier::{Classification, TierClassifier};
