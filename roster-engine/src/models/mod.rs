//! Data model shared by the pipeline stages

pub mod audit;
pub mod contact;
pub mod overrides;
pub mod raw_table;
pub mod rules;
pub mod summary;

pub use audit::{AuditEntry, Disposition, Reason};
pub use contact::{AdmissionKind, Contact, EmailStatus, OrganizationKey, TieredContact};
pub use overrides::{ContactRef, ContactRemoval, OverrideLists};
pub use raw_table::RawTable;
pub use rules::{PatternSet, PriorityKeyword, RescueConfig, TierRuleSet};
pub use summary::{EmailSummary, RunSummary, StageReport, TierSummary};
