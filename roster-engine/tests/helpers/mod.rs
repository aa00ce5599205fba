//! Test Helper Utilities
//!
//! Shared fixtures and invariant checks for roster-engine integration tests

#![allow(dead_code)]

pub mod fixtures;
pub mod invariants;

// Re-export commonly used items
pub use fixtures::{table, table_with_roles, with_people, write_file};
pub use invariants::{
    assert_audit_complete, assert_capacity_respected, assert_mutually_exclusive,
    assert_rescue_coverage, kept_ids,
};
