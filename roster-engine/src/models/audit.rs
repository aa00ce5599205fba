//! Per-record audit entries
//!
//! Reasons come from a fixed taxonomy; the only variable text in a message is
//! interpolated parameters (record ids, tier names, override entries).

use serde::{Deserialize, Serialize};

/// Final outcome for one input record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    Kept,
    Removed,
}

/// Why a record was kept or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Matched a tier rule-set and fit within capacity
    Admitted,
    /// Named on the contact inclusion list
    ForcedInclusion,
    /// Promoted by the rescue pass
    Rescued,
    /// Same (name, organization) as an earlier record
    Duplicate,
    /// Both name and organization empty
    EmptyKey,
    /// Dropped by an override list
    OverrideExcluded,
    /// Title matched no tier rule-set
    NoPatternMatch,
    /// Title matched a tier but the membership role did not qualify
    RoleMismatch,
    /// Matched a tier but the organization's bucket was full
    CapacityExceeded,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Admitted => "admitted",
            Reason::ForcedInclusion => "forced-inclusion",
            Reason::Rescued => "rescued",
            Reason::Duplicate => "duplicate",
            Reason::EmptyKey => "empty-key",
            Reason::OverrideExcluded => "override-excluded",
            Reason::NoPatternMatch => "no-pattern-match",
            Reason::RoleMismatch => "role-mismatch",
            Reason::CapacityExceeded => "capacity-exceeded",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Reason::Admitted | Reason::ForcedInclusion | Reason::Rescued => Disposition::Kept,
            _ => Disposition::Removed,
        }
    }
}

/// Explanation of one standardized record's fate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub record_id: String,
    pub source_file: String,
    pub name_key: String,
    pub organization_key: String,
    pub job_title: String,
    /// First rule-set the record fully matches, ignoring capacity
    pub tier_match: Option<String>,
    /// Tier whose title pattern matched while membership did not qualify.
    /// Informational only, never an output tier.
    pub membership_gap: Option<String>,
    pub priority_score: u32,
    pub disposition: Disposition,
    pub final_tier: Option<String>,
    pub reason: Reason,
    pub message: String,
}
