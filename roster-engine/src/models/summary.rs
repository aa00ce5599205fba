//! Per-run statistics
//!
//! Each stage outcome reports into a fresh [`RunSummary`] owned by the run;
//! nothing is accumulated on long-lived engine instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Implemented by stage outcomes that contribute counts to the summary
pub trait StageReport {
    fn report(&self, summary: &mut RunSummary);
}

/// Counts for one output tier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSummary {
    pub tier: String,
    pub contacts: usize,
    pub unique_organizations: usize,
    /// Records turned away from this tier by organization capacity
    pub capacity_rejections: usize,
    /// Of `contacts`, how many came from the inclusion list
    pub forced: usize,
}

impl TierSummary {
    pub fn display_string(&self) -> String {
        format!(
            "{}: {} contacts across {} organizations ({} over capacity)",
            self.tier, self.contacts, self.unique_organizations, self.capacity_rejections
        )
    }
}

/// Email status counts over kept contacts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub existing: usize,
    pub estimated: usize,
    pub missing: usize,
    /// Organizations with a usable inferred schema
    pub organizations_with_schema: usize,
}

/// Aggregate statistics for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub sources_loaded: usize,
    pub sources_skipped: usize,
    pub input_records: usize,
    pub deduplicated_records: usize,
    pub duplicates_removed: usize,
    pub empty_key_removed: usize,
    pub override_excluded: usize,
    pub forced_inclusions: usize,
    pub no_pattern_match: usize,
    pub role_mismatch: usize,
    pub tiers: Vec<TierSummary>,
    pub rescued_contacts: usize,
    pub rescued_organizations: usize,
    pub total_kept: usize,
    pub emails: EmailSummary,
}

impl RunSummary {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            sources_loaded: 0,
            sources_skipped: 0,
            input_records: 0,
            deduplicated_records: 0,
            duplicates_removed: 0,
            empty_key_removed: 0,
            override_excluded: 0,
            forced_inclusions: 0,
            no_pattern_match: 0,
            role_mismatch: 0,
            tiers: Vec::new(),
            rescued_contacts: 0,
            rescued_organizations: 0,
            total_kept: 0,
            emails: EmailSummary::default(),
        }
    }

    /// Summary row for a tier, created on first use
    pub fn tier_mut(&mut self, tier: &str) -> &mut TierSummary {
        let index = match self.tiers.iter().position(|t| t.tier == tier) {
            Some(index) => index,
            None => {
                self.tiers.push(TierSummary {
                    tier: tier.to_string(),
                    ..TierSummary::default()
                });
                self.tiers.len() - 1
            }
        };
        &mut self.tiers[index]
    }

    pub fn tier(&self, tier: &str) -> Option<&TierSummary> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} input, {} after dedup, {} excluded, {} kept ({} rescued)",
            self.input_records,
            self.deduplicated_records,
            self.override_excluded,
            self.total_kept,
            self.rescued_contacts
        )
    }
}
