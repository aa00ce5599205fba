//! Deduplication by normalized (name, organization)
//!
//! First occurrence wins. Input order is source order then row order, so the
//! result is deterministic for a deterministic load order.

use crate::models::{Contact, RunSummary, StageReport};
use std::collections::HashMap;
use tracing::debug;

/// A record collapsed into an earlier one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateLink {
    pub record_id: String,
    pub kept_record_id: String,
}

/// Deduplication result
#[derive(Debug, Clone, Default)]
pub struct DedupOutcome {
    /// One record per distinct key, in first-seen order
    pub kept: Vec<Contact>,
    pub duplicates: Vec<DuplicateLink>,
    /// Records with neither a name nor an organization
    pub empty_key: Vec<String>,
}

impl StageReport for DedupOutcome {
    fn report(&self, summary: &mut RunSummary) {
        summary.deduplicated_records = self.kept.len();
        summary.duplicates_removed = self.duplicates.len();
        summary.empty_key_removed = self.empty_key.len();
    }
}

/// Deduplicator
#[derive(Debug, Default)]
pub struct Deduplicator;

impl Deduplicator {
    pub fn new() -> Self {
        Self
    }

    /// Collapse records sharing a normalized (name, organization) key
    ///
    /// Idempotent: running it again on `kept` returns the same records and no
    /// duplicates.
    pub fn deduplicate(&self, contacts: &[Contact]) -> DedupOutcome {
        let mut seen: HashMap<(String, String), String> = HashMap::with_capacity(contacts.len());
        let mut outcome = DedupOutcome::default();

        for contact in contacts {
            let key = contact.dedup_key();
            if key.0.is_empty() && key.1.is_empty() {
                outcome.empty_key.push(contact.record_id.clone());
                continue;
            }

            match seen.get(&key) {
                Some(kept_record_id) => {
                    debug!(
                        record_id = %contact.record_id,
                        kept = %kept_record_id,
                        "Duplicate contact"
                    );
                    outcome.duplicates.push(DuplicateLink {
                        record_id: contact.record_id.clone(),
                        kept_record_id: kept_record_id.clone(),
                    });
                }
                None => {
                    seen.insert(key, contact.record_id.clone());
                    outcome.kept.push(contact.clone());
                }
            }
        }

        outcome
    }
}
