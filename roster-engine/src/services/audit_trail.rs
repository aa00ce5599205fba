//! Audit trail reconstruction
//!
//! Read-only over the stage outcomes: one [`AuditEntry`] per standardized
//! record, explaining its fate. Tier match and membership gap are evaluated
//! against the rule-sets used for the run, for every record, including ones
//! dropped before classification.
//!
//! **Reason precedence:**
//! 1. Admitted, forced or rescued (kept)
//! 2. Duplicate, empty key, override (dropped before classification)
//! 3. Capacity exceeded in at least one tier
//! 4. Role mismatch (title matched, membership did not)
//! 5. No pattern match

use crate::models::{AdmissionKind, AuditEntry, Contact, Reason};
use crate::services::capacity_allocator::{Admission, AllocationOutcome};
use crate::services::deduplicator::DedupOutcome;
use crate::services::override_resolver::{ForcedMatch, OverrideOutcome, OverrideRemoval};
use crate::services::rescue_engine::RescueOutcome;
use crate::services::tier_classifier::TierClassifier;
use std::collections::HashMap;

/// Stage outcomes the audit is derived from
pub struct StageOutcomes<'a> {
    pub dedup: &'a DedupOutcome,
    pub overrides: &'a OverrideOutcome,
    pub forced: &'a [ForcedMatch],
    pub allocation: &'a AllocationOutcome,
    pub rescue: &'a RescueOutcome,
}

/// Audit trail builder
pub struct AuditTrail<'a> {
    classifier: &'a TierClassifier,
}

impl<'a> AuditTrail<'a> {
    pub fn new(classifier: &'a TierClassifier) -> Self {
        Self { classifier }
    }

    /// One entry per standardized record, in input order
    pub fn build(&self, standardized: &[Contact], stages: &StageOutcomes) -> Vec<AuditEntry> {
        let duplicates: HashMap<&str, &str> = stages
            .dedup
            .duplicates
            .iter()
            .map(|d| (d.record_id.as_str(), d.kept_record_id.as_str()))
            .collect();
        let removals: HashMap<&str, &OverrideRemoval> = stages
            .overrides
            .removals
            .iter()
            .map(|r| (r.record_id.as_str(), r))
            .collect();
        let forced_entries: HashMap<&str, &str> = stages
            .forced
            .iter()
            .map(|f| (f.record_id.as_str(), f.entry.as_str()))
            .collect();
        let admissions: HashMap<&str, &Admission> = stages
            .allocation
            .admissions
            .iter()
            .chain(stages.rescue.admissions.iter())
            .map(|a| (a.record_id.as_str(), a))
            .collect();

        let mut rejected_from: HashMap<&str, Vec<&str>> = HashMap::new();
        for rejection in stages
            .allocation
            .rejections
            .iter()
            .chain(stages.rescue.rejections.iter())
        {
            rejected_from
                .entry(rejection.record_id.as_str())
                .or_default()
                .push(rejection.tier.as_str());
        }

        standardized
            .iter()
            .map(|contact| {
                let id = contact.record_id.as_str();
                let classification = self.classifier.classify(contact);
                let tier_match = classification
                    .first_match()
                    .map(|t| self.classifier.tier_name(t).to_string());
                let membership_gap = classification
                    .membership_gap
                    .map(|t| self.classifier.tier_name(t).to_string());
                let matched_score = classification
                    .first_match()
                    .map(|t| classification.score(t))
                    .unwrap_or(0);

                let (reason, message, final_tier, priority_score) =
                    if let Some(admission) = admissions.get(id) {
                        let (reason, message) = match admission.kind {
                            AdmissionKind::Pattern => (
                                Reason::Admitted,
                                format!(
                                    "admitted to {} with score {}",
                                    admission.tier, admission.priority_score
                                ),
                            ),
                            AdmissionKind::Forced => (
                                Reason::ForcedInclusion,
                                format!(
                                    "forced into {} by inclusion entry '{}'",
                                    admission.tier,
                                    forced_entries.get(id).copied().unwrap_or("")
                                ),
                            ),
                            AdmissionKind::Rescue => (
                                Reason::Rescued,
                                format!(
                                    "rescued into {} with rescue score {}",
                                    admission.tier, admission.priority_score
                                ),
                            ),
                        };
                        (reason, message, Some(admission.tier.clone()), admission.priority_score)
                    } else if let Some(kept) = duplicates.get(id) {
                        (Reason::Duplicate, format!("duplicate of {}", kept), None, matched_score)
                    } else if stages.dedup.empty_key.iter().any(|e| e == id) {
                        (
                            Reason::EmptyKey,
                            "name and organization both empty".to_string(),
                            None,
                            0,
                        )
                    } else if let Some(removal) = removals.get(id) {
                        (
                            Reason::OverrideExcluded,
                            format!("{}: '{}'", removal.action.as_str(), removal.entry),
                            None,
                            matched_score,
                        )
                    } else if let Some(tiers) = rejected_from.get(id) {
                        (
                            Reason::CapacityExceeded,
                            format!("organization capacity exceeded in {}", tiers.join(", ")),
                            None,
                            matched_score,
                        )
                    } else if tier_match.is_none() && membership_gap.is_some() {
                        (
                            Reason::RoleMismatch,
                            format!(
                                "title matched {} but membership role '{}' does not qualify",
                                membership_gap.as_deref().unwrap_or(""),
                                contact.membership_role
                            ),
                            None,
                            0,
                        )
                    } else {
                        (
                            Reason::NoPatternMatch,
                            "job title matched no tier rule-set".to_string(),
                            None,
                            matched_score,
                        )
                    };

                AuditEntry {
                    record_id: contact.record_id.clone(),
                    source_file: contact.source_file.clone(),
                    name_key: contact.name_key(),
                    organization_key: contact.organization_key().into_inner(),
                    job_title: contact.job_title.clone(),
                    tier_match,
                    membership_gap,
                    priority_score,
                    disposition: reason.disposition(),
                    final_tier,
                    reason,
                    message,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, OverrideConfig};
    use crate::models::{Disposition, EmailStatus, OverrideLists};
    use crate::services::capacity_allocator::CapacityAllocator;
    use crate::services::deduplicator::Deduplicator;
    use crate::services::override_resolver::OverrideResolver;
    use crate::services::rescue_engine::RescueEngine;
    use std::collections::HashSet;

    fn contact(id: &str, name: &str, organization: &str, title: &str, role: &str) -> Contact {
        Contact {
            record_id: id.to_string(),
            name: name.to_string(),
            organization: organization.to_string(),
            job_title: title.to_string(),
            email: String::new(),
            membership_role: role.to_string(),
            source_file: "a.json".to_string(),
            email_status: EmailStatus::Missing,
            email_schema_used: None,
        }
    }

    fn audit(standardized: &[Contact], lists: &OverrideLists) -> Vec<AuditEntry> {
        let config = EngineConfig::default();
        let classifier = TierClassifier::new(&config.tiers, &config.membership_terms).unwrap();
        let rescue_engine = RescueEngine::new(&config.rescue).unwrap();

        let dedup = Deduplicator::new().deduplicate(standardized);
        let resolver = OverrideResolver::new(lists, &OverrideConfig::default());
        let overrides = resolver.apply(&dedup.kept);
        let pool = &overrides.retained;
        let classifications = classifier.classify_all(pool);
        let allocation =
            CapacityAllocator::new(&classifier).allocate(pool, &classifications, &HashMap::new());
        let admitted: HashSet<&str> = allocation.admitted_ids();
        let rescue = rescue_engine.rescue(
            pool,
            &admitted,
            &allocation.unplaced_forced,
            classifier.tiers().len(),
        );

        AuditTrail::new(&classifier).build(
            standardized,
            &StageOutcomes {
                dedup: &dedup,
                overrides: &overrides,
                forced: &[],
                allocation: &allocation,
                rescue: &rescue,
            },
        )
    }

    #[test]
    fn test_one_entry_per_record_with_reasons() {
        let standardized = vec![
            contact("1", "Jane Doe", "Acme", "Chief Investment Officer", "Investment Team"),
            contact("2", "jane  doe", "ACME", "CIO", "Investment Team"),
            contact("3", "", "", "CIO", "Investment Team"),
            contact("4", "Bob Lee", "Bad Fund", "CIO", "Investment Team"),
            contact("5", "Ann Wu", "Acme", "Investment Analyst", "Operations"),
            contact("6", "Sam Roe", "Acme", "Chef", "Investment Team"),
            contact("7", "Kim Poe", "Beta", "Office Manager", "Operations"),
        ];
        let lists = OverrideLists {
            organization_exclude: vec!["Bad Fund".to_string()],
            ..OverrideLists::default()
        };
        let entries = audit(&standardized, &lists);

        assert_eq!(entries.len(), standardized.len());
        let reasons: Vec<Reason> = entries.iter().map(|e| e.reason).collect();
        assert_eq!(
            reasons,
            vec![
                Reason::Admitted,
                Reason::Duplicate,
                Reason::EmptyKey,
                Reason::OverrideExcluded,
                Reason::RoleMismatch,
                Reason::NoPatternMatch,
                Reason::Rescued,
            ]
        );

        assert_eq!(entries[0].final_tier.as_deref(), Some("Tier 1"));
        assert_eq!(entries[0].disposition, Disposition::Kept);
        assert_eq!(entries[1].message, "duplicate of 1");
        assert_eq!(entries[1].tier_match.as_deref(), Some("Tier 1"));
        assert_eq!(entries[3].message, "organization-excluded: 'Bad Fund'");
        assert_eq!(entries[4].membership_gap.as_deref(), Some("Tier 2"));
        assert_eq!(entries[4].tier_match, None);
        assert_eq!(entries[6].final_tier.as_deref(), Some("Rescue"));
        assert_eq!(entries[6].priority_score, 10);
    }

    #[test]
    fn test_capacity_exceeded_reason() {
        let standardized: Vec<Contact> = (0..12)
            .map(|i| contact(&i.to_string(), &format!("Partner {}", i), "Acme", "Partner", "Sales"))
            .collect();
        let entries = audit(&standardized, &OverrideLists::default());

        let kept = entries.iter().filter(|e| e.disposition == Disposition::Kept).count();
        assert_eq!(kept, 10);
        let over: Vec<&AuditEntry> = entries
            .iter()
            .filter(|e| e.reason == Reason::CapacityExceeded)
            .collect();
        assert_eq!(over.len(), 2);
        assert_eq!(over[0].message, "organization capacity exceeded in Tier 1");
        assert_eq!(over[0].tier_match.as_deref(), Some("Tier 1"));
    }
}
