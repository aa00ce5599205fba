//! Whole-run invariant checks

use roster_engine::config::EngineConfig;
use roster_engine::models::{Contact, Disposition, EmailStatus, Reason};
use roster_engine::services::RescueEngine;
use roster_engine::RunResult;
use std::collections::{HashMap, HashSet};

/// Record ids present in any output tier
pub fn kept_ids(result: &RunResult) -> HashSet<String> {
    result.kept().map(|c| c.contact.record_id.clone()).collect()
}

/// No record id appears in two tiers, or twice in one
pub fn assert_mutually_exclusive(result: &RunResult) {
    let mut seen = HashSet::new();
    for contact in result.kept() {
        assert!(
            seen.insert(contact.contact.record_id.clone()),
            "record {} admitted more than once",
            contact.contact.record_id
        );
    }
}

/// Admissions per (tier, organization) never exceed the tier cap
///
/// Forced and rescued contacts count like any other; the rescue tier is
/// capped by the rescue settings.
pub fn assert_capacity_respected(result: &RunResult, config: &EngineConfig) {
    let caps = config
        .tiers
        .iter()
        .map(|rule| (rule.name.as_str(), rule.max_per_organization))
        .chain(std::iter::once((
            config.rescue.tier_name.as_str(),
            config.rescue.max_per_organization,
        )));

    for (name, max) in caps {
        let Some(tier) = result.tier(name) else {
            continue;
        };
        let mut per_org: HashMap<String, usize> = HashMap::new();
        for contact in &tier.contacts {
            *per_org.entry(contact.contact.organization_key().into_inner()).or_default() += 1;
        }
        for (organization, count) in per_org {
            assert!(
                count <= max,
                "{} has {} contacts in {} (max {})",
                organization,
                count,
                name,
                max
            );
        }
    }
}

/// One audit entry per input record; Kept exactly when the record is output
pub fn assert_audit_complete(result: &RunResult) {
    assert_eq!(result.audit.len(), result.summary.input_records);

    let ids: HashSet<&str> = result.audit.iter().map(|e| e.record_id.as_str()).collect();
    assert_eq!(ids.len(), result.audit.len(), "duplicate audit record ids");

    let kept = kept_ids(result);
    for entry in &result.audit {
        let is_kept = entry.disposition == Disposition::Kept;
        assert_eq!(
            is_kept,
            kept.contains(&entry.record_id),
            "audit disposition mismatch for {}",
            entry.record_id
        );
        assert_eq!(is_kept, entry.final_tier.is_some());
    }
    assert_eq!(kept.len(), result.summary.total_kept);
}

/// Every organization with a positive rescue-scoring candidate that
/// survived overrides is represented in the output
pub fn assert_rescue_coverage(result: &RunResult, config: &EngineConfig) {
    let engine = RescueEngine::new(&config.rescue).expect("rescue config compiles");
    let represented: HashSet<&str> = result
        .audit
        .iter()
        .filter(|e| e.disposition == Disposition::Kept)
        .map(|e| e.organization_key.as_str())
        .collect();

    for entry in &result.audit {
        if matches!(
            entry.reason,
            Reason::Duplicate | Reason::EmptyKey | Reason::OverrideExcluded
        ) || entry.organization_key.is_empty()
        {
            continue;
        }
        let probe = Contact {
            record_id: entry.record_id.clone(),
            name: entry.name_key.clone(),
            organization: entry.organization_key.clone(),
            job_title: entry.job_title.clone(),
            email: String::new(),
            membership_role: String::new(),
            source_file: entry.source_file.clone(),
            email_status: EmailStatus::Missing,
            email_schema_used: None,
        };
        if engine.rescue_score(&probe) > 0 {
            assert!(
                represented.contains(entry.organization_key.as_str()),
                "organization '{}' has a rescuable candidate but no output",
                entry.organization_key
            );
        }
    }
}
