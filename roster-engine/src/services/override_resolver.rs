//! Override list reconciliation
//!
//! Applies, in order:
//! 1. Organization exclude list (exact or substring match)
//! 2. Organization include list, when non-empty (allow-list)
//! 3. Contact remove list: exact email first, fuzzy (name, organization)
//!    only for records that missed the email fast path
//! 4. Contact exclude list: exact normalized (name, organization)
//!
//! Matching never fails. Entries with empty fields simply never match.

use crate::config::OverrideConfig;
use crate::models::{Contact, OverrideLists, RunSummary, StageReport};
use crate::services::email_inferencer::natural_order;
use crate::services::similarity::SimilarityStrategy;
use roster_common::text::{fuzzy_normalize, normalize_key};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Which override rule removed a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverrideAction {
    OrganizationExcluded,
    OrganizationNotIncluded,
    RemovedByEmail,
    RemovedByFuzzyMatch,
    ContactExcluded,
}

impl OverrideAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideAction::OrganizationExcluded => "organization-excluded",
            OverrideAction::OrganizationNotIncluded => "organization-not-included",
            OverrideAction::RemovedByEmail => "removed-by-email",
            OverrideAction::RemovedByFuzzyMatch => "removed-by-fuzzy-match",
            OverrideAction::ContactExcluded => "contact-excluded",
        }
    }
}

/// One record dropped by an override list, with the entry that matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRemoval {
    pub record_id: String,
    pub action: OverrideAction,
    pub entry: String,
    /// Similarity that triggered a fuzzy removal
    pub similarity: Option<f64>,
}

/// Override resolution result
#[derive(Debug, Clone, Default)]
pub struct OverrideOutcome {
    pub retained: Vec<Contact>,
    pub removals: Vec<OverrideRemoval>,
}

impl StageReport for OverrideOutcome {
    fn report(&self, summary: &mut RunSummary) {
        summary.override_excluded = self.removals.len();
    }
}

/// Inclusion-list entry resolved to a post-override record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedMatch {
    pub record_id: String,
    pub entry: String,
}

struct FuzzyEntry {
    name: String,
    organization: String,
    label: String,
}

/// Override resolver with lists prepared for lookup
pub struct OverrideResolver {
    organization_exclude: Vec<(String, String)>,
    organization_include: Vec<(String, String)>,
    removal_emails: HashMap<String, String>,
    fuzzy_removals: Vec<FuzzyEntry>,
    contact_exclude: HashMap<(String, String), String>,
    contact_include: Vec<FuzzyEntry>,
    similarity: Box<dyn SimilarityStrategy>,
    fuzzy_threshold: f64,
    min_substring_len: usize,
}

impl OverrideResolver {
    /// Normalize every list entry once up front
    pub fn new(lists: &OverrideLists, config: &OverrideConfig) -> Self {
        let organizations = |entries: &[String]| -> Vec<(String, String)> {
            entries
                .iter()
                .map(|e| (normalize_key(e), e.trim().to_string()))
                .filter(|(key, _)| !key.is_empty())
                .collect()
        };

        let mut removal_emails = HashMap::new();
        let mut fuzzy_removals = Vec::new();
        for entry in &lists.contact_remove {
            if entry.has_email() {
                removal_emails.insert(normalize_key(&entry.email), entry.label());
            } else if !fuzzy_name(&entry.name).is_empty() {
                fuzzy_removals.push(FuzzyEntry {
                    name: fuzzy_name(&entry.name),
                    organization: fuzzy_normalize(&entry.organization),
                    label: entry.label(),
                });
            }
        }

        let contact_exclude = lists
            .contact_exclude
            .iter()
            .map(|e| ((normalize_key(&e.name), normalize_key(&e.organization)), e.label()))
            .filter(|((name, _), _)| !name.is_empty())
            .collect();

        let contact_include = lists
            .contact_include
            .iter()
            .filter(|e| !fuzzy_name(&e.name).is_empty())
            .map(|e| FuzzyEntry {
                name: fuzzy_name(&e.name),
                organization: fuzzy_normalize(&e.organization),
                label: e.label(),
            })
            .collect();

        let similarity = config.similarity.strategy();
        debug!(
            similarity = similarity.name(),
            threshold = config.fuzzy_threshold,
            fuzzy_removals = fuzzy_removals.len(),
            inclusions = lists.contact_include.len(),
            "Override resolver prepared"
        );

        Self {
            organization_exclude: organizations(&lists.organization_exclude),
            organization_include: organizations(&lists.organization_include),
            removal_emails,
            fuzzy_removals,
            contact_exclude,
            contact_include,
            similarity,
            fuzzy_threshold: config.fuzzy_threshold,
            min_substring_len: config.min_substring_len,
        }
    }

    /// Apply all override lists to the deduplicated set
    pub fn apply(&self, contacts: &[Contact]) -> OverrideOutcome {
        let mut outcome = OverrideOutcome::default();

        for contact in contacts {
            match self.check(contact) {
                Some(removal) => {
                    debug!(
                        record_id = %contact.record_id,
                        action = removal.action.as_str(),
                        entry = %removal.entry,
                        "Override removed contact"
                    );
                    outcome.removals.push(removal);
                }
                None => outcome.retained.push(contact.clone()),
            }
        }

        info!(
            retained = outcome.retained.len(),
            removed = outcome.removals.len(),
            "Override lists applied"
        );
        outcome
    }

    fn check(&self, contact: &Contact) -> Option<OverrideRemoval> {
        let organization = contact.organization_key();
        let removal = |action, entry: &str, similarity| {
            Some(OverrideRemoval {
                record_id: contact.record_id.clone(),
                action,
                entry: entry.to_string(),
                similarity,
            })
        };

        // (a) organization exclude
        if let Some((_, label)) = self
            .organization_exclude
            .iter()
            .find(|(key, _)| self.organization_matches(organization.as_str(), key))
        {
            return removal(OverrideAction::OrganizationExcluded, label, None);
        }

        // (b) organization include (allow-list)
        if !self.organization_include.is_empty()
            && !self
                .organization_include
                .iter()
                .any(|(key, _)| self.organization_matches(organization.as_str(), key))
        {
            return removal(
                OverrideAction::OrganizationNotIncluded,
                &contact.organization,
                None,
            );
        }

        // (c) contact removal: email fast path, then fuzzy
        let email = normalize_key(&contact.email);
        if !email.is_empty() {
            if let Some(label) = self.removal_emails.get(&email) {
                return removal(OverrideAction::RemovedByEmail, label, None);
            }
        }
        if let Some((entry, score)) = self.best_fuzzy(contact, &self.fuzzy_removals) {
            return removal(OverrideAction::RemovedByFuzzyMatch, &entry.label, Some(score));
        }

        // (d) contact exclude
        let key = (contact.name_key(), organization.into_inner());
        if let Some(label) = self.contact_exclude.get(&key) {
            return removal(OverrideAction::ContactExcluded, label, None);
        }

        None
    }

    /// Exact match, or either-direction containment where the contained
    /// string is at least `min_substring_len` characters
    pub fn organization_matches(&self, record: &str, entry: &str) -> bool {
        if record.is_empty() || entry.is_empty() {
            return false;
        }
        if record == entry {
            return true;
        }
        (entry.chars().count() >= self.min_substring_len && record.contains(entry))
            || (record.chars().count() >= self.min_substring_len && entry.contains(record))
    }

    /// Highest-scoring fuzzy entry at or above the threshold
    ///
    /// Name similarity must clear the threshold; when the entry names an
    /// organization, organization similarity must too. The reported score is
    /// the lower of the two.
    fn best_fuzzy<'a>(
        &self,
        contact: &Contact,
        entries: &'a [FuzzyEntry],
    ) -> Option<(&'a FuzzyEntry, f64)> {
        if entries.is_empty() {
            return None;
        }
        let name = fuzzy_name(&contact.name);
        if name.is_empty() {
            return None;
        }
        let organization = fuzzy_normalize(&contact.organization);

        let mut best: Option<(&FuzzyEntry, f64)> = None;
        for entry in entries {
            let name_score = self.similarity.similarity(&name, &entry.name);
            if name_score < self.fuzzy_threshold {
                continue;
            }
            let score = if entry.organization.is_empty() {
                name_score
            } else {
                let org_score = self.similarity.similarity(&organization, &entry.organization);
                if org_score < self.fuzzy_threshold {
                    continue;
                }
                name_score.min(org_score)
            };
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best
    }

    /// Resolve contact inclusion entries against the post-override pool
    ///
    /// Exact normalized (name, organization) wins; otherwise the best fuzzy
    /// candidate at or above the threshold. Each record is forced at most once.
    pub fn resolve_forced(&self, pool: &[Contact]) -> Vec<ForcedMatch> {
        let mut matches = Vec::new();
        let mut taken: HashSet<&str> = HashSet::new();

        for entry in &self.contact_include {
            let exact = pool.iter().find(|c| {
                !taken.contains(c.record_id.as_str())
                    && fuzzy_name(&c.name) == entry.name
                    && (entry.organization.is_empty()
                        || fuzzy_normalize(&c.organization) == entry.organization)
            });

            let found = exact.or_else(|| {
                pool.iter()
                    .filter(|c| !taken.contains(c.record_id.as_str()))
                    .filter_map(|c| {
                        self.best_fuzzy(c, std::slice::from_ref(entry))
                            .map(|(_, score)| (c, score))
                    })
                    .fold(None, |best: Option<(&Contact, f64)>, (c, score)| match best {
                        Some((_, s)) if s >= score => best,
                        _ => Some((c, score)),
                    })
                    .map(|(c, _)| c)
            });

            match found {
                Some(contact) => {
                    taken.insert(contact.record_id.as_str());
                    matches.push(ForcedMatch {
                        record_id: contact.record_id.clone(),
                        entry: entry.label.clone(),
                    });
                }
                None => debug!(entry = %entry.label, "Inclusion entry matched no retained contact"),
            }
        }

        matches
    }
}

/// Fuzzy projection of a person's name in "First Last" order
fn fuzzy_name(name: &str) -> String {
    fuzzy_normalize(&natural_order(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactRef, ContactRemoval, EmailStatus};

    fn contact(id: &str, name: &str, organization: &str, email: &str) -> Contact {
        Contact {
            record_id: id.to_string(),
            name: name.to_string(),
            organization: organization.to_string(),
            job_title: String::new(),
            email: email.to_string(),
            membership_role: String::new(),
            source_file: "a.json".to_string(),
            email_status: EmailStatus::Missing,
            email_schema_used: None,
        }
    }

    fn resolver(lists: OverrideLists) -> OverrideResolver {
        OverrideResolver::new(&lists, &OverrideConfig::default())
    }

    #[test]
    fn test_organization_exclude_substring_variant() {
        let r = resolver(OverrideLists {
            organization_exclude: vec!["Acme Capital".to_string()],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "Jane Doe", "ACME CAPITAL LLC", ""),
            contact("2", "Bob Lee", "Zeta Partners", ""),
        ]);
        assert_eq!(outcome.retained.len(), 1);
        assert_eq!(outcome.removals[0].record_id, "1");
        assert_eq!(outcome.removals[0].action, OverrideAction::OrganizationExcluded);
        assert_eq!(outcome.removals[0].entry, "Acme Capital");
    }

    #[test]
    fn test_short_entries_need_exact_match() {
        let r = resolver(OverrideLists {
            organization_exclude: vec!["ABC".to_string()],
            ..Default::default()
        });
        assert!(r.organization_matches("abc", "abc"));
        assert!(!r.organization_matches("abc capital", "abc"));
        // record contained in a long entry
        assert!(r.organization_matches("acme capital", "acme capital partners"));
        assert!(!r.organization_matches("", "acme"));
    }

    #[test]
    fn test_include_list_is_allow_list() {
        let r = resolver(OverrideLists {
            organization_include: vec!["Acme Capital".to_string()],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "Jane Doe", "Acme Capital", ""),
            contact("2", "Bob Lee", "Zeta Partners", ""),
        ]);
        assert_eq!(outcome.retained[0].record_id, "1");
        assert_eq!(outcome.removals[0].action, OverrideAction::OrganizationNotIncluded);
    }

    #[test]
    fn test_removal_by_email_is_exact() {
        let r = resolver(OverrideLists {
            contact_remove: vec![ContactRemoval {
                email: "Jane.Doe@acme.com".to_string(),
                name: "Someone Else".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "Jane Doe", "Acme", "jane.doe@ACME.com"),
            // entry with email never fuzzy matches by name
            contact("2", "Someone Else", "Acme", ""),
        ]);
        assert_eq!(outcome.removals.len(), 1);
        assert_eq!(outcome.removals[0].action, OverrideAction::RemovedByEmail);
    }

    #[test]
    fn test_removal_by_fuzzy_name() {
        let r = resolver(OverrideLists {
            contact_remove: vec![ContactRemoval {
                name: "Jonathan Smith".to_string(),
                organization: "Acme Capital".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "Jonathon Smith", "Acme Capital", ""),
            contact("2", "Jonathan Smith", "Zeta Partners", ""),
            contact("3", "Mary Jones", "Acme Capital", ""),
        ]);
        assert_eq!(outcome.removals.len(), 1);
        assert_eq!(outcome.removals[0].record_id, "1");
        assert_eq!(outcome.removals[0].action, OverrideAction::RemovedByFuzzyMatch);
        assert!(outcome.removals[0].similarity.unwrap() >= 0.85);
    }

    #[test]
    fn test_removal_matches_last_first_form() {
        let r = resolver(OverrideLists {
            contact_remove: vec![ContactRemoval {
                name: "Doe, Jane".to_string(),
                organization: "Acme Capital".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "Jane Doe", "Acme Capital", ""),
            contact("2", "Bob Lee", "Acme Capital", ""),
        ]);
        assert_eq!(outcome.removals.len(), 1);
        assert_eq!(outcome.removals[0].record_id, "1");
        assert_eq!(outcome.removals[0].similarity, Some(1.0));
    }

    #[test]
    fn test_contact_exclude_exact() {
        let r = resolver(OverrideLists {
            contact_exclude: vec![ContactRef::new("Jane Doe", "Acme")],
            ..Default::default()
        });
        let outcome = r.apply(&[
            contact("1", "jane  doe", "ACME", ""),
            contact("2", "Jane Does", "Acme", ""),
        ]);
        assert_eq!(outcome.removals.len(), 1);
        assert_eq!(outcome.removals[0].action, OverrideAction::ContactExcluded);
    }

    #[test]
    fn test_empty_lists_keep_everything() {
        let r = resolver(OverrideLists::default());
        let outcome = r.apply(&[contact("1", "", "", "")]);
        assert_eq!(outcome.retained.len(), 1);
        assert!(outcome.removals.is_empty());
    }

    #[test]
    fn test_resolve_forced_exact_then_fuzzy() {
        let r = resolver(OverrideLists {
            contact_include: vec![
                ContactRef::new("Jane Doe", "Acme"),
                ContactRef::new("Robert Leigh", "Zeta Partners"),
                ContactRef::new("Nobody Here", "Acme"),
            ],
            ..Default::default()
        });
        let pool = vec![
            contact("1", "Jane Doe", "ACME", ""),
            contact("2", "Robert Leigh.", "Zeta Partners", ""),
        ];
        let forced = r.resolve_forced(&pool);
        assert_eq!(forced.len(), 2);
        assert_eq!(forced[0].record_id, "1");
        assert_eq!(forced[1].record_id, "2");
    }
}
