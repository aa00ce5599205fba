//! Rescue pass for unrepresented organizations
//!
//! After tier allocation, every organization with post-override candidates
//! but no admitted contact gets its best rescue-scoring contacts promoted
//! into the rescue tier. The rescue score uses its own, more permissive
//! seniority keywords. Organizations whose candidates all score zero stay
//! unrepresented.
//!
//! Inclusion-list records that no rule-set tier had room for land here
//! first, sharing the per-organization rescue cap.

use crate::error::EngineResult;
use crate::models::{AdmissionKind, Contact, OrganizationKey, RescueConfig, RunSummary, StageReport};
use crate::services::capacity_allocator::{Admission, CapacityRejection};
use crate::services::tier_classifier::KeywordScorer;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Rescue result
#[derive(Debug, Clone, Default)]
pub struct RescueOutcome {
    /// Forced overflow first, then rescued contacts
    pub admissions: Vec<Admission>,
    /// Forced overflow turned away because the rescue cap was reached
    pub rejections: Vec<CapacityRejection>,
    /// Unrepresented organizations with no positive-scoring candidate
    pub unrescued_organizations: Vec<OrganizationKey>,
}

impl StageReport for RescueOutcome {
    fn report(&self, summary: &mut RunSummary) {
        let rescued: Vec<&Admission> = self
            .admissions
            .iter()
            .filter(|a| a.kind == AdmissionKind::Rescue)
            .collect();
        let forced = self.admissions.len() - rescued.len();
        summary.rescued_contacts = rescued.len();
        summary.rescued_organizations = rescued
            .iter()
            .map(|a| &a.organization)
            .collect::<HashSet<_>>()
            .len();
        summary.forced_inclusions += forced;

        let tier_name = self
            .admissions
            .first()
            .map(|a| a.tier.as_str())
            .or_else(|| self.rejections.first().map(|r| r.tier.as_str()));
        if let Some(tier_name) = tier_name {
            let tier = summary.tier_mut(tier_name);
            tier.contacts = self.admissions.len();
            tier.forced = forced;
            tier.unique_organizations = self
                .admissions
                .iter()
                .map(|a| &a.organization)
                .collect::<HashSet<_>>()
                .len();
            tier.capacity_rejections = self.rejections.len();
        }
    }
}

/// Rescue engine
pub struct RescueEngine {
    tier_name: String,
    scorer: KeywordScorer,
    max_per_organization: usize,
}

impl RescueEngine {
    pub fn new(config: &RescueConfig) -> EngineResult<Self> {
        Ok(Self {
            tier_name: config.tier_name.clone(),
            scorer: KeywordScorer::compile(&config.tier_name, &config.keywords)?,
            max_per_organization: config.max_per_organization,
        })
    }

    pub fn tier_name(&self) -> &str {
        &self.tier_name
    }

    /// Seniority score of a contact's job title
    pub fn rescue_score(&self, contact: &Contact) -> u32 {
        self.scorer.score(contact.job_title.trim())
    }

    /// Promote contacts of organizations with zero admissions
    ///
    /// `pool` is the post-override candidate set; `admitted` the record ids
    /// already placed in a tier; `unplaced_forced` the inclusion-list ids no
    /// tier had room for; `tier_index` is reported on the admissions.
    /// Contacts without an organization are never rescued.
    pub fn rescue(
        &self,
        pool: &[Contact],
        admitted: &HashSet<&str>,
        unplaced_forced: &[String],
        tier_index: usize,
    ) -> RescueOutcome {
        let mut outcome = RescueOutcome::default();
        let mut filled: HashMap<OrganizationKey, usize> = HashMap::new();

        for contact in pool
            .iter()
            .filter(|c| unplaced_forced.iter().any(|id| *id == c.record_id))
        {
            let key = contact.organization_key();
            let used = filled.entry(key.clone()).or_default();
            let score = self.rescue_score(contact);
            if *used < self.max_per_organization {
                *used += 1;
                outcome.admissions.push(Admission {
                    record_id: contact.record_id.clone(),
                    tier_index,
                    tier: self.tier_name.clone(),
                    priority_score: score,
                    kind: AdmissionKind::Forced,
                    organization: key,
                });
            } else {
                debug!(
                    record_id = %contact.record_id,
                    organization = %key,
                    "Rescue tier capacity exceeded for forced record"
                );
                outcome.rejections.push(CapacityRejection {
                    record_id: contact.record_id.clone(),
                    tier_index,
                    tier: self.tier_name.clone(),
                    priority_score: score,
                });
            }
        }

        let placed: HashSet<&str> = outcome
            .admissions
            .iter()
            .map(|a| a.record_id.as_str())
            .collect();
        let represented: HashSet<OrganizationKey> = pool
            .iter()
            .filter(|c| {
                admitted.contains(c.record_id.as_str()) || placed.contains(c.record_id.as_str())
            })
            .map(|c| c.organization_key())
            .collect();

        let mut order: Vec<OrganizationKey> = Vec::new();
        let mut candidates: HashMap<OrganizationKey, Vec<(&Contact, u32)>> = HashMap::new();
        for contact in pool {
            let key = contact.organization_key();
            if key.is_empty()
                || represented.contains(&key)
                || unplaced_forced.iter().any(|id| *id == contact.record_id)
            {
                continue;
            }
            candidates
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push((contact, self.rescue_score(contact)));
        }

        for key in order {
            let Some(mut scored) = candidates.remove(&key) else {
                continue;
            };
            scored.retain(|(_, score)| *score > 0);
            if scored.is_empty() {
                debug!(organization = %key, "No rescue-eligible contacts");
                outcome.unrescued_organizations.push(key);
                continue;
            }

            scored.sort_by(|a, b| b.1.cmp(&a.1));
            for (contact, score) in scored.into_iter().take(self.max_per_organization) {
                outcome.admissions.push(Admission {
                    record_id: contact.record_id.clone(),
                    tier_index,
                    tier: self.tier_name.clone(),
                    priority_score: score,
                    kind: AdmissionKind::Rescue,
                    organization: key.clone(),
                });
            }
        }

        info!(
            admitted = outcome.admissions.len(),
            unrescued_organizations = outcome.unrescued_organizations.len(),
            "Rescue pass complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailStatus;

    fn contact(id: &str, organization: &str, title: &str) -> Contact {
        Contact {
            record_id: id.to_string(),
            name: format!("Person {}", id),
            organization: organization.to_string(),
            job_title: title.to_string(),
            email: String::new(),
            membership_role: String::new(),
            source_file: "a.json".to_string(),
            email_status: EmailStatus::Missing,
            email_schema_used: None,
        }
    }

    fn engine() -> RescueEngine {
        RescueEngine::new(&RescueConfig::default()).unwrap()
    }

    #[test]
    fn test_rescues_top_scorers_of_unrepresented_org() {
        let pool = vec![
            contact("1", "Beta Fund", "Office Manager"),
            contact("2", "Beta Fund", "Chief Operating Officer"),
            contact("3", "Beta Fund", "Senior Director"),
            contact("4", "Beta Fund", "Receptionist"),
        ];
        let outcome = engine().rescue(&pool, &HashSet::new(), &[], 2);
        let ids: Vec<_> = outcome.admissions.iter().map(|a| a.record_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert!(outcome.admissions.iter().all(|a| a.tier == "Rescue" && a.tier_index == 2));
    }

    #[test]
    fn test_represented_orgs_skipped() {
        let pool = vec![
            contact("1", "Acme", "CIO"),
            contact("2", "Acme", "Chief Executive"),
        ];
        let admitted = HashSet::from(["1"]);
        let outcome = engine().rescue(&pool, &admitted, &[], 2);
        assert!(outcome.admissions.is_empty());
    }

    #[test]
    fn test_zero_score_org_not_rescued() {
        let pool = vec![
            contact("1", "Zeta Partners", "Receptionist"),
            contact("2", "Zeta Partners", ""),
            contact("3", "Zeta Partners", "Driver"),
        ];
        let outcome = engine().rescue(&pool, &HashSet::new(), &[], 2);
        assert!(outcome.admissions.is_empty());
        assert_eq!(outcome.unrescued_organizations, vec![OrganizationKey::new("Zeta Partners")]);
    }

    #[test]
    fn test_unplaced_forced_share_rescue_cap() {
        let pool = vec![
            contact("1", "Acme", "Chef"),
            contact("2", "Acme", "Driver"),
            contact("3", "Acme", "Gardener"),
            contact("4", "Acme", "CIO"),
        ];
        let admitted = HashSet::from(["4"]);
        let unplaced = vec!["1".to_string(), "2".to_string(), "3".to_string()];
        let outcome = engine().rescue(&pool, &admitted, &unplaced, 2);

        let placed: Vec<_> = outcome
            .admissions
            .iter()
            .map(|a| (a.record_id.as_str(), a.kind))
            .collect();
        assert_eq!(placed, vec![("1", AdmissionKind::Forced), ("2", AdmissionKind::Forced)]);
        assert_eq!(outcome.rejections.len(), 1);
        assert_eq!(outcome.rejections[0].record_id, "3");
        assert_eq!(outcome.rejections[0].tier, "Rescue");
    }

    #[test]
    fn test_contacts_without_organization_ignored() {
        let pool = vec![contact("1", "", "Chief Executive Officer")];
        assert!(engine().rescue(&pool, &HashSet::new(), &[], 2).admissions.is_empty());
    }
}
