//! Per-organization capacity allocation across ordered tiers
//!
//! **Algorithm (per tier, in priority order):**
//! 1. Candidates are records not yet admitted that fully match the tier,
//!    plus inclusion-list records forced into this tier or an earlier one
//! 2. Group candidates by organization key (first-seen order)
//! 3. Admit forced records first, then the rest by descending score
//!    (stable sort, so ties keep upstream order) while capacity remains
//! 4. Record every turned-away candidate as a capacity rejection for this
//!    tier; it stays in the pool for later tiers it also matches
//!
//! Forced records count against capacity like any other. A forced record
//! turned away falls through to every later tier; one that fits nowhere is
//! reported in [`AllocationOutcome::unplaced_forced`] for the rescue tier.
//!
//! Admission is final: a record admitted to one tier is never a candidate
//! for another.

use crate::models::{AdmissionKind, Contact, OrganizationKey, RunSummary, StageReport};
use crate::services::tier_classifier::{Classification, TierClassifier};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A record placed into a tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub record_id: String,
    pub tier_index: usize,
    pub tier: String,
    pub priority_score: u32,
    pub kind: AdmissionKind,
    pub organization: OrganizationKey,
}

/// A record turned away from a tier because its organization was full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityRejection {
    pub record_id: String,
    pub tier_index: usize,
    pub tier: String,
    pub priority_score: u32,
}

/// Allocation result
#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    /// Ordered by tier, then organization (first-seen), then rank
    pub admissions: Vec<Admission>,
    /// A record may be rejected from several tiers
    pub rejections: Vec<CapacityRejection>,
    /// Inclusion-list record ids every tier turned away, in pool order
    pub unplaced_forced: Vec<String>,
}

impl AllocationOutcome {
    pub fn admitted_ids(&self) -> HashSet<&str> {
        self.admissions.iter().map(|a| a.record_id.as_str()).collect()
    }
}

impl StageReport for AllocationOutcome {
    fn report(&self, summary: &mut RunSummary) {
        let mut organizations: HashMap<&str, HashSet<&OrganizationKey>> = HashMap::new();
        for admission in &self.admissions {
            let tier = summary.tier_mut(&admission.tier);
            tier.contacts += 1;
            if admission.kind == AdmissionKind::Forced {
                tier.forced += 1;
                summary.forced_inclusions += 1;
            }
            organizations
                .entry(admission.tier.as_str())
                .or_default()
                .insert(&admission.organization);
        }
        for (tier, orgs) in organizations {
            summary.tier_mut(tier).unique_organizations = orgs.len();
        }
        for rejection in &self.rejections {
            summary.tier_mut(&rejection.tier).capacity_rejections += 1;
        }
    }
}

/// Capacity allocator
pub struct CapacityAllocator<'a> {
    classifier: &'a TierClassifier,
}

impl<'a> CapacityAllocator<'a> {
    pub fn new(classifier: &'a TierClassifier) -> Self {
        Self { classifier }
    }

    /// Allocate the post-override pool into tiers
    ///
    /// `classifications` is parallel to `pool`. `forced` maps record id to
    /// the tier index an inclusion-list record is forced into.
    pub fn allocate(
        &self,
        pool: &[Contact],
        classifications: &[Classification],
        forced: &HashMap<String, usize>,
    ) -> AllocationOutcome {
        let mut outcome = AllocationOutcome::default();
        let mut admitted = vec![false; pool.len()];

        for (tier_index, tier) in self.classifier.tiers().iter().enumerate() {
            // Group candidates by organization, keeping first-seen order
            let mut group_order: Vec<OrganizationKey> = Vec::new();
            let mut groups: HashMap<OrganizationKey, Vec<(usize, bool)>> = HashMap::new();

            for (i, contact) in pool.iter().enumerate() {
                if admitted[i] {
                    continue;
                }
                let is_forced = match forced.get(&contact.record_id) {
                    Some(forced_tier) if *forced_tier > tier_index => continue,
                    Some(_) => true,
                    None => false,
                };
                if !is_forced && !classifications[i].matches(tier_index) {
                    continue;
                }

                let key = contact.organization_key();
                groups
                    .entry(key.clone())
                    .or_insert_with(|| {
                        group_order.push(key);
                        Vec::new()
                    })
                    .push((i, is_forced));
            }

            for key in group_order {
                let Some(mut candidates) = groups.remove(&key) else {
                    continue;
                };

                // Forced first, then score descending; stable for ties
                candidates.sort_by(|(a, a_forced), (b, b_forced)| {
                    b_forced.cmp(a_forced).then_with(|| {
                        classifications[*b]
                            .score(tier_index)
                            .cmp(&classifications[*a].score(tier_index))
                    })
                });

                let mut filled = 0usize;
                for (i, is_forced) in candidates {
                    let contact = &pool[i];
                    let score = classifications[i].score(tier_index);

                    if filled < tier.max_per_organization {
                        filled += 1;
                        admitted[i] = true;
                        outcome.admissions.push(Admission {
                            record_id: contact.record_id.clone(),
                            tier_index,
                            tier: tier.name.clone(),
                            priority_score: score,
                            kind: if is_forced {
                                AdmissionKind::Forced
                            } else {
                                AdmissionKind::Pattern
                            },
                            organization: key.clone(),
                        });
                    } else {
                        debug!(
                            record_id = %contact.record_id,
                            tier = %tier.name,
                            organization = %key,
                            score,
                            "Organization capacity exceeded"
                        );
                        outcome.rejections.push(CapacityRejection {
                            record_id: contact.record_id.clone(),
                            tier_index,
                            tier: tier.name.clone(),
                            priority_score: score,
                        });
                    }
                }
            }
        }

        outcome.unplaced_forced = pool
            .iter()
            .enumerate()
            .filter(|(i, c)| !admitted[*i] && forced.contains_key(&c.record_id))
            .map(|(_, c)| c.record_id.clone())
            .collect();
        if !outcome.unplaced_forced.is_empty() {
            debug!(
                count = outcome.unplaced_forced.len(),
                "Forced records found no tier with capacity"
            );
        }

        outcome
    }
}
