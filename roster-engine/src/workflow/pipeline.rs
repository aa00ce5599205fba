//! Pipeline Orchestrator
//!
//! Runs the consolidation stages in order over one batch of sources:
//! standardize → deduplicate → overrides → classify → allocate → rescue →
//! email fill → audit.
//!
//! # Error Handling
//! - Source-level failures (no usable columns, no rows) skip that source
//!   with a warning; the rest of the run completes
//! - An empty standardized set yields an empty result, not an error
//! - Malformed rule patterns are rejected when the pipeline is built
//!
//! # Example
//! ```rust,ignore
//! let pipeline = Pipeline::new(EngineConfig::default())?;
//! let result = pipeline.run(&PipelineInput::new(tables))?;
//! println!("{}", result.summary.display_string());
//! ```

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AuditEntry, Contact, OverrideLists, RawTable, Reason, RunSummary, StageReport, TieredContact,
};
use crate::services::{
    Admission, AuditTrail, CapacityAllocator, Deduplicator, EmailSchemaInferencer,
    OverrideResolver, RescueEngine, StageOutcomes, Standardizer, TierClassifier,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything one run consumes
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    /// Sources in load order; order decides which duplicate is kept
    pub tables: Vec<RawTable>,
    pub overrides: OverrideLists,
}

impl PipelineInput {
    pub fn new(tables: Vec<RawTable>) -> Self {
        Self {
            tables,
            overrides: OverrideLists::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideLists) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Contacts admitted to one output tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOutput {
    pub name: String,
    pub contacts: Vec<TieredContact>,
}

/// Source dropped before standardization finished
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSource {
    pub source: String,
    pub reason: String,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Rule-set tiers in priority order, then the rescue tier
    pub tiers: Vec<TierOutput>,
    /// One entry per standardized record
    pub audit: Vec<AuditEntry>,
    pub summary: RunSummary,
    pub skipped_sources: Vec<SkippedSource>,
}

impl RunResult {
    pub fn tier(&self, name: &str) -> Option<&TierOutput> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// All kept contacts across tiers
    pub fn kept(&self) -> impl Iterator<Item = &TieredContact> {
        self.tiers.iter().flat_map(|t| t.contacts.iter())
    }
}

/// Pipeline orchestrator
///
/// Holds only compiled configuration; every run builds its own summary and
/// outcomes, so one instance can serve many runs.
pub struct Pipeline {
    config: EngineConfig,
    standardizer: Standardizer,
    classifier: TierClassifier,
    rescue_engine: RescueEngine,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    /// Validate configuration and compile every rule pattern
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            standardizer: Standardizer::new(config.default_membership_role.clone()),
            classifier: TierClassifier::new(&config.tiers, &config.membership_terms)?,
            rescue_engine: RescueEngine::new(&config.rescue)?,
            config,
            cancel: None,
        })
    }

    /// Check `flag` at every stage boundary and stop with
    /// [`EngineError::Cancelled`] once it is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn checkpoint(&self, stage: &'static str) -> EngineResult<()> {
        match &self.cancel {
            Some(flag) if flag.load(Ordering::SeqCst) => {
                warn!(stage, "Run cancelled");
                Err(EngineError::Cancelled { stage })
            }
            _ => Ok(()),
        }
    }

    /// Run every stage over `input`
    pub fn run(&self, input: &PipelineInput) -> EngineResult<RunResult> {
        let run_id = Uuid::new_v4();
        let mut summary = RunSummary::new(run_id, Utc::now());
        info!(%run_id, sources = input.tables.len(), "Starting consolidation run");

        // Stage 1: standardize every source, skipping unusable ones
        self.checkpoint("standardize")?;
        let (standardized, skipped_sources) = self.standardize_all(&input.tables)?;
        summary.sources_loaded = input.tables.len() - skipped_sources.len();
        summary.sources_skipped = skipped_sources.len();
        summary.input_records = standardized.len();

        for tier in self.classifier.tiers() {
            summary.tier_mut(&tier.name);
        }
        summary.tier_mut(self.rescue_engine.tier_name());

        let mut tiers: Vec<TierOutput> = self
            .classifier
            .tiers()
            .iter()
            .map(|t| t.name.as_str())
            .chain(std::iter::once(self.rescue_engine.tier_name()))
            .map(|name| TierOutput {
                name: name.to_string(),
                contacts: Vec::new(),
            })
            .collect();

        if standardized.is_empty() {
            warn!(%run_id, "No records after standardization; reporting empty result");
            return Ok(RunResult {
                run_id,
                tiers,
                audit: Vec::new(),
                summary,
                skipped_sources,
            });
        }

        // Stage 2: deduplicate
        self.checkpoint("deduplicate")?;
        let dedup = Deduplicator::new().deduplicate(&standardized);
        dedup.report(&mut summary);

        // Stage 3: override lists, then resolve forced inclusions
        self.checkpoint("overrides")?;
        let resolver = OverrideResolver::new(&input.overrides, &self.config.overrides);
        let overrides = resolver.apply(&dedup.kept);
        overrides.report(&mut summary);
        let pool = &overrides.retained;

        let forced = resolver.resolve_forced(pool);
        let fallback = self.config.forced_fallback_index();
        let by_id: HashMap<&str, &Contact> =
            pool.iter().map(|c| (c.record_id.as_str(), c)).collect();
        let forced_tiers: HashMap<String, usize> = forced
            .iter()
            .filter_map(|f| {
                by_id
                    .get(f.record_id.as_str())
                    .map(|c| (f.record_id.clone(), self.classifier.forced_tier(c, fallback)))
            })
            .collect();

        // Stage 4: classify and allocate
        self.checkpoint("classify")?;
        let classifications = self.classifier.classify_all(pool);
        let allocation = CapacityAllocator::new(&self.classifier).allocate(
            pool,
            &classifications,
            &forced_tiers,
        );
        allocation.report(&mut summary);

        // Stage 5: forced overflow and unrepresented organizations
        self.checkpoint("rescue")?;
        let admitted: HashSet<&str> = allocation.admitted_ids();
        let rescue = self.rescue_engine.rescue(
            pool,
            &admitted,
            &allocation.unplaced_forced,
            self.classifier.tiers().len(),
        );
        rescue.report(&mut summary);

        // Stage 6: infer emails from the full standardized set, fill kept contacts
        self.checkpoint("email")?;
        let inferencer = EmailSchemaInferencer::mine(&standardized);
        for admission in allocation.admissions.iter().chain(rescue.admissions.iter()) {
            let Some(contact) = by_id.get(admission.record_id.as_str()) else {
                continue;
            };
            if let Some(output) = tiers.get_mut(admission.tier_index) {
                output.contacts.push(tiered(admission, contact));
            }
        }
        let emails = inferencer.fill_all(
            tiers
                .iter_mut()
                .flat_map(|t| t.contacts.iter_mut())
                .map(|t| &mut t.contact),
        );
        emails.report(&mut summary);

        // Stage 7: audit
        self.checkpoint("audit")?;
        let audit = AuditTrail::new(&self.classifier).build(
            &standardized,
            &StageOutcomes {
                dedup: &dedup,
                overrides: &overrides,
                forced: &forced,
                allocation: &allocation,
                rescue: &rescue,
            },
        );
        summary.no_pattern_match = count_reason(&audit, Reason::NoPatternMatch);
        summary.role_mismatch = count_reason(&audit, Reason::RoleMismatch);
        summary.total_kept = tiers.iter().map(|t| t.contacts.len()).sum();

        info!(%run_id, "{}", summary.display_string());
        for tier in &summary.tiers {
            debug!(%run_id, "{}", tier.display_string());
        }

        Ok(RunResult {
            run_id,
            tiers,
            audit,
            summary,
            skipped_sources,
        })
    }

    fn standardize_all(
        &self,
        tables: &[RawTable],
    ) -> EngineResult<(Vec<Contact>, Vec<SkippedSource>)> {
        let mut used_ids = HashSet::new();
        let mut contacts = Vec::new();
        let mut skipped = Vec::new();

        for table in tables {
            match self.standardizer.standardize(table, &mut used_ids) {
                Ok(rows) => {
                    debug!(source = %table.source, records = rows.len(), "Source standardized");
                    contacts.extend(rows);
                }
                Err(e) if e.is_source_level() => {
                    warn!(source = %table.source, error = %e, "Skipping source");
                    skipped.push(SkippedSource {
                        source: table.source.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok((contacts, skipped))
    }
}

fn tiered(admission: &Admission, contact: &Contact) -> TieredContact {
    TieredContact {
        tier: admission.tier.clone(),
        priority_score: admission.priority_score,
        admission: admission.kind,
        contact: contact.clone(),
    }
}

fn count_reason(audit: &[AuditEntry], reason: Reason) -> usize {
    audit.iter().filter(|e| e.reason == reason).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(source: &str, rows: &[[&str; 4]]) -> RawTable {
        let columns = ["Name", "Organization", "Job Title", "Email"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        rows.iter()
            .fold(RawTable::new(source, columns), |t, row| t.with_row(row))
    }

    #[test]
    fn test_skips_unusable_source() {
        let pipeline = Pipeline::new(EngineConfig::default()).unwrap();
        let bad = RawTable::new("bad.json", vec!["Phone".to_string()]).with_row(&["555"]);
        let good = table("good.json", &[["Jane Doe", "Acme", "CIO", ""]]);

        let result = pipeline.run(&PipelineInput::new(vec![bad, good])).unwrap();
        assert_eq!(result.skipped_sources.len(), 1);
        assert_eq!(result.skipped_sources[0].source, "bad.json");
        assert_eq!(result.summary.sources_loaded, 1);
        assert_eq!(result.summary.sources_skipped, 1);
        assert_eq!(result.summary.total_kept, 1);
    }

    #[test]
    fn test_empty_input_reports_zero() {
        let pipeline = Pipeline::new(EngineConfig::default()).unwrap();
        let empty = RawTable::new("empty.json", vec!["Name".to_string()]);

        let result = pipeline.run(&PipelineInput::new(vec![empty])).unwrap();
        assert!(result.audit.is_empty());
        assert_eq!(result.summary.total_kept, 0);
        assert_eq!(result.tiers.len(), 3);
        assert!(result.kept().next().is_none());
    }

    #[test]
    fn test_cancellation_checked_at_stage_boundary() {
        let flag = Arc::new(AtomicBool::new(true));
        let pipeline = Pipeline::new(EngineConfig::default())
            .unwrap()
            .with_cancellation(flag);
        let input = PipelineInput::new(vec![table("a.json", &[["Jane Doe", "Acme", "CIO", ""]])]);

        match pipeline.run(&input) {
            Err(EngineError::Cancelled { stage }) => assert_eq!(stage, "standardize"),
            other => panic!("expected cancellation, got {:?}", other.map(|r| r.summary)),
        }
    }

    #[test]
    fn test_runs_do_not_share_counts() {
        let pipeline = Pipeline::new(EngineConfig::default()).unwrap();
        let input = PipelineInput::new(vec![table("a.json", &[["Jane Doe", "Acme", "CIO", ""]])]);

        let first = pipeline.run(&input).unwrap();
        let second = pipeline.run(&input).unwrap();
        assert_eq!(first.summary.tiers, second.summary.tiers);
        assert_ne!(first.run_id, second.run_id);
    }
}
