//! Configuration for roster-engine
//!
//! One TOML file carries the shared bootstrap keys (`[logging]`,
//! `output_dir`) and the engine rules under `[engine]`. Every engine key has
//! a built-in default, so an empty file (or no file) yields a working setup.
//!
//! **Resolution priority:** CLI `--config` → `ROSTER_CONFIG` → user config dir → defaults

use crate::error::{EngineError, EngineResult};
use crate::models::{PatternSet, PriorityKeyword, RescueConfig, TierRuleSet};
use crate::services::similarity::SimilarityKind;
use crate::services::tier_classifier::TierClassifier;
use roster_common::config::{load_toml_config, resolve_config_path, TomlConfig, CONFIG_ENV_VAR};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Full config file layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(flatten)]
    pub common: TomlConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

/// Override matching settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideConfig {
    /// Minimum similarity for fuzzy (name, organization) matches
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Minimum length of the contained string for substring organization matches
    #[serde(default = "default_min_substring_len")]
    pub min_substring_len: usize,
    #[serde(default)]
    pub similarity: SimilarityKind,
}

fn default_fuzzy_threshold() -> f64 {
    0.85
}

fn default_min_substring_len() -> usize {
    5
}

impl Default for OverrideConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            min_substring_len: default_min_substring_len(),
            similarity: SimilarityKind::default(),
        }
    }
}

/// Engine rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ordered rule-sets, highest priority first
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierRuleSet>,

    /// Membership role qualifies when it matches any of these
    #[serde(default = "default_membership_terms")]
    pub membership_terms: PatternSet,

    /// Filled into rows without a membership role column or value
    #[serde(default = "default_membership_role")]
    pub default_membership_role: String,

    /// Tier index (0-based) for inclusion-list contacts whose title matches
    /// no tier pattern
    #[serde(default = "default_forced_fallback_tier")]
    pub forced_inclusion_fallback_tier: usize,

    #[serde(default)]
    pub rescue: RescueConfig,

    #[serde(default)]
    pub overrides: OverrideConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            membership_terms: default_membership_terms(),
            default_membership_role: default_membership_role(),
            forced_inclusion_fallback_tier: default_forced_fallback_tier(),
            rescue: RescueConfig::default(),
            overrides: OverrideConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Structural checks plus a full pattern compile
    ///
    /// Malformed patterns surface as [`EngineError::InvalidPattern`] naming
    /// the rule-set and pattern.
    pub fn validate(&self) -> EngineResult<()> {
        if self.tiers.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one tier rule-set is required".to_string(),
            ));
        }

        for (i, tier) in self.tiers.iter().enumerate() {
            if tier.name.trim().is_empty() {
                return Err(EngineError::InvalidConfig(format!("tier {} has no name", i + 1)));
            }
            if self.tiers[..i].iter().any(|t| t.name == tier.name) {
                return Err(EngineError::InvalidConfig(format!(
                    "duplicate tier name '{}'",
                    tier.name
                )));
            }
            if tier.include.is_empty() {
                return Err(EngineError::InvalidConfig(format!(
                    "tier '{}' has an empty include pattern",
                    tier.name
                )));
            }
        }

        if self.tiers.iter().any(|t| t.name == self.rescue.tier_name) {
            return Err(EngineError::InvalidConfig(format!(
                "rescue tier name '{}' collides with a rule-set",
                self.rescue.tier_name
            )));
        }
        if !(0.0..=1.0).contains(&self.overrides.fuzzy_threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "fuzzy_threshold {} outside [0, 1]",
                self.overrides.fuzzy_threshold
            )));
        }

        TierClassifier::new(&self.tiers, &self.membership_terms)?;
        crate::services::rescue_engine::RescueEngine::new(&self.rescue)?;
        Ok(())
    }

    /// Fallback tier index clamped to the configured tiers
    pub fn forced_fallback_index(&self) -> usize {
        self.forced_inclusion_fallback_tier
            .min(self.tiers.len().saturating_sub(1))
    }
}

/// Resolve and load configuration
///
/// Returns built-in defaults when no file is named or found.
pub fn resolve_config(cli_arg: Option<&Path>) -> EngineResult<RosterConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR) {
        Some(path) => {
            let config: RosterConfig = load_toml_config(&path)?;
            config.engine.validate()?;
            Ok(config)
        }
        None => {
            info!("No config file found, using built-in defaults");
            Ok(RosterConfig::default())
        }
    }
}

fn default_membership_role() -> String {
    "Investment Team".to_string()
}

fn default_forced_fallback_tier() -> usize {
    1
}

fn default_membership_terms() -> PatternSet {
    PatternSet::new([
        r"\binvest",
        r"\bportfolio\b",
        r"\bresearch\b",
        r"\bdeal\b",
        r"\bprivate (equity|markets|credit)\b",
        r"\bventure\b",
        r"\bcapital markets\b",
    ])
}

/// Titles that never qualify for a pattern tier
fn support_function_exclusions() -> Vec<&'static str> {
    vec![
        r"\bassistant\b",
        r"\bintern\b",
        r"\breceptionist\b",
        r"\bsecretary\b",
        r"\bcompliance\b",
        r"\blegal\b",
        r"\bcounsel\b",
        r"\bhuman resources\b",
        r"\bhr\b",
        r"\brecruit",
        r"\baccount(ant|ing)\b",
        r"\bmarketing\b",
        r"\binvestor relations\b",
        r"\b(it|information technology)\b",
        r"\boperations\b",
    ]
}

fn default_tiers() -> Vec<TierRuleSet> {
    let weighted = |pairs: &[(&str, u32)]| -> Vec<PriorityKeyword> {
        pairs
            .iter()
            .map(|(pattern, weight)| PriorityKeyword::new(*pattern, *weight))
            .collect()
    };

    vec![
        TierRuleSet {
            name: "Tier 1".to_string(),
            include: PatternSet::new([
                r"\bchief investment officer\b",
                r"\bcio\b",
                r"\bmanaging director\b",
                r"\bmanaging partner\b",
                r"\bgeneral partner\b",
                r"\bfounding partner\b",
                r"\bfounder\b",
                r"\bpartner\b",
                r"\bprincipal\b",
                r"\bportfolio manager\b",
                r"\bhead of (investments?|private equity|alternatives)\b",
                r"\bhead of (venture|real estate|credit)\b",
                r"\binvestment director\b",
                r"\bdirector of investments\b",
                r"\bchief executive officer\b",
                r"\bceo\b",
                r"\bpresident\b",
            ]),
            exclude: PatternSet::new(
                support_function_exclusions()
                    .into_iter()
                    .chain([r"\bvice president\b", r"\bvp\b"]),
            ),
            requires_membership: false,
            priority_keywords: weighted(&[
                (r"\bchief investment officer\b|\bcio\b", 100),
                (r"\bmanaging partner\b", 90),
                (r"\bgeneral partner\b", 85),
                (r"\bmanaging director\b", 80),
                (r"\bfound(er|ing)\b", 70),
                (r"\bchief executive officer\b|\bceo\b", 65),
                (r"\bhead of\b", 60),
                (r"\bpartner\b", 50),
                (r"\bportfolio manager\b", 45),
                (r"\bprincipal\b", 40),
                (r"\bpresident\b", 35),
                (r"\bsenior\b", 10),
            ]),
            max_per_organization: 10,
        },
        TierRuleSet {
            name: "Tier 2".to_string(),
            include: PatternSet::new([
                r"\binvest",
                r"\bportfolio\b",
                r"\banalyst\b",
                r"\bassociate\b",
                r"\bvice president\b",
                r"\bvp\b",
                r"\bdirector\b",
                r"\bprivate equity\b",
                r"\bventure\b",
                r"\bresearch\b",
                r"\ballocat",
                r"\bdue diligence\b",
            ]),
            exclude: PatternSet::new(support_function_exclusions()),
            requires_membership: true,
            priority_keywords: weighted(&[
                (r"\bdirector\b", 35),
                (r"\bvice president\b|\bvp\b", 30),
                (r"\bsenior\b|\bsr\.?\b", 20),
                (r"\bassociate\b", 15),
                (r"\banalyst\b", 10),
                (r"\binvest", 5),
            ]),
            max_per_organization: 6,
        },
    ]
}
