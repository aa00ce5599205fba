//! Tier rule-sets as configuration data
//!
//! Rule-sets are plain values deserialized from TOML. The classifier compiles
//! them once per run; adding a tier or editing keyword lists never touches
//! the matching code.

use serde::{Deserialize, Serialize};

/// Disjunction of case-insensitive regex patterns
///
/// An empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternSet(pub Vec<String>);

impl PatternSet {
    pub fn new<S: Into<String>>(patterns: impl IntoIterator<Item = S>) -> Self {
        Self(patterns.into_iter().map(Into::into).collect())
    }

    pub fn patterns(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Weighted keyword contributing to a priority score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityKeyword {
    pub pattern: String,
    pub weight: u32,
}

impl PriorityKeyword {
    pub fn new(pattern: impl Into<String>, weight: u32) -> Self {
        Self {
            pattern: pattern.into(),
            weight,
        }
    }
}

/// One tier's classification rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRuleSet {
    /// Tier label carried into the output ("Tier 1")
    pub name: String,
    /// Job title must match at least one of these
    pub include: PatternSet,
    /// Job title must match none of these
    #[serde(default)]
    pub exclude: PatternSet,
    /// Membership role must match the engine's membership terms
    #[serde(default)]
    pub requires_membership: bool,
    /// Summed over every keyword the job title matches
    #[serde(default)]
    pub priority_keywords: Vec<PriorityKeyword>,
    pub max_per_organization: usize,
}

/// Rescue pass settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescueConfig {
    /// Label of the overflow tier rescued contacts land in
    #[serde(default = "default_rescue_tier")]
    pub tier_name: String,
    /// Seniority keywords; a contact needs a positive score to be rescued
    #[serde(default = "default_rescue_keywords")]
    pub keywords: Vec<PriorityKeyword>,
    /// Contacts admitted per otherwise-unrepresented organization
    #[serde(default = "default_rescue_max")]
    pub max_per_organization: usize,
}

fn default_rescue_tier() -> String {
    "Rescue".to_string()
}

fn default_rescue_max() -> usize {
    2
}

fn default_rescue_keywords() -> Vec<PriorityKeyword> {
    [
        (r"\bchief\b", 50),
        (r"\bc[eiof]o\b", 50),
        (r"\bpresident\b", 45),
        (r"\bfounder\b", 45),
        (r"\bpartner\b", 40),
        (r"\bmanaging\b", 40),
        (r"\bhead\b", 35),
        (r"\bdirector\b", 30),
        (r"\bvice president\b|\bvp\b", 25),
        (r"\bprincipal\b", 25),
        (r"\bsenior\b|\bsr\.?\b", 15),
        (r"\bmanager\b", 10),
        (r"\bofficer\b", 10),
        (r"\binvestment\b|\bportfolio\b", 10),
    ]
    .into_iter()
    .map(|(p, w)| PriorityKeyword::new(p, w))
    .collect()
}

impl Default for RescueConfig {
    fn default() -> Self {
        Self {
            tier_name: default_rescue_tier(),
            keywords: default_rescue_keywords(),
            max_per_organization: default_rescue_max(),
        }
    }
}
