//! Tier classification
//!
//! One generic routine evaluates every record against the ordered
//! rule-sets. A record matches a rule-set when:
//! - the include pattern matches the job title, and
//! - the exclude pattern does not, and
//! - the membership role qualifies, if the rule-set requires membership.
//!
//! Scores are computed per rule-set as the sum of weights of every priority
//! keyword the title matches.

use crate::error::{EngineError, EngineResult};
use crate::models::{Contact, PatternSet, PriorityKeyword, TierRuleSet};
use regex::{Regex, RegexBuilder};

/// Compiled disjunction of case-insensitive patterns
#[derive(Debug, Clone)]
pub struct CompiledPatternSet {
    regexes: Vec<Regex>,
}

impl CompiledPatternSet {
    /// Compile each pattern; `rule` names the owner in error messages
    pub fn compile(rule: &str, patterns: &PatternSet) -> EngineResult<Self> {
        let regexes = patterns
            .patterns()
            .iter()
            .map(|p| compile_pattern(rule, p))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { regexes })
    }

    pub fn is_match(&self, text: &str) -> bool {
        !text.is_empty() && self.regexes.iter().any(|r| r.is_match(text))
    }
}

/// Compiled weighted keyword list
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    keywords: Vec<(Regex, u32)>,
}

impl KeywordScorer {
    pub fn compile(rule: &str, keywords: &[PriorityKeyword]) -> EngineResult<Self> {
        let keywords = keywords
            .iter()
            .map(|k| Ok((compile_pattern(rule, &k.pattern)?, k.weight)))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { keywords })
    }

    /// Sum of weights of every matching keyword
    pub fn score(&self, text: &str) -> u32 {
        self.keywords
            .iter()
            .filter(|(regex, _)| regex.is_match(text))
            .map(|(_, weight)| *weight)
            .fold(0u32, u32::saturating_add)
    }
}

fn compile_pattern(rule: &str, pattern: &str) -> EngineResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| EngineError::InvalidPattern {
            rule: rule.to_string(),
            pattern: pattern.to_string(),
            source,
        })
}

/// One rule-set ready for matching
#[derive(Debug, Clone)]
pub struct CompiledTier {
    pub name: String,
    pub requires_membership: bool,
    pub max_per_organization: usize,
    include: CompiledPatternSet,
    exclude: CompiledPatternSet,
    scorer: KeywordScorer,
}

impl CompiledTier {
    /// Include matches and exclude does not (membership not considered)
    pub fn title_matches(&self, job_title: &str) -> bool {
        self.include.is_match(job_title) && !self.exclude.is_match(job_title)
    }

    pub fn score(&self, job_title: &str) -> u32 {
        self.scorer.score(job_title)
    }
}

/// Per-record evaluation against every rule-set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub record_id: String,
    /// Indexes of rule-sets fully matched, ascending
    pub matched_tiers: Vec<usize>,
    /// Score under each rule-set (0 where not matched)
    pub scores: Vec<u32>,
    /// First rule-set whose title pattern matched but membership failed
    pub membership_gap: Option<usize>,
}

impl Classification {
    /// Highest-priority rule-set fully matched
    pub fn first_match(&self) -> Option<usize> {
        self.matched_tiers.first().copied()
    }

    pub fn matches(&self, tier: usize) -> bool {
        self.matched_tiers.contains(&tier)
    }

    pub fn score(&self, tier: usize) -> u32 {
        self.scores.get(tier).copied().unwrap_or(0)
    }
}

/// Tier classifier over an ordered list of rule-sets
#[derive(Debug, Clone)]
pub struct TierClassifier {
    tiers: Vec<CompiledTier>,
    membership: CompiledPatternSet,
}

impl TierClassifier {
    /// Compile rule-sets in priority order
    pub fn new(rules: &[TierRuleSet], membership_terms: &PatternSet) -> EngineResult<Self> {
        let tiers = rules
            .iter()
            .map(|rule| {
                Ok(CompiledTier {
                    name: rule.name.clone(),
                    requires_membership: rule.requires_membership,
                    max_per_organization: rule.max_per_organization,
                    include: CompiledPatternSet::compile(&rule.name, &rule.include)?,
                    exclude: CompiledPatternSet::compile(&rule.name, &rule.exclude)?,
                    scorer: KeywordScorer::compile(&rule.name, &rule.priority_keywords)?,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            tiers,
            membership: CompiledPatternSet::compile("membership_terms", membership_terms)?,
        })
    }

    pub fn tiers(&self) -> &[CompiledTier] {
        &self.tiers
    }

    pub fn tier_name(&self, tier: usize) -> &str {
        self.tiers.get(tier).map(|t| t.name.as_str()).unwrap_or("")
    }

    /// Membership role contains a qualifying term
    pub fn membership_qualifies(&self, membership_role: &str) -> bool {
        self.membership.is_match(membership_role)
    }

    /// Evaluate one record against every rule-set
    pub fn classify(&self, contact: &Contact) -> Classification {
        let title = contact.job_title.trim();
        let membership_ok = self.membership_qualifies(&contact.membership_role);

        let mut matched_tiers = Vec::new();
        let mut scores = vec![0; self.tiers.len()];
        let mut membership_gap = None;

        for (index, tier) in self.tiers.iter().enumerate() {
            if !tier.title_matches(title) {
                continue;
            }
            if tier.requires_membership && !membership_ok {
                membership_gap.get_or_insert(index);
                continue;
            }
            matched_tiers.push(index);
            scores[index] = tier.score(title);
        }

        Classification {
            record_id: contact.record_id.clone(),
            matched_tiers,
            scores,
            membership_gap,
        }
    }

    pub fn classify_all(&self, contacts: &[Contact]) -> Vec<Classification> {
        contacts.iter().map(|c| self.classify(c)).collect()
    }

    /// Tier an inclusion-list contact is forced into
    ///
    /// First rule-set whose title pattern matches, ignoring membership;
    /// otherwise `fallback`.
    pub fn forced_tier(&self, contact: &Contact, fallback: usize) -> usize {
        let title = contact.job_title.trim();
        self.tiers
            .iter()
            .position(|t| t.title_matches(title))
            .unwrap_or(fallback)
    }
}
