//! String similarity strategies for fuzzy override matching
//!
//! The override resolver only sees [`SimilarityStrategy`]; swapping the
//! algorithm is a config change.

use serde::{Deserialize, Serialize};

/// Similarity ratio in `[0.0, 1.0]`, 1.0 meaning identical
pub trait SimilarityStrategy: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;

    fn name(&self) -> &'static str;
}

/// `1 - levenshtein / max_len` via strsim
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizedLevenshtein;

impl SimilarityStrategy for NormalizedLevenshtein {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b)
    }

    fn name(&self) -> &'static str {
        "normalized-levenshtein"
    }
}

/// Jaro-Winkler via strsim (favours shared prefixes)
#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinkler;

impl SimilarityStrategy for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b)
    }

    fn name(&self) -> &'static str {
        "jaro-winkler"
    }
}

/// Config selector for the similarity strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityKind {
    #[default]
    NormalizedLevenshtein,
    JaroWinkler,
}

impl SimilarityKind {
    pub fn strategy(self) -> Box<dyn SimilarityStrategy> {
        match self {
            SimilarityKind::NormalizedLevenshtein => Box::new(NormalizedLevenshtein),
            SimilarityKind::JaroWinkler => Box::new(JaroWinkler),
        }
    }
}
