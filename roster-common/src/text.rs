//! Text normalization for comparison keys
//!
//! Displayed values are never rewritten with these helpers; they produce a
//! separate projection used for grouping, dedup keys and matching.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Trim, lower-case and collapse internal whitespace runs to a single space
pub fn normalize_key(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip diacritics by NFKD decomposition (`"Müller"` → `"Muller"`)
pub fn fold_accents(value: &str) -> String {
    value.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Aggressive projection for fuzzy comparison
///
/// Folds accents, lower-cases, turns punctuation into spaces and collapses
/// whitespace, so `"O'Neil, Pat"` and `"o neil pat"` compare equal.
pub fn fuzzy_normalize(value: &str) -> String {
    let folded: String = fold_accents(value)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    normalize_key(&folded)
}

/// Keep only ASCII alphanumerics, lower-cased, after folding accents
pub fn ascii_token(value: &str) -> String {
    fold_accents(value)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
