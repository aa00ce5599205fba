//! Error types for roster-engine
//!
//! Source-level errors (`MissingColumns`, `EmptySource`) are caught by the
//! pipeline and turned into skip warnings; everything else aborts the run.

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// roster-common error (I/O, JSON, TOML, config)
    #[error(transparent)]
    Common(#[from] roster_common::Error),

    /// A rule pattern failed to compile
    #[error("Invalid pattern '{pattern}' in rule set '{rule}': {source}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Rule configuration is structurally unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Source has neither a name-bearing nor an organization-bearing column
    #[error("Source '{source_name}' has no name-bearing or organization-bearing column")]
    MissingColumns { source_name: String },

    /// Source has no rows
    #[error("Source '{source_name}' contains no records")]
    EmptySource { source_name: String },

    /// Host requested cancellation
    #[error("Run cancelled before stage '{stage}'")]
    Cancelled { stage: &'static str },
}

impl EngineError {
    /// True when the error only disqualifies one input source
    pub fn is_source_level(&self) -> bool {
        matches!(
            self,
            EngineError::MissingColumns { .. } | EngineError::EmptySource { .. }
        )
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
