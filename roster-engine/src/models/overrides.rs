//! Externally supplied override lists
//!
//! Loaded once per run and never modified while the pipeline runs.

use serde::{Deserialize, Serialize};

/// Contact-level removal entry
///
/// With an email the entry matches by exact email only; otherwise the name
/// (and organization, when given) are fuzzy matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRemoval {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub organization: String,
}

impl ContactRemoval {
    pub fn has_email(&self) -> bool {
        !self.email.trim().is_empty()
    }

    /// Display form used in audit reasons
    pub fn label(&self) -> String {
        if self.has_email() {
            self.email.trim().to_string()
        } else if self.organization.trim().is_empty() {
            self.name.trim().to_string()
        } else {
            format!("{} @ {}", self.name.trim(), self.organization.trim())
        }
    }
}

/// (Full name, organization) pair used by the exclude and inclusion lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRef {
    pub name: String,
    #[serde(default)]
    pub organization: String,
}

impl ContactRef {
    pub fn new(name: impl Into<String>, organization: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            organization: organization.into(),
        }
    }

    pub fn label(&self) -> String {
        format!("{} @ {}", self.name.trim(), self.organization.trim())
    }
}

/// All override lists for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideLists {
    /// Organizations whose contacts are always dropped
    #[serde(default)]
    pub organization_exclude: Vec<String>,
    /// When non-empty, only these organizations are kept
    #[serde(default)]
    pub organization_include: Vec<String>,
    #[serde(default)]
    pub contact_remove: Vec<ContactRemoval>,
    /// Exact (name, organization) exclusions
    #[serde(default)]
    pub contact_exclude: Vec<ContactRef>,
    /// Contacts forced into the output regardless of title patterns
    #[serde(default)]
    pub contact_include: Vec<ContactRef>,
}

impl OverrideLists {
    pub fn is_empty(&self) -> bool {
        self.organization_exclude.is_empty()
            && self.organization_include.is_empty()
            && self.contact_remove.is_empty()
            && self.contact_exclude.is_empty()
            && self.contact_include.is_empty()
    }
}
