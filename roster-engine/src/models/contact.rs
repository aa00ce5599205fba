//! Canonical contact record
//!
//! Contacts are created once by the standardizer. After that only the email
//! fields are filled in; tier placement is carried by [`TieredContact`] so the
//! standardized set stays intact for the audit trail.

use roster_common::text::normalize_key;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a contact's email came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    /// Present in the source file
    Existing,
    /// Synthesized from the organization's inferred email schema
    Estimated,
    /// Absent and no schema available
    Missing,
}

/// Canonical contact record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Stable within a run, unique across all sources
    pub record_id: String,
    pub name: String,
    pub organization: String,
    pub job_title: String,
    pub email: String,
    /// Free text used for "is this person on the relevant team" checks
    pub membership_role: String,
    /// Provenance (source name the row was read from)
    pub source_file: String,
    pub email_status: EmailStatus,
    /// Schema id (`first.last@acme.com`) when the email was estimated
    pub email_schema_used: Option<String>,
}

impl Contact {
    /// Normalized name projection used for comparisons
    pub fn name_key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Normalized organization projection used for grouping
    pub fn organization_key(&self) -> OrganizationKey {
        OrganizationKey::new(&self.organization)
    }

    /// Deduplication key: (normalized name, normalized organization)
    pub fn dedup_key(&self) -> (String, String) {
        (self.name_key(), self.organization_key().into_inner())
    }
}

/// Normalized, lower-cased, whitespace-collapsed organization name
///
/// Grouping unit for capacity limits, email-pattern mining and override
/// matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationKey(String);

impl OrganizationKey {
    pub fn new(organization: &str) -> Self {
        Self(normalize_key(organization))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for OrganizationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a contact got into its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdmissionKind {
    /// Matched the tier's rule-set and fit within organization capacity
    Pattern,
    /// Named on the contact inclusion list
    Forced,
    /// Promoted by the rescue pass
    Rescue,
}

/// A contact admitted into exactly one output tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredContact {
    pub tier: String,
    pub priority_score: u32,
    pub admission: AdmissionKind,
    #[serde(flatten)]
    pub contact: Contact,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, organization: &str) -> Contact {
        Contact {
            record_id: "r1".to_string(),
            name: name.to_string(),
            organization: organization.to_string(),
            job_title: String::new(),
            email: String::new(),
            membership_role: String::new(),
            source_file: "a.json".to_string(),
            email_status: EmailStatus::Missing,
            email_schema_used: None,
        }
    }

    #[test]
    fn test_dedup_key_ignores_case_and_spacing() {
        let a = contact("John  Smith", "Acme Capital");
        let b = contact(" john smith ", "ACME   capital");
        assert_eq!(a.dedup_key(), b.dedup_key());
        // Display values are untouched
        assert_eq!(a.name, "John  Smith");
    }

    #[test]
    fn test_organization_key_empty() {
        assert!(OrganizationKey::new("   ").is_empty());
        assert_eq!(OrganizationKey::new(" Acme\tCapital ").as_str(), "acme capital");
    }
}
