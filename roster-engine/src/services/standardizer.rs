//! Schema standardization
//!
//! Maps arbitrary source column names onto the canonical contact schema
//! using a fixed alias table. Never drops rows: every raw row produces one
//! [`Contact`].

use crate::error::{EngineError, EngineResult};
use crate::models::{Contact, EmailStatus, RawTable};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Logical fields a source column can resolve to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Name,
    FirstName,
    LastName,
    Organization,
    JobTitle,
    Email,
    Role,
    RecordId,
}

/// Accepted header spellings per field, highest priority first.
/// Headers are compared after [`normalize_header`].
const ALIASES: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Name,
        &[
            "name",
            "full name",
            "fullname",
            "contact name",
            "contact",
            "person name",
            "investor name",
        ],
    ),
    (
        CanonicalField::FirstName,
        &["first name", "firstname", "first", "given name", "forename"],
    ),
    (
        CanonicalField::LastName,
        &["last name", "lastname", "last", "surname", "family name"],
    ),
    (
        CanonicalField::Organization,
        &[
            "organization",
            "organisation",
            "company",
            "company name",
            "firm",
            "firm name",
            "institution",
            "investor",
            "account name",
            "account",
            "employer",
        ],
    ),
    (
        CanonicalField::JobTitle,
        &["job title", "jobtitle", "title", "position", "designation"],
    ),
    (
        CanonicalField::Email,
        &["email", "email address", "e mail", "work email", "business email", "mail"],
    ),
    (
        CanonicalField::Role,
        &["role", "membership role", "membership", "team", "contact type", "investment team"],
    ),
    (
        CanonicalField::RecordId,
        &["record id", "recordid", "contact id", "id"],
    ),
];

/// Single-character values that leak into name columns from boolean flags
const FLAG_VALUES: [&str; 4] = ["y", "n", "t", "f"];

/// Header projection: lower-case, `_`/`-`/`.` as spaces, collapsed whitespace
pub fn normalize_header(header: &str) -> String {
    let spaced: String = header
        .chars()
        .map(|c| match c {
            '_' | '-' | '.' => ' ',
            other => other,
        })
        .collect();
    roster_common::text::normalize_key(&spaced)
}

/// Resolved column index per canonical field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub name: Option<usize>,
    pub first_name: Option<usize>,
    pub last_name: Option<usize>,
    pub organization: Option<usize>,
    pub job_title: Option<usize>,
    pub email: Option<usize>,
    pub role: Option<usize>,
    pub record_id: Option<usize>,
}

impl ColumnMap {
    /// Resolve aliases against a header row
    ///
    /// For each field the first alias (in priority order) present in the
    /// header wins, so column order in the file does not matter.
    pub fn resolve(columns: &[String]) -> Self {
        let normalized: Vec<String> = columns.iter().map(|c| normalize_header(c)).collect();
        let mut map = ColumnMap::default();

        for (field, aliases) in ALIASES {
            let index = aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias));
            let slot = match field {
                CanonicalField::Name => &mut map.name,
                CanonicalField::FirstName => &mut map.first_name,
                CanonicalField::LastName => &mut map.last_name,
                CanonicalField::Organization => &mut map.organization,
                CanonicalField::JobTitle => &mut map.job_title,
                CanonicalField::Email => &mut map.email,
                CanonicalField::Role => &mut map.role,
                CanonicalField::RecordId => &mut map.record_id,
            };
            *slot = index;
        }

        map
    }

    /// Any column a name can be built from
    pub fn has_name_columns(&self) -> bool {
        self.name.is_some() || self.first_name.is_some() || self.last_name.is_some()
    }
}

/// Schema standardizer
pub struct Standardizer {
    default_membership_role: String,
}

impl Standardizer {
    /// Create standardizer; `default_membership_role` fills empty role cells
    pub fn new(default_membership_role: impl Into<String>) -> Self {
        Self {
            default_membership_role: default_membership_role.into(),
        }
    }

    /// Standardize one source
    ///
    /// **Algorithm:**
    /// 1. Resolve the alias table against the header
    /// 2. Reject the source if it has no name-bearing and no organization column
    /// 3. Per row: build the name (name column, else first + last, else
    ///    `Contact at {Organization}` when the source has no name columns at all)
    /// 4. Clear single-character boolean flags leaked into the name
    /// 5. Assign a run-unique record id, preferring the source's own id
    ///
    /// `used_ids` carries record ids already assigned earlier in the run.
    pub fn standardize(
        &self,
        table: &RawTable,
        used_ids: &mut HashSet<String>,
    ) -> EngineResult<Vec<Contact>> {
        let columns = ColumnMap::resolve(&table.columns);

        if !columns.has_name_columns() && columns.organization.is_none() {
            return Err(EngineError::MissingColumns {
                source_name: table.source.clone(),
            });
        }
        if table.is_empty() {
            return Err(EngineError::EmptySource {
                source_name: table.source.clone(),
            });
        }

        debug!(
            source = %table.source,
            rows = table.len(),
            columns = ?columns,
            "Resolved source columns"
        );
        if !columns.has_name_columns() {
            warn!(
                source = %table.source,
                "Source has no name columns; synthesizing placeholder names"
            );
        }

        let cell = |row: usize, column: Option<usize>| -> String {
            column
                .map(|c| table.cell(row, c).trim().to_string())
                .unwrap_or_default()
        };

        let mut contacts = Vec::with_capacity(table.len());
        for row in 0..table.len() {
            let organization = cell(row, columns.organization);
            let name = self.build_name(&columns, row, &organization, &cell);

            let email = cell(row, columns.email);
            let email_status = if email.is_empty() {
                EmailStatus::Missing
            } else {
                EmailStatus::Existing
            };

            let mut membership_role = cell(row, columns.role);
            if membership_role.is_empty() {
                membership_role = self.default_membership_role.clone();
            }

            let record_id =
                assign_record_id(&table.source, row, &cell(row, columns.record_id), used_ids);

            contacts.push(Contact {
                record_id,
                name,
                organization,
                job_title: cell(row, columns.job_title),
                email,
                membership_role,
                source_file: table.source.clone(),
                email_status,
                email_schema_used: None,
            });
        }

        Ok(contacts)
    }

    fn build_name(
        &self,
        columns: &ColumnMap,
        row: usize,
        organization: &str,
        cell: &impl Fn(usize, Option<usize>) -> String,
    ) -> String {
        let mut name = cell(row, columns.name);

        if name.is_empty() && (columns.first_name.is_some() || columns.last_name.is_some()) {
            name = [cell(row, columns.first_name), cell(row, columns.last_name)]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }

        if !columns.has_name_columns() && !organization.is_empty() {
            name = format!("Contact at {}", organization);
        }

        if is_flag_leakage(&name) {
            String::new()
        } else {
            name
        }
    }
}

fn is_flag_leakage(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.chars().count() == 1 && FLAG_VALUES.contains(&trimmed.to_lowercase().as_str())
}

/// Source id when present and unused, otherwise `{source}:{row}` (1-based)
fn assign_record_id(
    source: &str,
    row: usize,
    provided: &str,
    used_ids: &mut HashSet<String>,
) -> String {
    if !provided.is_empty() && used_ids.insert(provided.to_string()) {
        return provided.to_string();
    }

    let mut candidate = format!("{}:{}", source, row + 1);
    let mut suffix = 1;
    while !used_ids.insert(candidate.clone()) {
        suffix += 1;
        candidate = format!("{}:{}#{}", source, row + 1, suffix);
    }
    candidate
}
