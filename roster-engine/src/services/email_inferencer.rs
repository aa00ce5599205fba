//! Email schema inference
//!
//! **Mining:** over the full standardized set, group syntactically valid
//! emails by organization, then try to rebuild each local part from the
//! owner's first and last name under every [`LocalPartRule`]. The three most
//! frequent rules and domains become the organization's [`EmailPattern`].
//!
//! **Fill:** admitted contacts with no email get one built from the top
//! domain and the first rule that yields a local part. Existing emails are
//! never touched.
//!
//! The result is a heuristic guess, not a verified address.

use crate::models::{Contact, EmailStatus, OrganizationKey, RunSummary, StageReport};
use regex::Regex;
use roster_common::text::ascii_token;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Candidates kept per organization for rules and for domains
const TOP_CANDIDATES: usize = 3;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+'-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});

const HONORIFICS: [&str; 7] = ["mr", "mrs", "ms", "miss", "dr", "prof", "sir"];
const SUFFIXES: [&str; 10] = ["jr", "sr", "ii", "iii", "iv", "phd", "cfa", "cpa", "mba", "esq"];

/// Syntactically well-formed `local@domain.tld`
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// First and last name tokens, ASCII-folded and lower-cased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameParts {
    pub first: String,
    pub last: String,
}

/// Split a display name into first/last tokens
///
/// Handles `"Last, First"`, drops honorifics and post-nominal suffixes.
/// Returns `None` unless both a first and a last token remain.
pub fn split_name(name: &str) -> Option<NameParts> {
    let tokens: Vec<String> = natural_order(name)
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(ascii_token)
        .filter(|t| !t.is_empty())
        .filter(|t| !HONORIFICS.contains(&t.as_str()) && !SUFFIXES.contains(&t.as_str()))
        .collect();

    if tokens.len() < 2 {
        return None;
    }
    Some(NameParts {
        first: tokens[0].clone(),
        last: tokens[tokens.len() - 1].clone(),
    })
}

/// Rewrite `"Last, First"` as `"First Last"`
///
/// A comma followed only by suffixes (`"Smith, Jr."`) is left alone.
pub fn natural_order(name: &str) -> String {
    match name.split_once(',') {
        Some((last, first)) if !first.trim().is_empty() && !is_suffix_list(first) => {
            format!("{} {}", first.trim(), last.trim())
        }
        _ => name.to_string(),
    }
}

fn is_suffix_list(text: &str) -> bool {
    text.split(|c: char| c.is_whitespace() || c == ',')
        .map(ascii_token)
        .filter(|t| !t.is_empty())
        .all(|t| SUFFIXES.contains(&t.as_str()))
}

/// Local-part construction rules, in tie-break order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalPartRule {
    FirstDotLast,
    FirstUnderscoreLast,
    FirstLast,
    FirstInitialLast,
    FirstLastInitial,
    LastDotFirst,
    LastUnderscoreFirst,
    LastFirst,
    LastInitialFirst,
    LastFirstInitial,
}

impl LocalPartRule {
    pub const ALL: [LocalPartRule; 10] = [
        LocalPartRule::FirstDotLast,
        LocalPartRule::FirstUnderscoreLast,
        LocalPartRule::FirstLast,
        LocalPartRule::FirstInitialLast,
        LocalPartRule::FirstLastInitial,
        LocalPartRule::LastDotFirst,
        LocalPartRule::LastUnderscoreFirst,
        LocalPartRule::LastFirst,
        LocalPartRule::LastInitialFirst,
        LocalPartRule::LastFirstInitial,
    ];

    /// Schema id fragment (`first.last`, `flast`, ...)
    pub fn id(&self) -> &'static str {
        match self {
            LocalPartRule::FirstDotLast => "first.last",
            LocalPartRule::FirstUnderscoreLast => "first_last",
            LocalPartRule::FirstLast => "firstlast",
            LocalPartRule::FirstInitialLast => "flast",
            LocalPartRule::FirstLastInitial => "firstl",
            LocalPartRule::LastDotFirst => "last.first",
            LocalPartRule::LastUnderscoreFirst => "last_first",
            LocalPartRule::LastFirst => "lastfirst",
            LocalPartRule::LastInitialFirst => "lfirst",
            LocalPartRule::LastFirstInitial => "lastf",
        }
    }

    /// Build a local part; `None` when a required name part is empty
    pub fn build(&self, parts: &NameParts) -> Option<String> {
        let first = parts.first.as_str();
        let last = parts.last.as_str();
        if first.is_empty() || last.is_empty() {
            return None;
        }
        let initial = |s: &str| s.chars().next().map(String::from).unwrap_or_default();

        let local = match self {
            LocalPartRule::FirstDotLast => format!("{}.{}", first, last),
            LocalPartRule::FirstUnderscoreLast => format!("{}_{}", first, last),
            LocalPartRule::FirstLast => format!("{}{}", first, last),
            LocalPartRule::FirstInitialLast => format!("{}{}", initial(first), last),
            LocalPartRule::FirstLastInitial => format!("{}{}", first, initial(last)),
            LocalPartRule::LastDotFirst => format!("{}.{}", last, first),
            LocalPartRule::LastUnderscoreFirst => format!("{}_{}", last, first),
            LocalPartRule::LastFirst => format!("{}{}", last, first),
            LocalPartRule::LastInitialFirst => format!("{}{}", initial(last), first),
            LocalPartRule::LastFirstInitial => format!("{}{}", last, initial(first)),
        };
        Some(local)
    }
}

/// Inferred schema for one organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPattern {
    /// Most frequent first, at most three
    pub domains: Vec<String>,
    /// Most frequent first, at most three
    pub rules: Vec<LocalPartRule>,
}

impl EmailPattern {
    /// Synthesize an address with the top domain and first workable rule
    ///
    /// Returns the email and its schema id (`first.last@acme.com`).
    pub fn synthesize(&self, name: &str) -> Option<(String, String)> {
        let domain = self.domains.first()?;
        let parts = split_name(name)?;
        self.rules.iter().find_map(|rule| {
            rule.build(&parts)
                .filter(|local| !local.is_empty())
                .map(|local| {
                    (
                        format!("{}@{}", local, domain),
                        format!("{}@{}", rule.id(), domain),
                    )
                })
        })
    }
}

/// How a contact's email ended up after the fill phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailFill {
    Existing,
    Estimated,
    Missing,
}

/// Fill phase result
#[derive(Debug, Clone, Copy, Default)]
pub struct EmailFillOutcome {
    pub existing: usize,
    pub estimated: usize,
    pub missing: usize,
    pub organizations_with_schema: usize,
}

impl StageReport for EmailFillOutcome {
    fn report(&self, summary: &mut RunSummary) {
        summary.emails.existing = self.existing;
        summary.emails.estimated = self.estimated;
        summary.emails.missing = self.missing;
        summary.emails.organizations_with_schema = self.organizations_with_schema;
    }
}

#[derive(Default)]
struct Votes {
    rules: HashMap<LocalPartRule, usize>,
    domains: Vec<(String, usize)>,
}

/// Email schema inferencer holding the mined per-organization patterns
#[derive(Debug, Clone, Default)]
pub struct EmailSchemaInferencer {
    patterns: HashMap<OrganizationKey, EmailPattern>,
}

impl EmailSchemaInferencer {
    /// Mine patterns from every contact with a valid email
    pub fn mine(contacts: &[Contact]) -> Self {
        let mut votes: HashMap<OrganizationKey, Votes> = HashMap::new();

        for contact in contacts {
            let key = contact.organization_key();
            if key.is_empty() || !is_valid_email(&contact.email) {
                continue;
            }
            let email = contact.email.trim().to_lowercase();
            let Some((local, domain)) = email.rsplit_once('@') else {
                continue;
            };

            let entry = votes.entry(key).or_default();
            match entry.domains.iter_mut().find(|(d, _)| d == domain) {
                Some((_, count)) => *count += 1,
                None => entry.domains.push((domain.to_string(), 1)),
            }

            if let Some(parts) = split_name(&contact.name) {
                for rule in LocalPartRule::ALL {
                    if rule.build(&parts).as_deref() == Some(local) {
                        *entry.rules.entry(rule).or_default() += 1;
                    }
                }
            }
        }

        let patterns: HashMap<OrganizationKey, EmailPattern> = votes
            .into_iter()
            .filter_map(|(key, votes)| {
                let pattern = rank(votes);
                if pattern.domains.is_empty() || pattern.rules.is_empty() {
                    debug!(organization = %key, "No email rule matched any known address");
                    return None;
                }
                Some((key, pattern))
            })
            .collect();

        info!(organizations = patterns.len(), "Email schemas mined");
        Self { patterns }
    }

    pub fn pattern_for(&self, organization: &OrganizationKey) -> Option<&EmailPattern> {
        self.patterns.get(organization)
    }

    pub fn organizations_with_schema(&self) -> usize {
        self.patterns.len()
    }

    /// Fill one contact's email if it has none
    pub fn fill(&self, contact: &mut Contact) -> EmailFill {
        if !contact.email.trim().is_empty() {
            contact.email_status = EmailStatus::Existing;
            return EmailFill::Existing;
        }

        let synthesized = self
            .pattern_for(&contact.organization_key())
            .and_then(|pattern| pattern.synthesize(&contact.name));

        match synthesized {
            Some((email, schema)) => {
                debug!(
                    record_id = %contact.record_id,
                    schema = %schema,
                    "Estimated email"
                );
                contact.email = email;
                contact.email_status = EmailStatus::Estimated;
                contact.email_schema_used = Some(schema);
                EmailFill::Estimated
            }
            None => {
                contact.email_status = EmailStatus::Missing;
                EmailFill::Missing
            }
        }
    }

    /// Fill every contact, returning status counts
    pub fn fill_all<'a>(
        &self,
        contacts: impl IntoIterator<Item = &'a mut Contact>,
    ) -> EmailFillOutcome {
        let mut outcome = EmailFillOutcome {
            organizations_with_schema: self.patterns.len(),
            ..EmailFillOutcome::default()
        };
        for contact in contacts {
            match self.fill(contact) {
                EmailFill::Existing => outcome.existing += 1,
                EmailFill::Estimated => outcome.estimated += 1,
                EmailFill::Missing => outcome.missing += 1,
            }
        }
        outcome
    }
}

/// Top rules and domains by count; ties keep rule order / first-seen domain
fn rank(votes: Votes) -> EmailPattern {
    let mut rules: Vec<(LocalPartRule, usize)> = LocalPartRule::ALL
        .iter()
        .filter_map(|rule| votes.rules.get(rule).map(|count| (*rule, *count)))
        .collect();
    rules.sort_by(|a, b| b.1.cmp(&a.1));

    let mut domains = votes.domains;
    domains.sort_by(|a, b| b.1.cmp(&a.1));

    EmailPattern {
        domains: domains
            .into_iter()
            .take(TOP_CANDIDATES)
            .map(|(domain, _)| domain)
            .collect(),
        rules: rules
            .into_iter()
            .take(TOP_CANDIDATES)
            .map(|(rule, _)| rule)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, organization: &str, email: &str) -> Contact {
        Contact {
            record_id: name.to_string(),
            name: name.to_string(),
            organization: organization.to_string(),
            job_title: String::new(),
            email: email.to_string(),
            membership_role: String::new(),
            source_file: "a.json".to_string(),
            email_status: if email.is_empty() {
                EmailStatus::Missing
            } else {
                EmailStatus::Existing
            },
            email_schema_used: None,
        }
    }

    #[test]
    fn test_email_validity() {
        assert!(is_valid_email("jane.doe@acme.com"));
        assert!(is_valid_email(" o'neil@acme.co.uk "));
        assert!(!is_valid_email("jane.doe@acme"));
        assert!(!is_valid_email("jane doe@acme.com"));
        assert!(!is_valid_email("a@b@acme.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Dr. Mary Ann Jones, PhD"),
            Some(NameParts { first: "mary".into(), last: "jones".into() })
        );
        assert_eq!(
            split_name("Jones, Mary"),
            Some(NameParts { first: "mary".into(), last: "jones".into() })
        );
        assert_eq!(
            split_name("José Núñez"),
            Some(NameParts { first: "jose".into(), last: "nunez".into() })
        );
        assert_eq!(split_name("Cher"), None);
    }

    #[test]
    fn test_natural_order() {
        assert_eq!(natural_order("Doe, Jane"), "Jane Doe");
        assert_eq!(natural_order("Smith, Jr."), "Smith, Jr.");
        assert_eq!(natural_order("Jane Doe"), "Jane Doe");
        assert_eq!(natural_order("Doe,"), "Doe,");
    }

    #[test]
    fn test_rules_build() {
        let parts = NameParts { first: "mary".into(), last: "jones".into() };
        let built: Vec<String> = LocalPartRule::ALL
            .iter()
            .filter_map(|r| r.build(&parts))
            .collect();
        assert_eq!(
            built,
            vec![
                "mary.jones", "mary_jones", "maryjones", "mjones", "maryj",
                "jones.mary", "jones_mary", "jonesmary", "jmary", "jonesm",
            ]
        );
    }

    #[test]
    fn test_infers_first_dot_last() {
        let contacts = vec![
            contact("Jane Doe", "Acme Capital", "jane.doe@acme.com"),
            contact("Bob Lee", "Acme Capital", "bob.lee@acme.com"),
            contact("Mary Jones", "Acme Capital", ""),
        ];
        let inferencer = EmailSchemaInferencer::mine(&contacts);
        let pattern = inferencer.pattern_for(&OrganizationKey::new("acme capital")).unwrap();
        assert_eq!(pattern.domains, vec!["acme.com".to_string()]);
        assert_eq!(pattern.rules[0], LocalPartRule::FirstDotLast);

        let mut mary = contacts[2].clone();
        assert_eq!(inferencer.fill(&mut mary), EmailFill::Estimated);
        assert_eq!(mary.email, "mary.jones@acme.com");
        assert_eq!(mary.email_status, EmailStatus::Estimated);
        assert_eq!(mary.email_schema_used.as_deref(), Some("first.last@acme.com"));
    }

    #[test]
    fn test_majority_vote_orders_rules_and_domains() {
        let contacts = vec![
            contact("Jane Doe", "Acme", "jdoe@acme.com"),
            contact("Bob Lee", "Acme", "blee@acme.com"),
            contact("Ann Wu", "Acme", "ann.wu@acme-capital.com"),
        ];
        let inferencer = EmailSchemaInferencer::mine(&contacts);
        let pattern = inferencer.pattern_for(&OrganizationKey::new("Acme")).unwrap();
        assert_eq!(
            pattern.rules,
            vec![LocalPartRule::FirstInitialLast, LocalPartRule::FirstDotLast]
        );
        assert_eq!(pattern.domains, vec!["acme.com".to_string(), "acme-capital.com".to_string()]);
    }

    #[test]
    fn test_existing_email_never_overwritten() {
        let contacts = vec![contact("Jane Doe", "Acme", "jane.doe@acme.com")];
        let inferencer = EmailSchemaInferencer::mine(&contacts);

        let mut bob = contact("Bob Lee", "Acme", "not-an-email");
        assert_eq!(inferencer.fill(&mut bob), EmailFill::Existing);
        assert_eq!(bob.email, "not-an-email");
        assert_eq!(bob.email_status, EmailStatus::Existing);
        assert_eq!(bob.email_schema_used, None);
    }

    #[test]
    fn test_no_pattern_leaves_missing() {
        let contacts = vec![
            contact("Jane Doe", "Acme", "info@acme.com"),
            contact("Bob Lee", "Acme", ""),
            contact("Ann Wu", "Zeta", ""),
        ];
        let inferencer = EmailSchemaInferencer::mine(&contacts);
        assert_eq!(inferencer.organizations_with_schema(), 0);

        let mut bob = contacts[1].clone();
        assert_eq!(inferencer.fill(&mut bob), EmailFill::Missing);
        assert_eq!(bob.email, "");
    }

    #[test]
    fn test_single_token_name_stays_missing() {
        let contacts = vec![contact("Jane Doe", "Acme", "jane.doe@acme.com")];
        let inferencer = EmailSchemaInferencer::mine(&contacts);
        let mut cher = contact("Cher", "Acme", "");
        assert_eq!(inferencer.fill(&mut cher), EmailFill::Missing);
    }
}
