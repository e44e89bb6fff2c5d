//! Classification and validation of routing fields (From, Reply-To, CC, BCC).
//!
//! A routing value is either empty, a literal address, a single variable
//! token, or a mix of literal text and tokens. Validation never blocks a save;
//! it produces a [`RoutingReport`] the caller renders as it sees fit. Only
//! error-severity issues make a template unsendable.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::variables::{as_single_token, contains_token};

/// Which routing field a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingField {
    From,
    ReplyTo,
    Cc,
    Bcc,
}

impl RoutingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::From => "from",
            Self::ReplyTo => "reply_to",
            Self::Cc => "cc",
            Self::Bcc => "bcc",
        }
    }
}

impl fmt::Display for RoutingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a single routing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum AddressClass {
    /// Zero length after trimming.
    Empty,
    /// No token. `valid` is the minimal plausibility check (an `@` and a `.`
    /// in the domain part), not RFC 5322.
    Literal { valid: bool },
    /// The whole trimmed value is exactly one token.
    Variable { name: String },
    /// Literal text and at least one token, e.g. `ops@{{Domain}}`.
    Mixed,
}

impl AddressClass {
    /// A variable-only value resolves to nothing when the variable has no value.
    pub fn may_be_empty(&self) -> bool {
        matches!(self, Self::Variable { .. })
    }
}

/// Classifies a From, Reply-To, or single CC/BCC value.
pub fn classify_routing_field(value: &str) -> AddressClass {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return AddressClass::Empty;
    }
    if let Some(name) = as_single_token(trimmed) {
        return AddressClass::Variable {
            name: name.to_string(),
        };
    }
    if contains_token(trimmed) {
        return AddressClass::Mixed;
    }
    AddressClass::Literal {
        valid: is_plausible_email(trimmed),
    }
}

/// Contains an `@` and the part after the last `@` contains a `.`.
pub fn is_plausible_email(value: &str) -> bool {
    email_domain(value).is_some_and(|domain| domain.contains('.'))
}

/// Domain part of an address (after the last `@`).
pub fn email_domain(value: &str) -> Option<&str> {
    value.trim().rsplit_once('@').map(|(_, domain)| domain)
}

/// How serious a routing issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory; the template can still be saved and sent.
    Warning,
    /// The template can be saved but not sent.
    Error,
}

/// What is wrong with a routing value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    MissingFrom,
    InvalidAddress,
    MayBeEmpty { variable: String },
    Mixed,
    UnverifiedDomain { domain: String },
}

/// One finding of [`RoutingValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingIssue {
    pub field: RoutingField,
    /// Position in the CC/BCC list, `None` for From and Reply-To.
    pub index: Option<usize>,
    pub value: String,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl RoutingIssue {
    pub fn severity(&self) -> Severity {
        match self.kind {
            IssueKind::MissingFrom
            | IssueKind::InvalidAddress
            | IssueKind::UnverifiedDomain { .. } => Severity::Error,
            IssueKind::MayBeEmpty { .. } | IssueKind::Mixed => Severity::Warning,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            IssueKind::MissingFrom => "from address must not be empty".to_string(),
            IssueKind::InvalidAddress => "not a valid email address".to_string(),
            IssueKind::MayBeEmpty { variable } => {
                format!("variable '{}' may be empty during send", variable)
            }
            IssueKind::Mixed => {
                "mixes literal text with variables, check the rendered address".to_string()
            }
            IssueKind::UnverifiedDomain { domain } => {
                format!("domain '{}' is not a verified sending domain", domain)
            }
        }
    }
}

impl fmt::Display for RoutingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.field, i)?,
            None => write!(f, "{}", self.field)?,
        }
        if self.value.is_empty() {
            write!(f, ": {}", self.message())
        } else {
            write!(f, " '{}': {}", self.value, self.message())
        }
    }
}

/// Borrowed view of a template's routing fields.
#[derive(Debug, Clone, Copy)]
pub struct RoutingFields<'a> {
    pub from: &'a str,
    pub reply_to: &'a str,
    pub cc: &'a [String],
    pub bcc: &'a [String],
}

/// Result of validating a set of routing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingReport {
    issues: Vec<RoutingIssue>,
}

impl RoutingReport {
    pub fn issues(&self) -> &[RoutingIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &RoutingIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RoutingIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity() == Severity::Warning)
    }

    /// No error-severity issue.
    pub fn is_sendable(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validates routing fields, optionally restricting literal From addresses
/// to a set of verified sending domains.
#[derive(Debug, Clone, Default)]
pub struct RoutingValidator {
    allowed_domains: Option<HashSet<String>>,
}

impl RoutingValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the extended mode: a literal From must use one of `domains`
    /// (compared case-insensitively).
    pub fn with_allowed_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allowed_domains: Some(
                domains
                    .into_iter()
                    .map(|d| d.as_ref().trim().to_ascii_lowercase())
                    .collect(),
            ),
        }
    }

    pub fn enforces_domains(&self) -> bool {
        self.allowed_domains.is_some()
    }

    /// Validates every routing field. Called on each render of the field
    /// list; nothing is cached between calls.
    pub fn validate(&self, fields: &RoutingFields<'_>) -> RoutingReport {
        let mut issues = Vec::new();

        self.check(RoutingField::From, None, fields.from, &mut issues);
        self.check(RoutingField::ReplyTo, None, fields.reply_to, &mut issues);
        for (i, entry) in fields.cc.iter().enumerate() {
            self.check(RoutingField::Cc, Some(i), entry, &mut issues);
        }
        for (i, entry) in fields.bcc.iter().enumerate() {
            self.check(RoutingField::Bcc, Some(i), entry, &mut issues);
        }

        RoutingReport { issues }
    }

    fn check(
        &self,
        field: RoutingField,
        index: Option<usize>,
        value: &str,
        issues: &mut Vec<RoutingIssue>,
    ) {
        let issue = |kind| RoutingIssue {
            field,
            index,
            value: value.trim().to_string(),
            kind,
        };

        match classify_routing_field(value) {
            AddressClass::Empty => {
                if field == RoutingField::From {
                    issues.push(issue(IssueKind::MissingFrom));
                }
            }
            AddressClass::Literal { valid: false } => {
                issues.push(issue(IssueKind::InvalidAddress));
            }
            AddressClass::Literal { valid: true } => {
                if field == RoutingField::From
                    && let Some(allowed) = &self.allowed_domains
                    && let Some(domain) = email_domain(value)
                    && !allowed.contains(&domain.to_ascii_lowercase())
                {
                    issues.push(issue(IssueKind::UnverifiedDomain {
                        domain: domain.to_string(),
                    }));
                }
            }
            AddressClass::Variable { name } => {
                issues.push(issue(IssueKind::MayBeEmpty { variable: name }));
            }
            AddressClass::Mixed => {
                issues.push(issue(IssueKind::Mixed));
            }
        }
    }
}
