//! Email template model.
//!
//! A [`Template`] pairs authored [`TemplateContent`] with bookkeeping the
//! store owns: id, status, last-modified time and the derived variable list.
//! The variable list is recomputed from subject and body on every save and is
//! never set directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::StoreError;
use crate::routing::{RoutingFields, RoutingReport, RoutingValidator};
use crate::variables::extract_variables_from;

/// Suffix appended to the name of a duplicated template.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Template category. Decides which catalog variables are offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Operational,
    Financial,
    Marketplace,
    Onboarding,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[
            Category::Operational,
            Category::Financial,
            Category::Marketplace,
            Category::Onboarding,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Financial => "financial",
            Self::Marketplace => "marketplace",
            Self::Onboarding => "onboarding",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Operational => "Operational",
            Self::Financial => "Financial",
            Self::Marketplace => "Marketplace",
            Self::Onboarding => "Onboarding",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Operational => "Load status updates, pickup and delivery notices",
            Self::Financial => "Invoices, payment reminders and settlements",
            Self::Marketplace => "Load postings and bid activity",
            Self::Onboarding => "Carrier and customer onboarding",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown template category '{}', expected one of: {}",
                    s,
                    expected_values(Self::all().iter().map(Self::as_str))
                )
            })
    }
}

/// Template lifecycle status. Transitions are unrestricted and only happen
/// on explicit request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateStatus {
    #[default]
    Draft,
    Active,
    Disabled,
}

impl TemplateStatus {
    pub fn all() -> &'static [TemplateStatus] {
        &[
            TemplateStatus::Active,
            TemplateStatus::Draft,
            TemplateStatus::Disabled,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                format!(
                    "unknown template status '{}', expected one of: {}",
                    s,
                    expected_values(Self::all().iter().map(Self::as_str))
                )
            })
    }
}

fn expected_values<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values.collect::<Vec<_>>().join(", ")
}

/// Opaque template identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Authored part of a template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContent {
    pub name: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    /// Literal address, single variable token, or empty.
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub reply_to: String,
    /// Display order is insertion order; duplicates are kept.
    #[serde(default)]
    pub cc_addresses: Vec<String>,
    #[serde(default)]
    pub bcc_addresses: Vec<String>,
    #[serde(default)]
    pub attached_documents: Vec<String>,
}

impl TemplateContent {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        category: Category,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            body: body.into(),
            category,
            ..Default::default()
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from_address = from.into();
        self
    }

    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    pub fn with_cc(mut self, address: impl Into<String>) -> Self {
        self.cc_addresses.push(address.into());
        self
    }

    pub fn with_bcc(mut self, address: impl Into<String>) -> Self {
        self.bcc_addresses.push(address.into());
        self
    }

    /// Checks that name, subject and body are non-empty.
    ///
    /// # Errors
    /// Returns a message naming every missing field.
    pub fn check_required(&self) -> Result<(), String> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("subject", &self.subject),
            ("body", &self.body),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(format!("{} must not be empty", missing.join(", ")))
        }
    }

    /// Variables referenced in subject then body.
    pub fn variables(&self) -> Vec<String> {
        extract_variables_from([self.subject.as_str(), self.body.as_str()])
    }

    pub fn routing(&self) -> RoutingFields<'_> {
        RoutingFields {
            from: &self.from_address,
            reply_to: &self.reply_to,
            cc: &self.cc_addresses,
            bcc: &self.bcc_addresses,
        }
    }
}

/// A saved template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    id: TemplateId,
    #[serde(flatten)]
    content: TemplateContent,
    status: TemplateStatus,
    last_modified: DateTime<Utc>,
    variables: Vec<String>,
}

impl Template {
    /// Creates a draft template.
    ///
    /// # Errors
    /// Returns [`StoreError::Invalid`] when a required field is empty.
    pub fn new(id: TemplateId, content: TemplateContent) -> Result<Self, StoreError> {
        content.check_required().map_err(StoreError::Invalid)?;
        let mut template = Self {
            id,
            content,
            status: TemplateStatus::Draft,
            last_modified: Utc::now(),
            variables: Vec::new(),
        };
        template.touch();
        Ok(template)
    }

    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn content(&self) -> &TemplateContent {
        &self.content
    }

    pub fn name(&self) -> &str {
        &self.content.name
    }

    pub fn subject(&self) -> &str {
        &self.content.subject
    }

    pub fn body(&self) -> &str {
        &self.content.body
    }

    pub fn category(&self) -> Category {
        self.content.category
    }

    pub fn status(&self) -> TemplateStatus {
        self.status
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Distinct variables of subject and body, subject first.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Replaces the authored content, keeping id and status.
    ///
    /// # Errors
    /// Returns [`StoreError::Invalid`] when a required field is empty; the
    /// template is left unchanged.
    pub fn update(&mut self, content: TemplateContent) -> Result<(), StoreError> {
        content.check_required().map_err(StoreError::Invalid)?;
        self.content = content;
        self.touch();
        Ok(())
    }

    pub fn set_status(&mut self, status: TemplateStatus) {
        self.status = status;
        self.touch();
    }

    /// Copy under a new id, named with [`COPY_SUFFIX`], back in draft.
    pub fn duplicate(&self, id: TemplateId) -> Template {
        let mut content = self.content.clone();
        content.name.push_str(COPY_SUFFIX);
        let mut copy = Self {
            id,
            content,
            status: TemplateStatus::Draft,
            last_modified: Utc::now(),
            variables: Vec::new(),
        };
        copy.touch();
        copy
    }

    pub fn routing(&self) -> RoutingFields<'_> {
        self.content.routing()
    }

    pub fn validate_routing(&self, validator: &RoutingValidator) -> RoutingReport {
        validator.validate(&self.routing())
    }

    fn touch(&mut self) {
        self.variables = self.content.variables();
        self.last_modified = Utc::now();
    }
}
