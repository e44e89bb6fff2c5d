//! Test sends: render a stored template with sample data and deliver it to a
//! single test recipient.
//!
//! Flow: recipient check -> store lookup -> routing check -> render ->
//! address cleanup -> send -> history.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::mail::{BodyFormat, MailSender, OutgoingEmail};
use crate::render::PreviewRenderer;
use crate::routing::{
    AddressClass, RoutingField, RoutingFields, RoutingValidator, classify_routing_field,
};
use crate::store::TemplateStore;
use crate::template::{Template, TemplateId};
use crate::variables::{VariableValues, contains_token};

/// Number of test sends kept in the history by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Request to deliver one template to one test address.
#[derive(Debug, Clone)]
pub struct TestSendRequest {
    pub template_id: TemplateId,
    pub recipient: String,
    /// Values applied on top of the renderer's sample data.
    pub overrides: VariableValues,
}

impl TestSendRequest {
    pub fn new(template_id: impl Into<TemplateId>, recipient: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            recipient: recipient.into(),
            overrides: VariableValues::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestSendStatus {
    Delivered,
    Failed,
}

/// Outcome of a test send, kept in the dispatcher history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestSendRecord {
    pub id: Uuid,
    pub template_id: TemplateId,
    pub template_name: String,
    pub recipient: String,
    pub subject: String,
    pub sender: String,
    pub status: TestSendStatus,
    pub error: Option<String>,
    /// Routing entries left out because they rendered empty or unresolved.
    pub dropped: Vec<String>,
    pub sent_at: DateTime<Utc>,
}

/// Runs test sends against a store and a mail sender.
#[derive(Debug)]
pub struct Dispatcher {
    store: Arc<dyn TemplateStore>,
    sender: Arc<dyn MailSender>,
    renderer: PreviewRenderer,
    validator: RoutingValidator,
    history: Mutex<VecDeque<TestSendRecord>>,
    history_limit: usize,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn TemplateStore>, sender: Arc<dyn MailSender>) -> Self {
        Self {
            store,
            sender,
            renderer: PreviewRenderer::default(),
            validator: RoutingValidator::default(),
            history: Mutex::new(VecDeque::new()),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_renderer(mut self, renderer: PreviewRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_validator(mut self, validator: RoutingValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Keeps at most `limit` records; older ones are discarded first.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Past test sends, most recent first.
    pub fn history(&self) -> Vec<TestSendRecord> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Renders the template and delivers it to `request.recipient`.
    ///
    /// The template's own CC/BCC/Reply-To entries are kept, minus those that
    /// render empty or still hold a token. A delivery failure is recorded in
    /// the history before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidRecipient`] when the test address is not a
    ///   literal email address
    /// - [`DispatchError::Store`] when the template does not exist
    /// - [`DispatchError::NotSendable`] when routing has error-severity issues
    ///   or the From does not render to a usable address
    /// - [`DispatchError::Send`] when delivery fails
    pub async fn send_test(&self, request: TestSendRequest) -> Result<TestSendRecord, DispatchError> {
        let recipient = request.recipient.trim().to_string();
        if !matches!(
            classify_routing_field(&recipient),
            AddressClass::Literal { valid: true }
        ) {
            return Err(DispatchError::InvalidRecipient(request.recipient));
        }

        let template = self.store.get(&request.template_id).await?;
        self.check_sendable(&template)?;

        let rendered = self.renderer.render_with(&template, &request.overrides);
        self.check_rendered_from(&template, &rendered.from)?;

        let mut dropped = Vec::new();
        let cc = keep_deliverable(RoutingField::Cc, rendered.cc, &mut dropped);
        let bcc = keep_deliverable(RoutingField::Bcc, rendered.bcc, &mut dropped);
        let reply_to = keep_deliverable(RoutingField::ReplyTo, vec![rendered.reply_to], &mut dropped)
            .into_iter()
            .next();

        for entry in &dropped {
            tracing::warn!(
                template_id = %template.id(),
                entry = %entry,
                "Routing entry left out of test send"
            );
        }

        let email = OutgoingEmail {
            from: rendered.from,
            reply_to,
            to: vec![recipient.clone()],
            cc,
            bcc,
            subject: rendered.subject,
            format: BodyFormat::detect(&rendered.body),
            body: rendered.body,
            attachments: rendered.attachments,
        };

        let result = self.sender.send(&email).await;
        let record = TestSendRecord {
            id: Uuid::new_v4(),
            template_id: template.id().clone(),
            template_name: template.name().to_string(),
            recipient,
            subject: email.subject,
            sender: self.sender.name().to_string(),
            status: if result.is_ok() {
                TestSendStatus::Delivered
            } else {
                TestSendStatus::Failed
            },
            error: result.as_ref().err().map(|e| e.to_string()),
            dropped,
            sent_at: Utc::now(),
        };
        self.record(record.clone());

        match result {
            Ok(()) => {
                tracing::info!(
                    template_id = %record.template_id,
                    recipient = %record.recipient,
                    sender = %record.sender,
                    "Test email delivered"
                );
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(
                    template_id = %record.template_id,
                    recipient = %record.recipient,
                    error = %e,
                    "Test email failed"
                );
                Err(e.into())
            }
        }
    }

    /// Routing check with the renderer's default From standing in for an
    /// empty template From.
    fn check_sendable(&self, template: &Template) -> Result<(), DispatchError> {
        let mut fields = template.routing();
        if fields.from.trim().is_empty()
            && let Some(default_from) = self.renderer.default_from()
        {
            fields.from = default_from;
        }

        let report = self.validator.validate(&fields);
        if report.is_sendable() {
            return Ok(());
        }

        let reasons = report
            .errors()
            .map(|issue| issue.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Err(DispatchError::NotSendable {
            id: template.id().to_string(),
            reasons,
        })
    }

    /// The From after substitution must be a valid literal address that
    /// passes domain enforcement.
    fn check_rendered_from(&self, template: &Template, from: &str) -> Result<(), DispatchError> {
        let reason = if contains_token(from) {
            Some(format!("from '{}': unresolved variable", from.trim()))
        } else {
            let fields = RoutingFields {
                from,
                reply_to: "",
                cc: &[],
                bcc: &[],
            };
            let errors: Vec<String> = self
                .validator
                .validate(&fields)
                .errors()
                .map(|issue| format!("rendered {}", issue))
                .collect();
            (!errors.is_empty()).then(|| errors.join("; "))
        };

        match reason {
            Some(reasons) => Err(DispatchError::NotSendable {
                id: template.id().to_string(),
                reasons,
            }),
            None => Ok(()),
        }
    }

    fn record(&self, record: TestSendRecord) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push_front(record);
        history.truncate(self.history_limit);
    }
}

/// Keeps rendered entries that are non-empty and fully resolved; describes
/// the others in `dropped`.
fn keep_deliverable(
    field: RoutingField,
    entries: Vec<String>,
    dropped: &mut Vec<String>,
) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let trimmed = entry.trim();
            if trimmed.is_empty() {
                if field != RoutingField::ReplyTo {
                    dropped.push(format!("{}: empty", field));
                }
                None
            } else if contains_token(trimmed) {
                dropped.push(format!("{} '{}': unresolved", field, trimmed));
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
