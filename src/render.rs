//! Preview rendering of templates with sample data.
//!
//! Every text field of a template (subject, body, From, Reply-To and each
//! CC/BCC entry) goes through [`substitute`]. Variables without a value are
//! left in place and reported in [`RenderedEmail::unresolved`].
//!
//! # Example
//!
//! ```ignore
//! let renderer = PreviewRenderer::new(catalog::example_values())
//!     .with_default_from("notifications@acme.com");
//! let preview = renderer.render(&template);
//! println!("{}", preview.subject);
//! ```

use serde::Serialize;

use crate::mail::BodyFormat;
use crate::template::Template;
use crate::variables::{VariableValues, extract_variables_from, substitute};

/// Template rendered against a set of variable values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub reply_to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<String>,
    /// Variables still present in the output, first-seen order.
    pub unresolved: Vec<String>,
}

/// Renders templates with a fixed set of sample values.
#[derive(Debug, Clone, Default)]
pub struct PreviewRenderer {
    samples: VariableValues,
    default_from: Option<String>,
    default_reply_to: Option<String>,
    signature: Option<String>,
}

impl PreviewRenderer {
    pub fn new(samples: VariableValues) -> Self {
        Self {
            samples,
            ..Self::default()
        }
    }

    /// From address used when a template leaves its own From empty.
    pub fn with_default_from(mut self, from: impl Into<String>) -> Self {
        self.default_from = non_blank(from.into());
        self
    }

    /// Reply-To used when a template leaves its own Reply-To empty.
    pub fn with_default_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.default_reply_to = non_blank(reply_to.into());
        self
    }

    /// Text appended to every body. It may contain variables.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = non_blank(signature.into());
        self
    }

    pub fn samples(&self) -> &VariableValues {
        &self.samples
    }

    pub fn default_from(&self) -> Option<&str> {
        self.default_from.as_deref()
    }

    pub fn render(&self, template: &Template) -> RenderedEmail {
        self.render_with(template, &VariableValues::new())
    }

    /// Renders with `overrides` taking precedence over the sample values.
    pub fn render_with(&self, template: &Template, overrides: &VariableValues) -> RenderedEmail {
        tracing::trace!(template_id = %template.id(), "Starting preview render");

        let mut values = self.samples.clone();
        values.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

        let content = template.content();
        let from_source = or_default(&content.from_address, self.default_from.as_deref());
        let reply_to_source = or_default(&content.reply_to, self.default_reply_to.as_deref());
        let body_source = self.with_signature_appended(&content.body);

        let sources = [
            content.subject.as_str(),
            body_source.as_str(),
            from_source,
            reply_to_source,
        ];
        let unresolved: Vec<String> = extract_variables_from(
            sources
                .into_iter()
                .chain(content.cc_addresses.iter().map(String::as_str))
                .chain(content.bcc_addresses.iter().map(String::as_str)),
        )
        .into_iter()
        .filter(|name| !values.contains_key(name))
        .collect();

        let rendered = RenderedEmail {
            subject: substitute(&content.subject, &values),
            body: substitute(&body_source, &values),
            from: substitute(from_source, &values),
            reply_to: substitute(reply_to_source, &values),
            cc: content
                .cc_addresses
                .iter()
                .map(|a| substitute(a, &values))
                .collect(),
            bcc: content
                .bcc_addresses
                .iter()
                .map(|a| substitute(a, &values))
                .collect(),
            attachments: content.attached_documents.clone(),
            unresolved,
        };

        tracing::trace!(
            subject_len = rendered.subject.len(),
            body_len = rendered.body.len(),
            unresolved = rendered.unresolved.len(),
            "Preview rendered"
        );
        rendered
    }

    fn with_signature_appended(&self, body: &str) -> String {
        let Some(signature) = self.signature.as_deref() else {
            return body.to_string();
        };
        match BodyFormat::detect(body) {
            BodyFormat::Html => format!("{}<br><br>{}", body, signature.replace('\n', "<br>")),
            BodyFormat::Text => format!("{}\n\n{}", body.trim_end(), signature),
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// `value`, or `fallback` when `value` is blank.
fn or_default<'a>(value: &'a str, fallback: Option<&'a str>) -> &'a str {
    if value.trim().is_empty() {
        fallback.unwrap_or(value)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Category, TemplateContent, TemplateId};

    fn values(pairs: &[(&str, &str)]) -> VariableValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn status_update() -> Template {
        let content = TemplateContent::new(
            "Load Status Update",
            "Load {{LoadID}} Status Updated: {{LoadStatus}}",
            "Dear {{CarrierName}}, the status of load {{LoadID}} has been updated to {{LoadStatus}}.",
            Category::Operational,
        )
        .with_from("dispatch@company.com")
        .with_cc("{{CarrierEmail}}")
        .with_bcc("audit@company.com");
        Template::new(TemplateId::new("status-update"), content).unwrap()
    }

    #[test]
    fn render_substitutes_all_fields() {
        let renderer = PreviewRenderer::new(values(&[
            ("LoadID", "LD-12345"),
            ("LoadStatus", "Dispatched"),
            ("CarrierName", "ABC Trucking LLC"),
            ("CarrierEmail", "carrier@abctrucking.com"),
        ]));

        let preview = renderer.render(&status_update());

        assert_eq!(preview.subject, "Load LD-12345 Status Updated: Dispatched");
        assert_eq!(
            preview.body,
            "Dear ABC Trucking LLC, the status of load LD-12345 has been updated to Dispatched."
        );
        assert_eq!(preview.from, "dispatch@company.com");
        assert_eq!(preview.cc, vec!["carrier@abctrucking.com"]);
        assert_eq!(preview.bcc, vec!["audit@company.com"]);
        assert!(preview.unresolved.is_empty());
    }

    #[test]
    fn missing_samples_stay_visible() {
        let renderer = PreviewRenderer::new(values(&[("LoadID", "LD-1")]));
        let preview = renderer.render(&status_update());

        assert_eq!(preview.subject, "Load LD-1 Status Updated: {{LoadStatus}}");
        assert_eq!(preview.cc, vec!["{{CarrierEmail}}"]);
        assert_eq!(
            preview.unresolved,
            vec!["LoadStatus", "CarrierName", "CarrierEmail"]
        );
    }

    #[test]
    fn overrides_win_over_samples() {
        let renderer = PreviewRenderer::new(values(&[("LoadID", "LD-1")]));
        let preview = renderer.render_with(&status_update(), &values(&[("LoadID", "LD-999")]));
        assert!(preview.subject.starts_with("Load LD-999 "));
    }

    #[test]
    fn default_from_used_when_template_has_none() {
        let content = TemplateContent::new("Welcome", "Hi", "Body", Category::Onboarding);
        let template = Template::new(TemplateId::generate(), content).unwrap();

        let renderer = PreviewRenderer::default().with_default_from("notifications@acme.com");
        assert_eq!(renderer.render(&template).from, "notifications@acme.com");

        let renderer = PreviewRenderer::default();
        assert_eq!(renderer.render(&template).from, "");
    }

    #[test]
    fn blank_default_from_is_ignored() {
        let renderer = PreviewRenderer::default().with_default_from("  ");
        assert!(renderer.default_from().is_none());
    }

    #[test]
    fn default_reply_to_fills_blank_template_reply_to() {
        let renderer = PreviewRenderer::default().with_default_reply_to("support@acme.com");
        assert_eq!(renderer.render(&status_update()).reply_to, "support@acme.com");

        let mut content = status_update().content().clone();
        content.reply_to = "ops@acme.com".to_string();
        let template = Template::new(TemplateId::generate(), content).unwrap();
        assert_eq!(renderer.render(&template).reply_to, "ops@acme.com");
    }

    #[test]
    fn signature_is_appended_and_substituted() {
        let renderer = PreviewRenderer::new(values(&[("CompanyName", "Acme Logistics")]))
            .with_signature("Best regards,\n{{CompanyName}}");

        let preview = renderer.render(&status_update());
        assert!(
            preview
                .body
                .ends_with("{{LoadStatus}}.\n\nBest regards,\nAcme Logistics")
        );

        let content = TemplateContent::new("Html", "s", "<p>Hello</p>", Category::Operational);
        let template = Template::new(TemplateId::generate(), content).unwrap();
        assert_eq!(
            renderer.render(&template).body,
            "<p>Hello</p><br><br>Best regards,<br>Acme Logistics"
        );
    }

    #[test]
    fn signature_variables_count_as_unresolved() {
        let renderer = PreviewRenderer::default().with_signature("{{CompanyName}}");
        let content = TemplateContent::new("Plain", "s", "b", Category::Operational);
        let template = Template::new(TemplateId::generate(), content).unwrap();
        assert_eq!(renderer.render(&template).unresolved, vec!["CompanyName"]);
    }

    #[test]
    fn attachments_are_listed() {
        let mut content = status_update().content().clone();
        content.attached_documents = vec!["rate-confirmation.pdf".to_string()];
        let template = Template::new(TemplateId::generate(), content).unwrap();

        let preview = PreviewRenderer::default().render(&template);
        assert_eq!(preview.attachments, vec!["rate-confirmation.pdf"]);
    }
}
