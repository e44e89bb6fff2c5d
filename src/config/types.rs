//! Core configuration types and loading.

use super::secret::SecretString;
use super::validation::{validate_domain, validate_sender_address};
use crate::catalog;
use crate::error::{ConfigError, StoreError};
use crate::render::PreviewRenderer;
use crate::routing::{RoutingValidator, email_domain};
use crate::store::TemplateStore;
use crate::template::{TemplateContent, TemplateId, TemplateStatus};
use crate::variables::VariableValues;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/freightmail/config.yaml";

/// Sample variable holding the branding company name.
const COMPANY_NAME_VARIABLE: &str = "CompanyName";

/// Main configuration structure for freightmail.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Sender identity and signature.
    #[serde(default)]
    pub branding: BrandingConfig,
    /// Verified sending domains.
    #[serde(default)]
    pub domains: DomainsConfig,
    /// SMTP relay for test sends. Without it only dry runs are possible.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    /// Preview sample data.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Templates loaded into the store at startup.
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

/// Company-wide sender identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandingConfig {
    #[serde(default)]
    pub company_name: Option<String>,
    /// From used by templates that leave their own From empty.
    #[serde(default)]
    pub default_from: Option<String>,
    #[serde(default)]
    pub default_reply_to: Option<String>,
    /// Domain mail is sent from, e.g. `mail.acme.com`. Counts as a verified
    /// sending domain.
    #[serde(default)]
    pub custom_domain: Option<String>,
    /// Appended to every rendered body.
    #[serde(default)]
    pub signature: Option<String>,
}

/// Sending-domain verification settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DomainsConfig {
    #[serde(default)]
    pub verified: Vec<String>,
    /// When set, a literal From must use a verified domain.
    #[serde(default)]
    pub enforce: bool,
}

/// SMTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_true")]
    pub tls_verify: bool,
    #[serde(default = "default_smtp_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

/// TLS mode for SMTP connections.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    None,
    #[default]
    Starttls,
    Tls,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_true() -> bool {
    true
}

/// Preview configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewConfig {
    /// Values laid over the catalog examples.
    #[serde(default)]
    pub sample_data: VariableValues,
}

/// A template entry of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    pub id: String,
    #[serde(default)]
    pub status: TemplateStatus,
    #[serde(flatten)]
    pub content: TemplateContent,
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate the whole configuration, collecting every error.
    ///
    /// Routing warnings on templates (variable-only CC entries and the like)
    /// are not errors here; they are reported when the store is seeded.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` containing all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        self.validate_branding(&mut errors);
        self.validate_domains(&mut errors);
        if let Some(smtp) = &self.smtp {
            validate_smtp(smtp, &mut errors);
        }
        self.validate_templates(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_branding(&self, errors: &mut Vec<ConfigError>) {
        let branding = &self.branding;
        let addresses = [
            ("branding.default_from", branding.default_from.as_deref()),
            ("branding.default_reply_to", branding.default_reply_to.as_deref()),
        ];
        for (field, address) in addresses {
            if let Some(address) = address
                && let Err(e) = validate_sender_address(address)
            {
                errors.push(ConfigError::ValidationError(format!("{}: {}", field, e)));
            }
        }

        if let Some(domain) = &branding.custom_domain
            && let Err(e) = validate_domain(domain)
        {
            errors.push(ConfigError::ValidationError(format!(
                "branding.custom_domain: {}",
                e
            )));
        }
    }

    fn validate_domains(&self, errors: &mut Vec<ConfigError>) {
        for domain in &self.domains.verified {
            if let Err(e) = validate_domain(domain) {
                errors.push(ConfigError::ValidationError(format!(
                    "domains.verified: {}",
                    e
                )));
            }
        }

        if !self.domains.enforce {
            return;
        }
        let sending = self.sending_domains();
        if sending.is_empty() {
            errors.push(ConfigError::ValidationError(
                "domains.enforce requires at least one verified domain or a branding.custom_domain"
                    .to_string(),
            ));
            return;
        }

        if let Some(from) = &self.branding.default_from
            && let Some(domain) = email_domain(from)
            && !sending.contains(&domain.to_ascii_lowercase())
        {
            errors.push(ConfigError::ValidationError(format!(
                "branding.default_from: domain '{}' is not in domains.verified",
                domain
            )));
        }
    }

    fn validate_templates(&self, errors: &mut Vec<ConfigError>) {
        let mut seen = HashSet::new();

        for (index, template) in self.templates.iter().enumerate() {
            let label = if template.id.trim().is_empty() {
                format!("templates[{}]", index)
            } else {
                template.id.clone()
            };

            if template.id.trim().is_empty() {
                errors.push(ConfigError::InvalidTemplate {
                    template: label.clone(),
                    message: "id must not be empty".to_string(),
                });
            } else if !seen.insert(template.id.as_str()) {
                errors.push(ConfigError::InvalidTemplate {
                    template: label.clone(),
                    message: "duplicate template id".to_string(),
                });
            }

            if let Err(message) = template.content.check_required() {
                errors.push(ConfigError::InvalidTemplate {
                    template: label,
                    message,
                });
            }
        }
    }

    /// Domains a From may use: `domains.verified` plus the branding custom
    /// domain, lowercased, without duplicates, in configuration order.
    pub fn sending_domains(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.domains
            .verified
            .iter()
            .chain(self.branding.custom_domain.iter())
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty() && seen.insert(d.clone()))
            .collect()
    }

    /// Routing validator matching `domains`: extended From-domain checks
    /// only when `enforce` is set.
    pub fn routing_validator(&self) -> RoutingValidator {
        if self.domains.enforce {
            RoutingValidator::with_allowed_domains(self.sending_domains())
        } else {
            RoutingValidator::new()
        }
    }

    /// Preview samples: catalog examples, overlaid by `preview.sample_data`,
    /// overlaid by the branding company name.
    pub fn sample_values(&self) -> VariableValues {
        let mut samples = catalog::example_values();
        samples.extend(
            self.preview
                .sample_data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(company) = &self.branding.company_name {
            samples.insert(COMPANY_NAME_VARIABLE.to_string(), company.clone());
        }
        samples
    }

    /// Renderer with sample values and the branding defaults applied.
    pub fn preview_renderer(&self) -> PreviewRenderer {
        let branding = &self.branding;
        let mut renderer = PreviewRenderer::new(self.sample_values());
        if let Some(from) = &branding.default_from {
            renderer = renderer.with_default_from(from.as_str());
        }
        if let Some(reply_to) = &branding.default_reply_to {
            renderer = renderer.with_default_reply_to(reply_to.as_str());
        }
        if let Some(signature) = &branding.signature {
            renderer = renderer.with_signature(signature.as_str());
        }
        renderer
    }

    /// Inserts every configured template into `store` with its configured
    /// status.
    ///
    /// # Errors
    /// Stops at the first [`StoreError`], e.g. a duplicate id.
    pub async fn seed_store(&self, store: &dyn TemplateStore) -> Result<usize, StoreError> {
        for entry in &self.templates {
            let id = TemplateId::new(entry.id.trim());
            store.insert(id.clone(), entry.content.clone()).await?;
            if entry.status != TemplateStatus::Draft {
                store.set_status(&id, entry.status).await?;
            }
        }
        tracing::debug!(templates = self.templates.len(), "Template store seeded");
        Ok(self.templates.len())
    }
}

fn validate_smtp(smtp: &SmtpConfig, errors: &mut Vec<ConfigError>) {
    if smtp.host.trim().is_empty() {
        errors.push(ConfigError::InvalidSmtp("host must not be empty".to_string()));
    }
    if smtp.port == 0 {
        errors.push(ConfigError::InvalidSmtp("port must not be 0".to_string()));
    }
    if smtp.timeout.is_zero() {
        errors.push(ConfigError::InvalidSmtp(
            "timeout must be greater than 0".to_string(),
        ));
    }
    match (&smtp.username, &smtp.password) {
        (Some(_), None) => errors.push(ConfigError::InvalidSmtp(
            "password required when username is set".to_string(),
        )),
        (None, Some(_)) => errors.push(ConfigError::InvalidSmtp(
            "username required when password is set".to_string(),
        )),
        _ => {}
    }
}
