//! freightmail - email notification templates for freight operations.
//!
//! Templates carry `{{Variable}}` tokens in subject, body and routing fields.
//! The crate extracts and substitutes those tokens, validates routing
//! addresses, offers a per-category variable catalog, and sends test emails
//! through pluggable store and mail capabilities.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mail;
pub mod render;
pub mod routing;
pub mod store;
pub mod template;
pub mod variables;

// Re-export commonly used types
pub use cli::LogFormat;
pub use dispatch::{Dispatcher, TestSendRecord, TestSendRequest, TestSendStatus};
pub use mail::{LogMailSender, MailSender, OutgoingEmail, SmtpMailSender, backoff_delay};
pub use render::{PreviewRenderer, RenderedEmail};
pub use routing::{AddressClass, RoutingReport, RoutingValidator, classify_routing_field};
pub use store::{InMemoryTemplateStore, TemplateFilter, TemplateStore};
pub use template::{Category, Template, TemplateContent, TemplateId, TemplateStatus};
pub use variables::{VariableValues, extract_variables, substitute};
