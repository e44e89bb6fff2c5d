//! Configuration loading and validation for freightmail.
//!
//! This module handles loading the YAML configuration file, validation,
//! and resolving environment variables for SMTP credentials.

mod env;
mod secret;
mod types;
mod validation;

pub use env::resolve_env_vars;
pub use secret::SecretString;
pub use types::{
    BrandingConfig, Config, DEFAULT_CONFIG_PATH, DomainsConfig, PreviewConfig, SmtpConfig,
    TemplateConfig, TlsMode,
};
