//! Centralized error types for freightmail using thiserror.
//!
//! Variable extraction, substitution and routing classification are total
//! and never fail; only the collaborators around them (config loading, the
//! template store, mail transport) have error types.

use thiserror::Error;

/// Errors related to configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load config file: {0}")]
    LoadError(String),
    #[error("invalid configuration: {0}")]
    ValidationError(String),
    #[error("invalid template '{template}': {message}")]
    InvalidTemplate { template: String, message: String },
    #[error("invalid smtp settings: {0}")]
    InvalidSmtp(String),
}

/// Errors returned by a template store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("template '{id}' not found")]
    NotFound { id: String },
    #[error("template '{id}' already exists")]
    AlreadyExists { id: String },
    #[error("invalid template: {0}")]
    Invalid(String),
}

/// Errors related to building and sending an email.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid {field} address '{address}': {message}")]
    InvalidAddress {
        field: &'static str,
        address: String,
        message: String,
    },
    #[error("failed to build email: {0}")]
    BuildFailed(String),
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("max retries exceeded")]
    MaxRetriesExceeded,
}

/// Errors related to a test send.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("send error: {0}")]
    Send(#[from] SendError),
    #[error("invalid test recipient '{0}'")]
    InvalidRecipient(String),
    #[error("template '{id}' cannot be sent: {reasons}")]
    NotSendable { id: String, reasons: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::LoadError("file not found".to_string());
        assert_eq!(
            err.to_string(),
            "failed to load config file: file not found"
        );

        let err = ConfigError::ValidationError("missing field".to_string());
        assert_eq!(err.to_string(), "invalid configuration: missing field");
    }

    #[test]
    fn config_error_invalid_template_display() {
        let err = ConfigError::InvalidTemplate {
            template: "load-released".to_string(),
            message: "name must not be empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid template 'load-released': name must not be empty"
        );
    }

    #[test]
    fn store_error_display() {
        let err = StoreError::NotFound {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "template 'abc' not found");

        let err = StoreError::AlreadyExists {
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "template 'abc' already exists");
    }

    #[test]
    fn send_error_display() {
        let err = SendError::InvalidAddress {
            field: "from",
            address: "nope".to_string(),
            message: "missing domain".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid from address 'nope': missing domain"
        );
        assert_eq!(
            SendError::MaxRetriesExceeded.to_string(),
            "max retries exceeded"
        );
    }

    #[test]
    fn dispatch_error_wraps_sources() {
        let err = DispatchError::from(StoreError::NotFound {
            id: "x".to_string(),
        });
        assert_eq!(err.to_string(), "store error: template 'x' not found");

        let err = DispatchError::from(SendError::SendFailed("timeout".to_string()));
        assert_eq!(
            err.to_string(),
            "send error: failed to send email: timeout"
        );

        let err = DispatchError::NotSendable {
            id: "x".to_string(),
            reasons: "from address is empty".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "template 'x' cannot be sent: from address is empty"
        );
    }
}
