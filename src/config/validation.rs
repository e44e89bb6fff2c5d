//! Address and domain validation utilities.

use regex::Regex;
use std::sync::LazyLock;

use crate::routing::{AddressClass, classify_routing_field};

/// Validates a bare domain name such as `acme.com` or `mail.acme.com`.
pub(crate) fn validate_domain(domain: &str) -> Result<(), String> {
    static DOMAIN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?i)[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
            .expect("valid regex")
    });

    if DOMAIN_REGEX.is_match(domain.trim()) {
        Ok(())
    } else {
        Err(format!(
            "invalid domain '{}': must be a hostname like mail.example.com",
            domain
        ))
    }
}

/// Validates a configured sender address: it must be a literal, plausible
/// email address (no variables).
pub(crate) fn validate_sender_address(address: &str) -> Result<(), String> {
    match classify_routing_field(address) {
        AddressClass::Literal { valid: true } => Ok(()),
        AddressClass::Empty => Err("must not be empty".to_string()),
        AddressClass::Variable { .. } | AddressClass::Mixed => {
            Err(format!("'{}' must be a literal address, not a variable", address))
        }
        AddressClass::Literal { valid: false } => {
            Err(format!("'{}' is not a valid email address", address))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_domain_valid_formats() {
        assert!(validate_domain("acme.com").is_ok());
        assert!(validate_domain("mail.acme.com").is_ok());
        assert!(validate_domain("Freight-Co.IO").is_ok());
        assert!(validate_domain(" acme.com ").is_ok());
    }

    #[test]
    fn validate_domain_invalid_formats() {
        assert!(validate_domain("acme").is_err()); // No dot
        assert!(validate_domain("ops@acme.com").is_err()); // Address, not domain
        assert!(validate_domain("-acme.com").is_err()); // Leading hyphen
        assert!(validate_domain("acme..com").is_err());
        assert!(validate_domain("").is_err());
    }

    #[test]
    fn validate_sender_address_accepts_literals_only() {
        assert!(validate_sender_address("dispatch@acme.com").is_ok());

        let err = validate_sender_address("{{DispatcherEmail}}").unwrap_err();
        assert!(err.contains("literal"));
        let err = validate_sender_address("ops@{{Domain}}").unwrap_err();
        assert!(err.contains("literal"));
        let err = validate_sender_address("dispatch").unwrap_err();
        assert!(err.contains("not a valid email"));
        assert!(validate_sender_address("  ").is_err());
    }
}
