//! Secret string wrapper that never appears in logs.

use serde::Deserialize;

/// Wrapper for secrets such as SMTP passwords.
///
/// The `Debug` and `Display` implementations always show `[REDACTED]`
/// instead of the actual value.
///
/// # Example
///
/// ```
/// use freightmail::config::SecretString;
///
/// let secret = SecretString::new("smtp-password".to_string());
/// assert_eq!(format!("{:?}", secret), "[REDACTED]");
/// assert_eq!(secret.expose(), "smtp-password");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: String) -> Self {
        SecretString(s)
    }

    /// Exposes the underlying secret value. Never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_string_redacts_in_debug_and_display() {
        let secret = SecretString::new("hunter2-smtp".to_string());

        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose(), "hunter2-smtp");
    }

    #[test]
    fn secret_string_redacted_inside_containers() {
        let secret = SecretString::new("s3cr3t-relay-pass".to_string());

        let representations = [
            format!("{:?}", Some(&secret)),
            format!("{:?}", vec![&secret]),
        ];
        for repr in &representations {
            assert!(
                !repr.contains("s3cr3t"),
                "secret leaked in output: {}",
                repr
            );
        }
    }

    #[test]
    fn secret_string_deserializes_from_yaml() {
        let secret: SecretString = serde_yaml::from_str("\"${SMTP_PASSWORD}\"").unwrap();
        assert_eq!(secret.expose(), "${SMTP_PASSWORD}");
    }
}
