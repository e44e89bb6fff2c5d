//! Mail sender trait definition.

use async_trait::async_trait;

use super::OutgoingEmail;
use crate::error::SendError;

/// Delivery capability for rendered emails.
///
/// Implementations must be `Send + Sync` to be shared across async tasks and
/// handle their own retry/backoff internally.
///
/// # Example
///
/// ```ignore
/// use freightmail::mail::{MailSender, OutgoingEmail};
///
/// struct Outbox;
///
/// #[async_trait]
/// impl MailSender for Outbox {
///     fn name(&self) -> &str { "outbox" }
///     fn sender_type(&self) -> &str { "outbox" }
///     async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait MailSender: Send + Sync {
    /// Instance name, used in logs and test-send records.
    fn name(&self) -> &str;

    /// Kind of sender (e.g. "smtp", "log").
    fn sender_type(&self) -> &str;

    /// Delivers `email`, returning once it was accepted or all retries failed.
    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError>;
}

impl std::fmt::Debug for dyn MailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailSender")
            .field("name", &self.name())
            .field("type", &self.sender_type())
            .finish()
    }
}
