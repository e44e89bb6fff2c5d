//! Dry-run sender that only logs.

use async_trait::async_trait;

use super::{MailSender, OutgoingEmail};
use crate::error::SendError;

/// Sender that logs each email instead of delivering it.
#[derive(Debug, Clone)]
pub struct LogMailSender {
    name: String,
}

impl LogMailSender {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for LogMailSender {
    fn default() -> Self {
        Self::new("dry-run")
    }
}

#[async_trait]
impl MailSender for LogMailSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn sender_type(&self) -> &str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        tracing::info!(
            sender = %self.name,
            from = %email.from,
            to = ?email.to,
            cc = ?email.cc,
            bcc = ?email.bcc,
            subject = %email.subject,
            format = ?email.format,
            body_len = email.body.len(),
            attachments = ?email.attachments,
            "Dry run, email not delivered"
        );
        Ok(())
    }
}
