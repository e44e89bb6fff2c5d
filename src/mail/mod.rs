//! Outgoing mail.
//!
//! [`MailSender`] is the delivery boundary. [`SmtpMailSender`] delivers over
//! SMTP with retry; [`LogMailSender`] only logs, for dry runs.

mod log;
mod smtp;
mod traits;

pub use log::LogMailSender;
pub use smtp::{EmailTransport, SmtpMailSender, SmtpTransport};
pub use traits::MailSender;

use std::time::Duration;

use serde::Serialize;

/// Body content type of an outgoing email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Text,
    Html,
}

impl BodyFormat {
    /// HTML when the trimmed body starts with a tag, plain text otherwise.
    pub fn detect(body: &str) -> Self {
        if body.trim_start().starts_with('<') {
            BodyFormat::Html
        } else {
            BodyFormat::Text
        }
    }
}

/// Fully rendered email ready for delivery.
///
/// Addresses are plain strings here; senders parse them into mailboxes and
/// report malformed ones as [`SendError::InvalidAddress`].
///
/// [`SendError::InvalidAddress`]: crate::error::SendError::InvalidAddress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub reply_to: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    pub format: BodyFormat,
    /// Names of documents referenced by the template.
    pub attachments: Vec<String>,
}

impl OutgoingEmail {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let body = body.into();
        Self {
            from: from.into(),
            reply_to: None,
            to: vec![to.into()],
            cc: Vec::new(),
            bcc: Vec::new(),
            subject: subject.into(),
            format: BodyFormat::detect(&body),
            body,
            attachments: Vec::new(),
        }
    }

    /// Number of envelope recipients (to, cc and bcc).
    pub fn recipient_count(&self) -> usize {
        self.to.len() + self.cc.len() + self.bcc.len()
    }
}

/// Exponential backoff: `base * 2^attempt`, capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let delay = base.saturating_mul(2_u32.saturating_pow(attempt));
    std::cmp::min(delay, max)
}
