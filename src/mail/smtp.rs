//! SMTP mail sender.
//!
//! Delivers an [`OutgoingEmail`] as a single message over SMTP with
//! exponential backoff retry. The transport sits behind [`EmailTransport`] so
//! tests can swap in a recording mock:
//! - Production: `AsyncSmtpTransport<Tokio1Executor>` wrapped in [`SmtpTransport`]
//! - Testing: any `EmailTransport` passed to [`SmtpMailSender::with_transport`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::Instrument;

use super::{BodyFormat, MailSender, OutgoingEmail, backoff_delay};
use crate::config::{SmtpConfig, TlsMode, resolve_env_vars};
use crate::error::{ConfigError, SendError};

/// Backoff base delay for SMTP retries.
const SMTP_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Maximum backoff delay for SMTP retries.
const SMTP_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Maximum number of delivery attempts.
const SMTP_MAX_RETRIES: u32 = 3;

// =============================================================================
// EmailTransport
// =============================================================================

/// Async email transport abstraction.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Sends a built message, returning the transport error text on failure.
    async fn send_email(&self, message: Message) -> Result<(), String>;
}

/// Real SMTP transport wrapper implementing `EmailTransport`.
pub struct SmtpTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    pub fn new(transport: AsyncSmtpTransport<Tokio1Executor>) -> Self {
        Self { inner: transport }
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    async fn send_email(&self, message: Message) -> Result<(), String> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

// =============================================================================
// SmtpMailSender
// =============================================================================

/// Mail sender delivering over SMTP.
///
/// # Retry Policy
///
/// - **Connection errors** and **transient SMTP errors** (4xx): retried
/// - **Authentication errors** and **permanent SMTP errors** (550-554): not retried
pub struct SmtpMailSender {
    name: String,
    transport: Arc<dyn EmailTransport>,
    server: String,
}

impl SmtpMailSender {
    /// Builds a sender from SMTP settings, resolving `${VAR}` references in
    /// the credentials.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidSmtp`] on undefined environment variables,
    /// half-configured credentials or TLS setup failures.
    pub fn from_config(name: &str, config: &SmtpConfig) -> Result<Self, ConfigError> {
        let username = config
            .username
            .as_deref()
            .map(resolve_env_vars)
            .transpose()
            .map_err(|e| ConfigError::InvalidSmtp(format!("smtp.username: {}", e)))?;

        let password = config
            .password
            .as_ref()
            .map(|p| resolve_env_vars(p.expose()))
            .transpose()
            .map_err(|e| ConfigError::InvalidSmtp(format!("smtp.password: {}", e)))?;

        let transport = Self::build_transport(config, username, password)?;

        Ok(Self {
            name: name.to_string(),
            transport: Arc::new(SmtpTransport::new(transport)),
            server: format!("{}:{}", config.host, config.port),
        })
    }

    /// Creates a sender over a custom transport.
    pub fn with_transport(name: &str, transport: Arc<dyn EmailTransport>) -> Self {
        Self {
            name: name.to_string(),
            transport,
            server: "custom".to_string(),
        }
    }

    fn build_transport(
        config: &SmtpConfig,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ConfigError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(config.timeout));

        let builder = match config.tls {
            TlsMode::None => builder,
            TlsMode::Starttls => builder.tls(Tls::Required(Self::tls_parameters(config)?)),
            TlsMode::Tls => builder.tls(Tls::Wrapper(Self::tls_parameters(config)?)),
        };

        let builder = match (username, password) {
            (Some(u), Some(p)) => builder.credentials(Credentials::new(u, p)),
            (Some(_), None) => {
                return Err(ConfigError::InvalidSmtp(
                    "smtp.password required when smtp.username is set".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::InvalidSmtp(
                    "smtp.username required when smtp.password is set".to_string(),
                ));
            }
            (None, None) => builder,
        };

        Ok(builder.build())
    }

    fn tls_parameters(config: &SmtpConfig) -> Result<TlsParameters, ConfigError> {
        TlsParameters::builder(config.host.clone())
            .dangerous_accept_invalid_certs(!config.tls_verify)
            .build()
            .map_err(|e| ConfigError::InvalidSmtp(format!("TLS configuration error: {}", e)))
    }

    fn parse_mailbox(field: &'static str, address: &str) -> Result<Mailbox, SendError> {
        address
            .trim()
            .parse()
            .map_err(|e: lettre::address::AddressError| SendError::InvalidAddress {
                field,
                address: address.to_string(),
                message: e.to_string(),
            })
    }

    fn add_all(
        mut builder: MessageBuilder,
        field: &'static str,
        addresses: &[String],
        add: fn(MessageBuilder, Mailbox) -> MessageBuilder,
    ) -> Result<MessageBuilder, SendError> {
        for address in addresses {
            builder = add(builder, Self::parse_mailbox(field, address)?);
        }
        Ok(builder)
    }

    /// Builds the lettre message. Every address is parsed before anything is
    /// sent, so a bad CC fails the whole email up front.
    fn build_message(email: &OutgoingEmail) -> Result<Message, SendError> {
        if email.to.is_empty() {
            return Err(SendError::BuildFailed(
                "at least one recipient is required".to_string(),
            ));
        }

        let mut builder = Message::builder()
            .from(Self::parse_mailbox("from", &email.from)?)
            .subject(email.subject.as_str());

        if let Some(reply_to) = email.reply_to.as_deref()
            && !reply_to.trim().is_empty()
        {
            builder = builder.reply_to(Self::parse_mailbox("reply_to", reply_to)?);
        }

        let builder = Self::add_all(builder, "to", &email.to, MessageBuilder::to)?;
        let builder = Self::add_all(builder, "cc", &email.cc, MessageBuilder::cc)?;
        let builder = Self::add_all(builder, "bcc", &email.bcc, MessageBuilder::bcc)?;

        let content_type = match email.format {
            BodyFormat::Text => ContentType::TEXT_PLAIN,
            BodyFormat::Html => ContentType::TEXT_HTML,
        };

        builder
            .header(content_type)
            .body(email.body.clone())
            .map_err(|e| SendError::BuildFailed(e.to_string()))
    }

    /// Check if an SMTP error is permanent and should not be retried.
    ///
    /// SMTP codes only count as whole numeric segments, so digits inside an
    /// address do not match.
    fn is_permanent_error(error_str: &str) -> bool {
        let contains_smtp_code = |code: &str| {
            error_str
                .split(|c: char| !c.is_ascii_digit())
                .any(|segment| segment == code)
        };
        let lower = error_str.to_lowercase();

        lower.contains("authentication")
            || lower.contains("invalid credentials")
            || ["535", "550", "551", "552", "553", "554"]
                .into_iter()
                .any(contains_smtp_code)
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn sender_type(&self) -> &str {
        "smtp"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        let span = tracing::info_span!(
            "send_email",
            sender = %self.name,
            subject = %email.subject
        );
        self.deliver(email).instrument(span).await
    }
}

impl SmtpMailSender {
    async fn deliver(&self, email: &OutgoingEmail) -> Result<(), SendError> {
        let message = Self::build_message(email)?;
        if !email.attachments.is_empty() {
            tracing::debug!(
                attachments = ?email.attachments,
                "Attachments are referenced by name only"
            );
        }

        for attempt in 0..SMTP_MAX_RETRIES {
            match self.transport.send_email(message.clone()).await {
                Ok(()) => {
                    tracing::info!(
                        recipients = email.recipient_count(),
                        attempt = attempt,
                        "Email sent"
                    );
                    return Ok(());
                }
                Err(error_str) => {
                    if Self::is_permanent_error(&error_str) {
                        tracing::warn!(
                            error = %error_str,
                            "Permanent SMTP error, not retrying"
                        );
                        return Err(SendError::SendFailed(format!(
                            "permanent error: {}",
                            error_str
                        )));
                    }

                    tracing::debug!(
                        attempt = attempt,
                        error = %error_str,
                        "Failed to send email, retrying"
                    );

                    if attempt < SMTP_MAX_RETRIES - 1 {
                        let delay = backoff_delay(attempt, SMTP_BACKOFF_BASE, SMTP_BACKOFF_MAX);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        tracing::warn!(attempts = SMTP_MAX_RETRIES, "Giving up on email");
        Err(SendError::MaxRetriesExceeded)
    }
}

impl std::fmt::Debug for SmtpMailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Credentials never appear here.
        f.debug_struct("SmtpMailSender")
            .field("name", &self.name)
            .field("server", &self.server)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecretString;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    // ===================================================================
    // MockEmailTransport
    // ===================================================================

    /// Records sent messages and fails on demand.
    struct MockEmailTransport {
        sent_messages: Mutex<Vec<SentEmail>>,
        send_count: AtomicU32,
        fail_next_n: AtomicU32,
        error_message: Mutex<String>,
    }

    #[derive(Debug, Clone)]
    struct SentEmail {
        from: String,
        to: String,
        cc: String,
        reply_to: String,
        subject: String,
        envelope: Vec<String>,
        raw: String,
    }

    impl MockEmailTransport {
        fn new() -> Self {
            Self {
                sent_messages: Mutex::new(Vec::new()),
                send_count: AtomicU32::new(0),
                fail_next_n: AtomicU32::new(0),
                error_message: Mutex::new("mock failure".to_string()),
            }
        }

        fn fail_next(&self, count: u32, error: &str) {
            self.fail_next_n.store(count, Ordering::SeqCst);
            *self.error_message.lock().unwrap() = error.to_string();
        }

        fn send_count(&self) -> u32 {
            self.send_count.load(Ordering::SeqCst)
        }

        fn sent_emails(&self) -> Vec<SentEmail> {
            self.sent_messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmailTransport for MockEmailTransport {
        async fn send_email(&self, message: Message) -> Result<(), String> {
            self.send_count.fetch_add(1, Ordering::SeqCst);

            let fail_count = self.fail_next_n.load(Ordering::SeqCst);
            if fail_count > 0 {
                self.fail_next_n.fetch_sub(1, Ordering::SeqCst);
                return Err(self.error_message.lock().unwrap().clone());
            }

            let header = |name: &str| {
                message
                    .headers()
                    .get_raw(name)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            };

            let sent = SentEmail {
                from: header("From"),
                to: header("To"),
                cc: header("Cc"),
                reply_to: header("Reply-To"),
                subject: header("Subject"),
                envelope: message
                    .envelope()
                    .to()
                    .iter()
                    .map(|a| a.to_string())
                    .collect(),
                raw: String::from_utf8_lossy(&message.formatted()).to_string(),
            };
            self.sent_messages.lock().unwrap().push(sent);

            Ok(())
        }
    }

    fn make_test_config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
            tls: TlsMode::Starttls,
            tls_verify: true,
            timeout: Duration::from_secs(10),
        }
    }

    fn make_email() -> OutgoingEmail {
        OutgoingEmail::new(
            "dispatch@acme.com",
            "tester@acme.com",
            "Load LD-12345 Released",
            "Dear ABC Trucking LLC, load LD-12345 has been released.",
        )
    }

    fn make_sender(mock: Arc<MockEmailTransport>) -> SmtpMailSender {
        SmtpMailSender::with_transport("test-smtp", mock)
    }

    // ===================================================================
    // Construction
    // ===================================================================

    #[test]
    fn from_config_with_valid_config() {
        let sender = SmtpMailSender::from_config("primary", &make_test_config()).unwrap();
        assert_eq!(sender.name(), "primary");
        assert_eq!(sender.sender_type(), "smtp");
    }

    #[test]
    fn from_config_fails_with_username_without_password() {
        let mut config = make_test_config();
        config.username = Some("user".to_string());

        let err = SmtpMailSender::from_config("smtp", &config).unwrap_err();
        match err {
            ConfigError::InvalidSmtp(message) => assert!(message.contains("password required")),
            _ => panic!("Expected InvalidSmtp, got {:?}", err),
        }
    }

    #[test]
    fn from_config_fails_with_password_without_username() {
        let mut config = make_test_config();
        config.password = Some(SecretString::new("pass".to_string()));

        let err = SmtpMailSender::from_config("smtp", &config).unwrap_err();
        match err {
            ConfigError::InvalidSmtp(message) => assert!(message.contains("username required")),
            _ => panic!("Expected InvalidSmtp, got {:?}", err),
        }
    }

    #[test]
    fn from_config_resolves_env_vars_for_credentials() {
        temp_env::with_vars(
            [
                ("TEST_FM_SMTP_USER", Some("testuser")),
                ("TEST_FM_SMTP_PASS", Some("testpass")),
            ],
            || {
                let mut config = make_test_config();
                config.username = Some("${TEST_FM_SMTP_USER}".to_string());
                config.password = Some(SecretString::new("${TEST_FM_SMTP_PASS}".to_string()));

                let result = SmtpMailSender::from_config("env-creds", &config);
                assert!(result.is_ok(), "Should resolve env vars: {:?}", result.err());
            },
        );
    }

    #[test]
    fn from_config_fails_on_undefined_env_var() {
        temp_env::with_var("TEST_FM_UNDEFINED_SMTP", None::<&str>, || {
            let mut config = make_test_config();
            config.username = Some("${TEST_FM_UNDEFINED_SMTP}".to_string());
            config.password = Some(SecretString::new("somepass".to_string()));

            let err = SmtpMailSender::from_config("bad-env", &config).unwrap_err();
            let message = err.to_string();
            assert!(message.contains("smtp.username"));
            assert!(message.contains("TEST_FM_UNDEFINED_SMTP"));
        });
    }

    #[test]
    fn from_config_accepts_every_tls_mode() {
        for (tls, tls_verify) in [
            (TlsMode::None, false),
            (TlsMode::Starttls, false),
            (TlsMode::Tls, true),
        ] {
            let mut config = make_test_config();
            config.tls = tls;
            config.tls_verify = tls_verify;
            assert!(
                SmtpMailSender::from_config("tls", &config).is_ok(),
                "tls mode {:?} should build",
                tls
            );
        }
    }

    #[test]
    fn debug_output_with_credentials_does_not_leak() {
        temp_env::with_vars(
            [
                ("TEST_FM_DBG_USER", Some("secretuser")),
                ("TEST_FM_DBG_PASS", Some("secretpassword")),
            ],
            || {
                let mut config = make_test_config();
                config.username = Some("${TEST_FM_DBG_USER}".to_string());
                config.password = Some(SecretString::new("${TEST_FM_DBG_PASS}".to_string()));

                let sender = SmtpMailSender::from_config("cred-smtp", &config).unwrap();
                let debug = format!("{:?}", sender);

                assert!(debug.contains("smtp.example.com:587"));
                assert!(!debug.contains("secretuser"));
                assert!(!debug.contains("secretpassword"));
            },
        );
    }

    // ===================================================================
    // Message building
    // ===================================================================

    #[tokio::test]
    async fn sends_all_routing_headers() {
        let mock = Arc::new(MockEmailTransport::new());
        let sender = make_sender(mock.clone());

        let mut email = make_email();
        email.reply_to = Some("support@acme.com".to_string());
        email.cc = vec!["carrier@abctrucking.com".to_string()];
        email.bcc = vec!["audit@acme.com".to_string()];

        sender.send(&email).await.unwrap();

        let sent = mock.sent_emails();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].from.contains("dispatch@acme.com"));
        assert!(sent[0].to.contains("tester@acme.com"));
        assert!(sent[0].cc.contains("carrier@abctrucking.com"));
        assert!(sent[0].reply_to.contains("support@acme.com"));
        assert!(sent[0].subject.contains("LD-12345"));
        assert!(sent[0].envelope.contains(&"audit@acme.com".to_string()));
        assert_eq!(sent[0].envelope.len(), 3);
        assert!(sent[0].raw.contains("has been released"));
    }

    #[tokio::test]
    async fn html_body_sets_content_type() {
        let mock = Arc::new(MockEmailTransport::new());
        let sender = make_sender(mock.clone());

        let email = OutgoingEmail::new(
            "dispatch@acme.com",
            "tester@acme.com",
            "Released",
            "<h1>Load released</h1>",
        );
        sender.send(&email).await.unwrap();

        let raw = &mock.sent_emails()[0].raw;
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<h1>Load released</h1>"));
    }

    #[tokio::test]
    async fn invalid_addresses_fail_before_sending() {
        let mock = Arc::new(MockEmailTransport::new());
        let sender = make_sender(mock.clone());

        let mut email = make_email();
        email.cc = vec!["{{CarrierEmail}}".to_string()];

        let err = sender.send(&email).await.unwrap_err();
        match err {
            SendError::InvalidAddress { field, address, .. } => {
                assert_eq!(field, "cc");
                assert_eq!(address, "{{CarrierEmail}}");
            }
            _ => panic!("Expected InvalidAddress, got {:?}", err),
        }
        assert_eq!(mock.send_count(), 0);

        let mut email = make_email();
        email.from = String::new();
        assert!(matches!(
            sender.send(&email).await,
            Err(SendError::InvalidAddress { field: "from", .. })
        ));
    }

    #[tokio::test]
    async fn blank_reply_to_is_skipped() {
        let mock = Arc::new(MockEmailTransport::new());
        let sender = make_sender(mock.clone());

        let mut email = make_email();
        email.reply_to = Some("  ".to_string());
        sender.send(&email).await.unwrap();

        assert!(mock.sent_emails()[0].reply_to.is_empty());
    }

    #[tokio::test]
    async fn missing_recipient_is_a_build_error() {
        let mock = Arc::new(MockEmailTransport::new());
        let sender = make_sender(mock.clone());

        let mut email = make_email();
        email.to.clear();
        assert!(matches!(
            sender.send(&email).await,
            Err(SendError::BuildFailed(_))
        ));
    }

    // ===================================================================
    // Retry behavior
    // ===================================================================

    #[tokio::test(start_paused = true)]
    async fn retries_on_transient_error() {
        let mock = Arc::new(MockEmailTransport::new());
        mock.fail_next(2, "connection timeout");

        let sender = make_sender(mock.clone());
        assert!(sender.send(&make_email()).await.is_ok());
        assert_eq!(mock.send_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_after_max_retries() {
        let mock = Arc::new(MockEmailTransport::new());
        mock.fail_next(3, "451 temporary local problem");

        let sender = make_sender(mock.clone());
        let result = sender.send(&make_email()).await;

        assert!(matches!(result, Err(SendError::MaxRetriesExceeded)));
        assert_eq!(mock.send_count(), 3);
    }

    #[tokio::test]
    async fn no_retry_on_authentication_error() {
        let mock = Arc::new(MockEmailTransport::new());
        mock.fail_next(1, "535 authentication failed");

        let sender = make_sender(mock.clone());
        let result = sender.send(&make_email()).await;

        assert!(matches!(result, Err(SendError::SendFailed(_))));
        assert_eq!(mock.send_count(), 1);
    }

    #[tokio::test]
    async fn no_retry_on_550_mailbox_unavailable() {
        let mock = Arc::new(MockEmailTransport::new());
        mock.fail_next(1, "550 mailbox unavailable");

        let sender = make_sender(mock.clone());
        assert!(sender.send(&make_email()).await.is_err());
        assert_eq!(mock.send_count(), 1);
    }

    #[test]
    fn permanent_error_detection() {
        assert!(SmtpMailSender::is_permanent_error("535 5.7.8 bad credentials"));
        assert!(SmtpMailSender::is_permanent_error("Authentication rejected"));
        assert!(SmtpMailSender::is_permanent_error("554 transaction failed"));
        assert!(!SmtpMailSender::is_permanent_error("421 service not available"));
        assert!(!SmtpMailSender::is_permanent_error(
            "timeout sending to user5501@acme.com"
        ));
    }
}
