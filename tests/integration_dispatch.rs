//! End-to-end test sends: configuration, seeded store, dispatcher and a mock
//! SMTP transport.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::Message;

use freightmail::config::Config;
use freightmail::dispatch::{Dispatcher, TestSendRequest, TestSendStatus};
use freightmail::error::DispatchError;
use freightmail::mail::{EmailTransport, SmtpMailSender};
use freightmail::store::{InMemoryTemplateStore, TemplateStore};
use freightmail::template::{Category, TemplateContent, TemplateId};

fn load_fixture(name: &str) -> Config {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    Config::load(&path).unwrap()
}

/// Transport that keeps the formatted messages.
#[derive(Default)]
struct CapturingTransport {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl EmailTransport for CapturingTransport {
    async fn send_email(&self, message: Message) -> Result<(), String> {
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        self.messages.lock().unwrap().push(raw);
        Ok(())
    }
}

async fn setup(
    config: &Config,
) -> (
    Arc<InMemoryTemplateStore>,
    Arc<CapturingTransport>,
    Dispatcher,
) {
    let store = Arc::new(InMemoryTemplateStore::with_validator(
        config.routing_validator(),
    ));
    config.seed_store(store.as_ref()).await.unwrap();

    let transport = Arc::new(CapturingTransport::default());
    let sender = SmtpMailSender::with_transport("qa-relay", transport.clone());
    let dispatcher = Dispatcher::new(store.clone(), Arc::new(sender))
        .with_renderer(config.preview_renderer())
        .with_validator(config.routing_validator());
    (store, transport, dispatcher)
}

#[tokio::test]
async fn configured_template_is_rendered_and_delivered() {
    let config = load_fixture("config_valid.yaml");
    let (_store, transport, dispatcher) = setup(&config).await;

    let record = dispatcher
        .send_test(
            TestSendRequest::new("load-released", "qa@testfreight.com")
                .with_value("CarrierName", "Roadrunner Freight"),
        )
        .await
        .unwrap();

    assert_eq!(record.status, TestSendStatus::Delivered);
    assert_eq!(record.subject, "Load LD-TEST-1 Released");
    assert_eq!(record.sender, "qa-relay");

    let messages = transport.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    let raw = &messages[0];
    assert!(raw.contains("From: dispatch@testfreight.com"), "{}", raw);
    assert!(raw.contains("Reply-To: support@testfreight.com"), "{}", raw);
    assert!(raw.contains("To: qa@testfreight.com"), "{}", raw);
    assert!(raw.contains("ops@testfreight.com"), "{}", raw);
    assert!(raw.contains("Roadrunner Freight"), "{}", raw);
    assert!(raw.contains("-- Test Freight Co"), "{}", raw);
}

#[tokio::test]
async fn branding_default_from_covers_empty_template_from() {
    let config = load_fixture("config_valid.yaml");
    let (_store, transport, dispatcher) = setup(&config).await;

    dispatcher
        .send_test(TestSendRequest::new("welcome", "qa@testfreight.com"))
        .await
        .unwrap();

    let messages = transport.messages.lock().unwrap();
    assert!(
        messages[0].contains("From: notifications@testfreight.com"),
        "{}",
        messages[0]
    );
}

#[tokio::test]
async fn unresolved_cc_is_dropped_and_recorded() {
    let config = load_fixture("config_valid.yaml");
    let (store, transport, dispatcher) = setup(&config).await;

    let content = TemplateContent::new(
        "Gate Pass",
        "Gate pass {{LoadID}}",
        "See attached.",
        Category::Operational,
    )
    .with_from("dispatch@testfreight.com")
    .with_cc("{{YardContact}}");
    let template = store.create(content).await.unwrap();

    let record = dispatcher
        .send_test(TestSendRequest::new(template.id().clone(), "qa@testfreight.com"))
        .await
        .unwrap();

    assert_eq!(record.dropped, vec!["cc '{{YardContact}}': unresolved"]);
    assert!(!transport.messages.lock().unwrap()[0].contains("YardContact"));
}

#[tokio::test]
async fn unverified_from_blocks_send_when_enforced() {
    let yaml = r#"
domains:
  verified: [acme.com]
  enforce: true
templates:
  - id: outside
    name: Outside
    subject: s
    body: b
    from_address: alerts@elsewhere.com
"#;
    let config = Config::from_yaml(yaml).unwrap();
    let (store, transport, dispatcher) = setup(&config).await;

    // Saving is allowed, sending is not
    assert!(store.get(&TemplateId::new("outside")).await.is_ok());

    let err = dispatcher
        .send_test(TestSendRequest::new("outside", "qa@acme.com"))
        .await
        .unwrap_err();
    match err {
        DispatchError::NotSendable { id, reasons } => {
            assert_eq!(id, "outside");
            assert!(reasons.contains("elsewhere.com"), "{}", reasons);
        }
        e => panic!("Expected NotSendable, got {:?}", e),
    }
    assert!(transport.messages.lock().unwrap().is_empty());
    assert!(dispatcher.history().is_empty());
}
