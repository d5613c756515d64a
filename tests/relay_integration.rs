//! Integration tests for the send-email endpoint.
//!
//! Each test spins up an Axum server on a random port backed by a recording
//! transport, and exercises the real HTTP contract with reqwest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use mail_relay::config::DEFAULT_MAX_BODY_BYTES;
use mail_relay::error::TransportError;
use mail_relay::mail::{Envelope, MailTransport};
use mail_relay::relay::{MailRelay, relay_routes};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport stub that records envelopes and can be switched to fail.
#[derive(Default)]
struct StubTransport {
    sent: Mutex<Vec<Envelope>>,
    failing: AtomicBool,
}

impl StubTransport {
    fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().unwrap().clone()
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MailTransport for StubTransport {
    fn name(&self) -> &str {
        "stub"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(envelope.clone());
        if self.failing.load(Ordering::SeqCst) {
            Err(TransportError::Smtp("connection reset by relay".into()))
        } else {
            Ok(())
        }
    }
}

/// Start an Axum server on a random port, return (base url, transport).
async fn start_server() -> (String, Arc<StubTransport>) {
    let transport = Arc::new(StubTransport::default());
    let relay = MailRelay::new(
        Arc::clone(&transport) as Arc<dyn MailTransport>,
        "Relay <relay@example.com>".parse().unwrap(),
    );
    let app = relay_routes(relay, DEFAULT_MAX_BODY_BYTES);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), transport)
}

async fn post_json(base: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/send-email"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn send_without_attachment() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let resp = post_json(
            &base,
            json!({"recipient": "a@b.com", "subject": "Hi", "body": "Hello"}),
        )
        .await;
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert!(body["message"].is_string());

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.email.to_string(), "a@b.com");
        assert_eq!(sent[0].subject, "Hi");
        assert_eq!(sent[0].body, "Hello");
        assert!(sent[0].attachments.is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn send_with_base64_attachment() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let resp = post_json(
            &base,
            json!({
                "recipient": "a@b.com",
                "subject": "Hi",
                "body": "Hello",
                "attachment": "aGVsbG8=",
                "attachmentName": "x.csv"
            }),
        )
        .await;
        assert_eq!(resp.status(), 200);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments.len(), 1);
        assert_eq!(sent[0].attachments[0].filename, "x.csv");
        assert_eq!(sent[0].attachments[0].content, b"hello");
        assert_eq!(sent[0].attachments[0].content_type, "text/csv");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn multi_megabyte_attachment_is_accepted() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        // 2 MiB of base64 text, well above axum's stock 2 MB body cap.
        let resp = post_json(
            &base,
            json!({
                "recipient": "a@b.com",
                "subject": "Export",
                "body": "See attached",
                "attachment": "a".repeat(2 * 1024 * 1024),
                "attachmentName": "export.csv"
            }),
        )
        .await;
        assert_eq!(resp.status(), 200);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].attachments[0].content.len(), 1_572_864);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn missing_recipient_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let resp = post_json(&base, json!({"subject": "Hi", "body": "Hello"})).await;
        assert_eq!(resp.status(), 400);

        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("recipient"));
        assert!(transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn transport_failure_is_500_and_server_keeps_serving() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;
        let request = json!({"recipient": "a@b.com", "subject": "Hi", "body": "Hello"});

        transport.set_failing(true);
        let resp = post_json(&base, request.clone()).await;
        assert_eq!(resp.status(), 500);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert!(!body.to_string().contains("connection reset"));

        // The next request goes through normally.
        transport.set_failing(false);
        let resp = post_json(&base, request).await;
        assert_eq!(resp.status(), 200);

        assert_eq!(transport.sent().len(), 2);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn get_is_method_not_allowed() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let resp = reqwest::get(format!("{base}/send-email")).await.unwrap();
        assert_eq!(resp.status(), 405);
        assert!(transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_attachment_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let resp = post_json(
            &base,
            json!({
                "recipient": "a@b.com",
                "subject": "Hi",
                "body": "Hello",
                "attachment": "%%%",
                "attachmentName": "x.csv"
            }),
        )
        .await;
        assert_eq!(resp.status(), 400);
        assert!(transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn concurrent_requests_each_send_once() {
    timeout(TEST_TIMEOUT, async {
        let (base, transport) = start_server().await;

        let requests = (0..8).map(|i| {
            let base = base.clone();
            async move {
                post_json(
                    &base,
                    json!({
                        "recipient": format!("user{i}@example.com"),
                        "subject": format!("Order {i}"),
                        "body": "Hello"
                    }),
                )
                .await
                .status()
            }
        });

        for status in join_all(requests).await {
            assert_eq!(status, 200);
        }

        let mut subjects: Vec<String> = transport.sent().into_iter().map(|e| e.subject).collect();
        subjects.sort();
        assert_eq!(subjects.len(), 8);
        subjects.dedup();
        assert_eq!(subjects.len(), 8);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let (base, _transport) = start_server().await;

        let resp = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "mail-relay");
    })
    .await
    .expect("test timed out");
}
