//! Mailgun delivery client tests.

use serde_json::json;
use templated_mail::providers::MailgunMailer;
use templated_mail::{AdapterConfig, MailAdapter, MailError, Mailer, SendOptions, TemplateDescriptor};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helper Functions
// ============================================================================

const MIME: &str = "From: tony.stark@example.com\r\nTo: steve.rogers@example.com\r\nSubject: Hello, Avengers!\r\n\r\nHello!\r\n";

fn success_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "message": "Queued. Thank you.",
        "id": "<20111114174239.25659.5817@samples.mailgun.org>"
    }))
}

fn expected_auth() -> String {
    format!(
        "Basic {}",
        base64::Engine::encode(
            &base64::engine::general_purpose::STANDARD,
            "api:fake-api-key"
        )
    )
}

// ============================================================================
// Basic Delivery Tests
// ============================================================================

#[tokio::test]
async fn send_mime_posts_to_messages_mime() {
    let server = MockServer::start().await;
    let mailer = MailgunMailer::new("fake-api-key", "avengers.com").host(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/avengers.com/messages.mime"))
        .and(header("Authorization", expected_auth().as_str()))
        .and(body_string_contains("steve.rogers@example.com"))
        .and(body_string_contains("message/rfc822"))
        .and(body_string_contains("Subject: Hello, Avengers!"))
        .respond_with(success_response())
        .expect(1)
        .mount(&server)
        .await;

    let delivery = mailer
        .send_mime("steve.rogers@example.com", MIME)
        .await
        .unwrap();
    assert_eq!(
        delivery.message_id,
        "<20111114174239.25659.5817@samples.mailgun.org>"
    );
    assert_eq!(
        delivery.provider_response.unwrap()["message"],
        "Queued. Thank you."
    );
}

#[tokio::test]
async fn send_mime_with_base_url_override() {
    let server = MockServer::start().await;
    let mailer = MailgunMailer::new("fake-api-key", "avengers.com").base_url(server.uri());

    Mock::given(method("POST"))
        .and(path("/avengers.com/messages.mime"))
        .respond_with(success_response())
        .expect(1)
        .mount(&server)
        .await;

    assert!(mailer.send_mime("steve.rogers@example.com", MIME).await.is_ok());
}

// ============================================================================
// Error Tests
// ============================================================================

#[tokio::test]
async fn send_mime_with_401_response() {
    let server = MockServer::start().await;
    let mailer = MailgunMailer::new("fake-api-key", "avengers.com").host(server.uri());

    Mock::given(method("POST"))
        .and(path("/v3/avengers.com/messages.mime"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = mailer
        .send_mime("steve.rogers@example.com", MIME)
        .await
        .unwrap_err();
    match err {
        MailError::ProviderError {
            provider,
            message,
            status,
        } => {
            assert_eq!(provider, "mailgun");
            assert_eq!(message, "Forbidden");
            assert_eq!(status, Some(401));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn send_mime_with_json_error_body() {
    let server = MockServer::start().await;
    let mailer = MailgunMailer::new("fake-api-key", "avengers.com").host(server.uri());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "'to' parameter is not a valid address"
        })))
        .mount(&server)
        .await;

    let err = mailer.send_mime("nobody", MIME).await.unwrap_err();
    assert!(err.to_string().contains("'to' parameter is not a valid address"));
}

// ============================================================================
// Adapter End-to-End
// ============================================================================

#[tokio::test]
async fn adapter_send_reaches_mailgun() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("alert.txt"), "Host {{host}} is down").unwrap();

    Mock::given(method("POST"))
        .and(path("/v3/avengers.com/messages.mime"))
        .and(header("Authorization", expected_auth().as_str()))
        .and(body_string_contains("Host db-1 is down"))
        .and(body_string_contains("ops@example.com"))
        .respond_with(success_response())
        .expect(1)
        .mount(&server)
        .await;

    let adapter = MailAdapter::new(
        AdapterConfig::new("fake-api-key", "avengers.com", "Avengers <noreply@avengers.com>")
            .host(server.uri())
            .template_dir(dir.path())
            .template("customAlert", TemplateDescriptor::new("Alert", "alert.txt")),
    )
    .unwrap();
    assert_eq!(adapter.provider_name(), "mailgun");

    let delivery = adapter
        .send(
            SendOptions::new("customAlert")
                .recipient("ops@example.com")
                .variable("host", "db-1"),
        )
        .await
        .unwrap();
    assert_eq!(
        delivery.message_id,
        "<20111114174239.25659.5817@samples.mailgun.org>"
    );
}
