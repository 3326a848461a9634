//! Logger delivery client tests.

use templated_mail::providers::LoggerMailer;
use templated_mail::Mailer;

const MIME: &str = "From: tony.stark@example.com\r\nTo: steve.rogers@example.com\r\nSubject: Hello, Avengers!\r\n\r\nHello!\r\n";

#[tokio::test]
async fn send_mime_returns_ok() {
    let mailer = LoggerMailer::new();

    let delivery = mailer
        .send_mime("steve.rogers@example.com", MIME)
        .await
        .unwrap();
    assert!(!delivery.message_id.is_empty());
    assert_eq!(mailer.provider_name(), "logger");
}

#[tokio::test]
async fn send_mime_with_full_logging_returns_ok() {
    let mailer = LoggerMailer::full();

    let delivery = mailer
        .send_mime("steve.rogers@example.com", MIME)
        .await
        .unwrap();
    assert!(!delivery.message_id.is_empty());
}
