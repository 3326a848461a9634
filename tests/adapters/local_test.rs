//! Local delivery client tests.

use std::sync::Arc;
use templated_mail::providers::LocalMailer;
use templated_mail::{MailError, Mailer, MemoryStorage};

const MIME: &str = "From: tony.stark@example.com\r\nTo: steve.rogers@example.com\r\nSubject: Hello, Avengers!\r\n\r\nHello!\r\n";

#[tokio::test]
async fn send_mime_returns_ok() {
    let mailer = LocalMailer::new();

    let result = mailer.send_mime("steve.rogers@example.com", MIME).await;
    assert!(result.is_ok());
    assert_eq!(mailer.provider_name(), "local");
}

#[tokio::test]
async fn stored_message_exposes_headers() {
    let mailer = LocalMailer::new();
    let delivery = mailer
        .send_mime("steve.rogers@example.com", MIME)
        .await
        .unwrap();

    let stored = mailer.last_message().unwrap();
    assert_eq!(stored.id, delivery.message_id);
    assert_eq!(stored.to, "steve.rogers@example.com");
    assert_eq!(stored.subject(), "Hello, Avengers!");
    assert_eq!(
        stored.header("from").as_deref(),
        Some("tony.stark@example.com")
    );
}

#[tokio::test]
async fn messages_are_newest_first() {
    let mailer = LocalMailer::new();
    mailer.send_mime("first@example.com", MIME).await.unwrap();
    mailer.send_mime("second@example.com", MIME).await.unwrap();

    let messages = mailer.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].to, "second@example.com");
    assert_eq!(messages[1].to, "first@example.com");
}

#[tokio::test]
async fn storage_is_shared_between_mailers() {
    let storage = MemoryStorage::shared();
    let a = LocalMailer::with_storage(Arc::clone(&storage));
    let b = LocalMailer::with_storage(Arc::clone(&storage));

    a.send_mime("a@example.com", MIME).await.unwrap();
    b.send_mime("b@example.com", MIME).await.unwrap();

    assert_eq!(storage.count(), 2);
    assert!(a.sent_to("b@example.com"));
}

#[tokio::test]
async fn simulated_failure_is_a_provider_error() {
    let mailer = LocalMailer::new();
    mailer.set_failure("mailbox full");

    let err = mailer.send_mime("a@example.com", MIME).await.unwrap_err();
    assert!(matches!(err, MailError::ProviderError { provider: "local", .. }));
    assert_eq!(mailer.message_count(), 0);
}
