//! Testing utilities and assertion helpers.
//!
//! Assertions run against the MIME documents captured by a [`LocalMailer`].
//! Headers and bodies are decoded first, so encoded-word subjects and
//! quoted-printable or base64 bodies compare as the text that was rendered.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use templated_mail::providers::LocalMailer;
//! use templated_mail::testing::*;
//!
//! #[tokio::test]
//! async fn test_reset_flow() {
//!     let mailer = Arc::new(LocalMailer::new());
//!     let adapter = MailAdapter::builder(config).mailer(Arc::clone(&mailer)).build().unwrap();
//!
//!     adapter.send_password_reset_email(reset).await;
//!
//!     assert_email_sent(&mailer);
//!     assert_email_to(&mailer, "user@example.com");
//!     assert_email_subject_contains(&mailer, "Reset");
//!     refute_email_to(&mailer, "admin@example.com");
//!
//!     // Regex matching
//!     assert_email_body_matches(&mailer, r"https://example\.com/reset\?token=\w+");
//! }
//! ```

use regex::Regex;

use crate::providers::LocalMailer;
use crate::storage::StoredMessage;

/// Format a list of messages for error messages.
fn format_message_summary(messages: &[StoredMessage]) -> String {
    if messages.is_empty() {
        return "  (no emails sent)".to_string();
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, stored)| {
            format!(
                "  {}. To: {}, From: {}, Subject: \"{}\"",
                i + 1,
                stored.to,
                stored.header("From").unwrap_or_else(|| "<none>".into()),
                stored.subject()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text and HTML bodies joined, for searching both at once.
fn decoded_bodies(message: &StoredMessage) -> String {
    [message.text_body(), message.html_body()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
}

fn excerpt(text: &str) -> String {
    text.chars().take(500).collect()
}

fn last_message(mailer: &LocalMailer) -> StoredMessage {
    match mailer.last_message() {
        Some(message) => message,
        None => panic!("Expected at least one email to be sent, but none were sent"),
    }
}

// ============================================================================
// Basic Assertions
// ============================================================================

/// Assert that at least one email was sent.
///
/// # Panics
///
/// Panics if no emails were sent.
pub fn assert_email_sent(mailer: &LocalMailer) {
    assert!(
        mailer.has_messages(),
        "Expected at least one email to be sent, but none were sent"
    );
}

/// Assert that no emails were sent.
///
/// # Panics
///
/// Panics if any email was sent.
pub fn assert_no_emails_sent(mailer: &LocalMailer) {
    let messages = mailer.messages();
    assert!(
        messages.is_empty(),
        "Expected no emails to be sent, but {} were sent.\n\nEmails sent:\n{}",
        messages.len(),
        format_message_summary(&messages)
    );
}

/// Assert that exactly N emails were sent.
///
/// # Panics
///
/// Panics if the count doesn't match.
pub fn assert_email_count(mailer: &LocalMailer, expected: usize) {
    let actual = mailer.message_count();
    assert!(
        actual == expected,
        "Expected {} email(s) to be sent, but {} were sent.\n\nEmails sent:\n{}",
        expected,
        actual,
        format_message_summary(&mailer.messages())
    );
}

/// Assert that an email was sent to a specific address.
///
/// # Panics
///
/// Panics if no email was sent to the address.
pub fn assert_email_to(mailer: &LocalMailer, email: &str) {
    assert!(
        mailer.sent_to(email),
        "Expected an email to be sent to '{}'.\n\nEmails sent:\n{}",
        email,
        format_message_summary(&mailer.messages())
    );
}

/// Assert that an email with the exact subject was sent.
///
/// # Panics
///
/// Panics if no email with the subject was found.
pub fn assert_email_subject(mailer: &LocalMailer, subject: &str) {
    let messages = mailer.messages();
    let found = messages.iter().any(|stored| stored.subject() == subject);

    assert!(
        found,
        "Expected an email with subject '{}'.\n\nEmails sent:\n{}",
        subject,
        format_message_summary(&messages)
    );
}

/// Assert that an email with subject containing text was sent.
///
/// # Panics
///
/// Panics if no matching email was found.
pub fn assert_email_subject_contains(mailer: &LocalMailer, text: &str) {
    let messages = mailer.messages();
    let found = messages.iter().any(|stored| stored.subject().contains(text));

    assert!(
        found,
        "Expected an email with subject containing '{}'.\n\nEmails sent:\n{}",
        text,
        format_message_summary(&messages)
    );
}

/// Assert that the last email has the given `From` address.
///
/// # Panics
///
/// Panics if no email was sent or the header doesn't contain the address.
pub fn assert_email_from(mailer: &LocalMailer, from_email: &str) {
    let last = last_message(mailer);
    let from = last.header("From").unwrap_or_default();

    assert!(
        from.to_ascii_lowercase()
            .contains(&from_email.to_ascii_lowercase()),
        "Expected last email from '{}', but From was '{}'",
        from_email,
        from
    );
}

/// Assert the last email's text or HTML body contains text.
///
/// # Panics
///
/// Panics if no email was sent or neither body contains the text.
pub fn assert_email_body_contains(mailer: &LocalMailer, text: &str) {
    let last = last_message(mailer);
    let bodies = decoded_bodies(&last);

    assert!(
        bodies.contains(text),
        "Expected email body to contain '{}', but it didn't.\n\nLast email:\n{}\n\nBody (first 500 chars):\n{}",
        text,
        format_message_summary(&[last.clone()]),
        excerpt(&bodies)
    );
}

/// Assert the last email's text body contains text.
///
/// # Panics
///
/// Panics if no email was sent or the text body doesn't contain the text.
pub fn assert_email_text_contains(mailer: &LocalMailer, text: &str) {
    let last = last_message(mailer);
    let body = last.text_body().unwrap_or_default();

    assert!(
        body.contains(text),
        "Expected text body to contain '{}', but it didn't.\n\nLast email:\n{}\n\nText body (first 500 chars):\n{}",
        text,
        format_message_summary(&[last.clone()]),
        excerpt(&body)
    );
}

/// Assert the last email's HTML body contains text.
///
/// # Panics
///
/// Panics if no email was sent or the HTML body doesn't contain the text.
pub fn assert_email_html_contains(mailer: &LocalMailer, text: &str) {
    let last = last_message(mailer);
    let html = last.html_body().unwrap_or_default();

    assert!(
        html.contains(text),
        "Expected HTML body to contain '{}', but it didn't.\n\nLast email:\n{}\n\nHTML body (first 500 chars):\n{}",
        text,
        format_message_summary(&[last.clone()]),
        excerpt(&html)
    );
}

/// Assert the last email carries an attachment with the given filename.
///
/// # Panics
///
/// Panics if no email was sent or no attachment has that name.
pub fn assert_email_has_attachment(mailer: &LocalMailer, filename: &str) {
    let last = last_message(mailer);
    let names = last.attachment_names();

    assert!(
        names.iter().any(|name| name == filename),
        "Expected email to have attachment '{}'.\n\nLast email:\n{}\n\nAttachments: [{}]",
        filename,
        format_message_summary(&[last.clone()]),
        names.join(", ")
    );
}

/// Assert that an email matching a predicate was sent.
///
/// # Panics
///
/// Panics if no matching email was found.
pub fn assert_email_matches<F>(mailer: &LocalMailer, predicate: F)
where
    F: Fn(&StoredMessage) -> bool,
{
    let matches = mailer.find_messages(predicate);
    assert!(
        !matches.is_empty(),
        "Expected an email matching the predicate, but none was found.\n\nEmails sent:\n{}",
        format_message_summary(&mailer.messages())
    );
}

/// Get the last email sent, or panic if none.
///
/// # Panics
///
/// Panics if no emails were sent.
pub fn get_last_email(mailer: &LocalMailer) -> StoredMessage {
    last_message(mailer)
}

/// Get all emails sent to a specific address.
pub fn get_emails_to(mailer: &LocalMailer, email: &str) -> Vec<StoredMessage> {
    mailer.find_messages(|m| m.to.eq_ignore_ascii_case(email))
}

// ============================================================================
// Regex Matching
// ============================================================================

/// Assert the last email subject matches a regex pattern.
///
/// # Panics
///
/// Panics if no email was sent, the pattern is invalid, or the subject
/// doesn't match.
pub fn assert_email_subject_matches(mailer: &LocalMailer, pattern: &str) {
    let last = last_message(mailer);
    let re = compile(pattern);
    let subject = last.subject();

    assert!(
        re.is_match(&subject),
        "Expected subject to match pattern '{}', but was '{}'.\n\nLast email:\n{}",
        pattern,
        subject,
        format_message_summary(&[last.clone()])
    );
}

/// Assert the last email's text or HTML body matches a regex pattern.
///
/// # Panics
///
/// Panics if no email was sent, the pattern is invalid, or nothing matches.
pub fn assert_email_body_matches(mailer: &LocalMailer, pattern: &str) {
    let last = last_message(mailer);
    let re = compile(pattern);
    let bodies = decoded_bodies(&last);

    assert!(
        re.is_match(&bodies),
        "Expected email body to match pattern '{}', but it didn't.\n\nLast email:\n{}\n\nBody (first 500 chars):\n{}",
        pattern,
        format_message_summary(&[last.clone()]),
        excerpt(&bodies)
    );
}

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(re) => re,
        Err(e) => panic!("Invalid regex pattern '{}': {}", pattern, e),
    }
}

// ============================================================================
// Refute Assertions
// ============================================================================

/// Refute that an email was sent to a specific address.
///
/// # Panics
///
/// Panics if an email was sent to the address.
pub fn refute_email_to(mailer: &LocalMailer, email: &str) {
    let messages = mailer.messages();
    if let Some(found) = messages.iter().find(|m| m.to.eq_ignore_ascii_case(email)) {
        panic!(
            "Expected no email to be sent to '{}', but found one.\n\nMatching email:\n  Subject: \"{}\"\n\nAll emails:\n{}",
            email,
            found.subject(),
            format_message_summary(&messages)
        );
    }
}

/// Refute that an email with the exact subject was sent.
///
/// # Panics
///
/// Panics if an email with that subject was sent.
pub fn refute_email_subject(mailer: &LocalMailer, subject: &str) {
    let messages = mailer.messages();
    if let Some(found) = messages.iter().find(|m| m.subject() == subject) {
        panic!(
            "Expected no email with subject '{}', but found one.\n\nMatching email:\n  To: {}\n\nAll emails:\n{}",
            subject,
            found.to,
            format_message_summary(&messages)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::Mailer;

    const MIME: &str = "From: App <noreply@example.com>\r\nTo: recipient@example.com\r\nSubject: Welcome aboard!\r\nContent-Transfer-Encoding: 7bit\r\n\r\nHello Alice\r\n";

    #[tokio::test]
    async fn test_assertions() {
        let mailer = LocalMailer::new();
        mailer.send_mime("recipient@example.com", MIME).await.unwrap();

        assert_email_sent(&mailer);
        assert_email_count(&mailer, 1);
        assert_email_to(&mailer, "recipient@example.com");
        assert_email_from(&mailer, "noreply@example.com");
        assert_email_subject(&mailer, "Welcome aboard!");
        assert_email_subject_contains(&mailer, "Welcome");
        assert_email_subject_matches(&mailer, r"^Welcome \w+!$");
        assert_email_body_contains(&mailer, "Hello Alice");
        assert_email_body_matches(&mailer, r"Hello [A-Z]\w+");
        assert_email_matches(&mailer, |m| m.to.ends_with("@example.com"));
        refute_email_to(&mailer, "other@example.com");
        refute_email_subject(&mailer, "Goodbye");
        assert_eq!(get_emails_to(&mailer, "RECIPIENT@example.com").len(), 1);
    }

    #[tokio::test]
    async fn test_assertions_decode_non_ascii() {
        let mailer = LocalMailer::new();
        let mime = "From: App <noreply@example.com>\r\n\
            Subject: Passwort =?utf-8?b?enVyw7xja3NldHplbg==?=\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            Content-Transfer-Encoding: quoted-printable\r\n\
            \r\n\
            Gr=C3=BC=C3=9Fe j=C3=B6rg\r\n";
        mailer.send_mime("jorg@example.com", mime).await.unwrap();

        assert_email_subject(&mailer, "Passwort zurücksetzen");
        assert_email_subject_contains(&mailer, "zurück");
        assert_email_body_contains(&mailer, "Grüße jörg");
        assert_email_text_contains(&mailer, "Grüße");
        assert_email_body_matches(&mailer, r"Grüße \w+");
    }

    #[tokio::test]
    #[should_panic(expected = "Expected email body to contain 'missing'")]
    async fn test_failure_excerpt_is_char_safe() {
        let mailer = LocalMailer::new();
        let mime = format!(
            "Subject: Long\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\nx{}",
            "ü".repeat(400)
        );
        mailer.send_mime("a@example.com", &mime).await.unwrap();
        assert_email_body_contains(&mailer, "missing");
    }

    #[tokio::test]
    #[should_panic(expected = "Expected at least one email")]
    async fn test_assert_sent_fails_when_empty() {
        let mailer = LocalMailer::new();
        assert_email_sent(&mailer);
    }

    #[tokio::test]
    #[should_panic(expected = "Expected no emails")]
    async fn test_assert_no_emails_fails_when_sent() {
        let mailer = LocalMailer::new();
        mailer.send_mime("a@example.com", MIME).await.unwrap();
        assert_no_emails_sent(&mailer);
    }
}
