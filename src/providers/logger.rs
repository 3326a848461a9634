//! Logger mailer that only logs emails.
//!
//! Useful for staging environments or when you want to see which templated
//! emails would go out without delivering or storing them.

use async_trait::async_trait;
use mailparse::MailHeaderMap;

use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};

/// Logger mailer that emits tracing events for MIME documents.
pub struct LoggerMailer {
    /// If true, log the whole MIME document. If false, recipient, subject and size.
    log_full: bool,
}

impl LoggerMailer {
    /// Create a logger mailer with brief output.
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Create a logger mailer that also logs the MIME document.
    pub fn full() -> Self {
        Self { log_full: true }
    }

    /// Set whether to log the full document.
    pub fn log_full(mut self, full: bool) -> Self {
        self.log_full = full;
        self
    }
}

impl Default for LoggerMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LoggerMailer {
    async fn send_mime(&self, to: &str, mime: &str) -> Result<DeliveryResult, MailError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let subject = subject_of(mime);

        tracing::info!(
            message_id = %message_id,
            to = %to,
            subject = subject.as_deref().unwrap_or("<none>"),
            bytes = mime.len(),
            "Email logged"
        );

        if self.log_full {
            tracing::debug!(mime = %mime, "MIME document");
        }

        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "logger"
    }
}

/// Decoded `Subject` of a MIME document, if its headers parse.
fn subject_of(mime: &str) -> Option<String> {
    let (headers, _) = mailparse::parse_headers(mime.as_bytes()).ok()?;
    headers.get_first_value("Subject")
}
