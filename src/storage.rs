//! In-memory storage for messages captured by [`LocalMailer`](crate::providers::LocalMailer).

use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use parking_lot::RwLock;
use std::sync::Arc;

/// A captured MIME document with metadata.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    /// Unique identifier, also returned as the delivery message ID.
    pub id: String,
    /// Envelope recipient.
    pub to: String,
    /// The composed MIME document.
    pub mime: String,
    /// When the message was "sent" (stored).
    pub sent_at: DateTime<Utc>,
}

impl StoredMessage {
    fn parsed(&self) -> Option<ParsedMail<'_>> {
        mailparse::parse_mail(self.mime.as_bytes()).ok()
    }

    /// Get a top-level header value by name (case-insensitive).
    ///
    /// Folded lines are joined and RFC 2047 encoded words are decoded.
    pub fn header(&self, name: &str) -> Option<String> {
        self.parsed()?.headers.get_first_value(name)
    }

    /// The decoded `Subject` header, or an empty string.
    pub fn subject(&self) -> String {
        self.header("Subject").unwrap_or_default()
    }

    /// The decoded `text/plain` body, skipping attachments.
    pub fn text_body(&self) -> Option<String> {
        find_body(&self.parsed()?, "text/plain")
    }

    /// The decoded `text/html` body, skipping attachments.
    pub fn html_body(&self) -> Option<String> {
        find_body(&self.parsed()?, "text/html")
    }

    /// Filenames of parts sent with `Content-Disposition: attachment`.
    pub fn attachment_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(parsed) = self.parsed() {
            collect_attachments(&parsed, &mut names);
        }
        names
    }
}

fn is_attachment(part: &ParsedMail<'_>) -> bool {
    matches!(
        part.get_content_disposition().disposition,
        DispositionType::Attachment
    )
}

fn find_body(part: &ParsedMail<'_>, mimetype: &str) -> Option<String> {
    if part.subparts.is_empty() {
        if part.ctype.mimetype.eq_ignore_ascii_case(mimetype) && !is_attachment(part) {
            return part.get_body().ok();
        }
        return None;
    }
    part.subparts.iter().find_map(|sub| find_body(sub, mimetype))
}

fn collect_attachments(part: &ParsedMail<'_>, names: &mut Vec<String>) {
    if is_attachment(part) {
        let disposition = part.get_content_disposition();
        if let Some(name) = disposition.params.get("filename") {
            names.push(name.clone());
        }
    }
    for sub in &part.subparts {
        collect_attachments(sub, names);
    }
}

/// Thread-safe in-memory storage, newest message last internally.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    messages: RwLock<Vec<StoredMessage>>,
}

impl MemoryStorage {
    /// Create a new empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage wrapped in an Arc for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Store a message and return its ID.
    pub fn push(&self, to: &str, mime: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.messages.write().push(StoredMessage {
            id: id.clone(),
            to: to.to_string(),
            mime: mime.to_string(),
            sent_at: Utc::now(),
        });
        id
    }

    /// Get a message by ID.
    pub fn get(&self, id: &str) -> Option<StoredMessage> {
        self.messages.read().iter().find(|m| m.id == id).cloned()
    }

    /// All stored messages, newest first.
    pub fn all(&self) -> Vec<StoredMessage> {
        self.messages.read().iter().rev().cloned().collect()
    }

    /// Number of stored messages.
    pub fn count(&self) -> usize {
        self.messages.read().len()
    }

    /// Clear all stored messages.
    pub fn clear(&self) {
        self.messages.write().clear();
    }

    /// Remove and return all stored messages, newest first.
    pub fn flush(&self) -> Vec<StoredMessage> {
        let mut drained: Vec<_> = self.messages.write().drain(..).collect();
        drained.reverse();
        drained
    }
}
