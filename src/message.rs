//! The message handed to the MIME composer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A fully rendered email, before MIME composition.
///
/// `extra` holds fields merged from the template and the request. The
/// composer understands `replyTo`, `cc`, `bcc`, `headers` and `attachments`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Sender, `email` or `Name <email>`
    pub from: String,
    /// Recipient
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Rendered plain-text body
    pub text: String,
    /// Rendered HTML body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Extra fields for the composer
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OutgoingMessage {
    /// Create a message with headers and an empty body.
    pub fn new(from: impl Into<String>, to: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            ..Self::default()
        }
    }

    /// Shallow-merge extra fields; later calls win on conflicts.
    ///
    /// String values under `from`, `to` and `subject` replace the header
    /// fields. `text` and `html` are ignored since bodies only come from
    /// rendered templates.
    pub fn merge_extra(&mut self, extra: &Map<String, Value>) {
        for (key, value) in extra {
            match (key.as_str(), value) {
                ("from", Value::String(s)) => self.from = s.clone(),
                ("to", Value::String(s)) => self.to = s.clone(),
                ("subject", Value::String(s)) => self.subject = s.clone(),
                ("text" | "html", _) => {
                    tracing::warn!(key = %key, "Ignoring body override in extra fields");
                }
                _ => {
                    self.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Get an extra field.
    pub fn extra_field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}
