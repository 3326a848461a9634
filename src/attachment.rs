//! Attachments carried in a template's or request's extra fields.
//!
//! Attachments arrive as JSON in the `attachments` extra:
//!
//! ```json
//! [
//!   {"filename": "terms.txt", "content": "Plain text content"},
//!   {"filename": "logo.png", "content": "iVBORw0...", "encoding": "base64", "cid": "logo"},
//!   {"path": "/srv/mail/report.pdf", "contentType": "application/pdf"}
//! ]
//! ```

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::MailError;

/// Type of attachment disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttachmentType {
    /// Regular attachment (shown as downloadable file)
    #[default]
    Attachment,
    /// Inline attachment (embedded in HTML via cid:)
    Inline,
}

/// Wire shape of an attachment in the extras map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentEntry {
    filename: Option<String>,
    content: Option<String>,
    encoding: Option<String>,
    content_type: Option<String>,
    path: Option<String>,
    cid: Option<String>,
}

/// A decoded email attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename for the attachment
    pub filename: String,
    /// MIME content type (e.g., "application/pdf", "image/png")
    pub content_type: String,
    /// Raw attachment data
    pub data: Vec<u8>,
    /// Whether this is an inline or regular attachment
    pub disposition: AttachmentType,
    /// Content-ID for inline attachments (used as cid: reference)
    pub content_id: Option<String>,
}

impl Attachment {
    /// Create a new attachment from raw bytes.
    ///
    /// Content type is guessed from the filename extension.
    pub fn from_bytes(filename: impl Into<String>, data: Vec<u8>) -> Self {
        let filename = filename.into();
        let content_type = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();

        Self {
            filename,
            content_type,
            data,
            disposition: AttachmentType::Attachment,
            content_id: None,
        }
    }

    /// Set the content type explicitly.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set as inline attachment referenced by `cid`.
    pub fn inline(mut self, cid: impl Into<String>) -> Self {
        self.disposition = AttachmentType::Inline;
        self.content_id = Some(cid.into());
        self
    }

    /// Check if this is an inline attachment.
    pub fn is_inline(&self) -> bool {
        self.disposition == AttachmentType::Inline
    }

    /// Decode the `attachments` extra into attachments.
    ///
    /// Path-based entries are read from disk here, at composition time.
    pub async fn list_from_value(value: &Value) -> Result<Vec<Self>, MailError> {
        let items = match value {
            Value::Null => return Ok(Vec::new()),
            Value::Array(items) => items.as_slice(),
            Value::Object(_) => std::slice::from_ref(value),
            other => {
                return Err(MailError::AttachmentError(format!(
                    "expected a list of attachments, got {}",
                    other
                )))
            }
        };

        let mut attachments = Vec::with_capacity(items.len());
        for item in items {
            let entry: AttachmentEntry = serde_json::from_value(item.clone())
                .map_err(|e| MailError::AttachmentError(e.to_string()))?;
            attachments.push(Self::from_entry(entry).await?);
        }
        Ok(attachments)
    }

    async fn from_entry(entry: AttachmentEntry) -> Result<Self, MailError> {
        let (data, fallback_name) = match (entry.content, entry.path) {
            (Some(content), _) => {
                let data = match entry.encoding.as_deref() {
                    Some("base64") => base64::engine::general_purpose::STANDARD
                        .decode(content.trim())
                        .map_err(|e| MailError::AttachmentError(e.to_string()))?,
                    None | Some("utf8") | Some("utf-8") => content.into_bytes(),
                    Some(other) => {
                        return Err(MailError::AttachmentError(format!(
                            "unsupported encoding: {}",
                            other
                        )))
                    }
                };
                (data, None)
            }
            (None, Some(path)) => {
                let data = tokio::fs::read(&path).await.map_err(|e| {
                    MailError::AttachmentError(format!("{}: {}", path, e))
                })?;
                let name = Path::new(&path)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_string);
                (data, name)
            }
            (None, None) => {
                return Err(MailError::AttachmentError(format!(
                    "attachment {} has no content or path",
                    entry.filename.as_deref().unwrap_or("<unnamed>")
                )))
            }
        };

        let filename = entry
            .filename
            .or(fallback_name)
            .unwrap_or_else(|| "attachment".to_string());

        let mut attachment = Self::from_bytes(filename, data);
        if let Some(content_type) = entry.content_type {
            attachment = attachment.content_type(content_type);
        }
        if let Some(cid) = entry.cid {
            attachment = attachment.inline(cid);
        }
        Ok(attachment)
    }
}
