//! MIME composition.
//!
//! [`LettreComposer`] turns an [`OutgoingMessage`] into an RFC 5322 document
//! using lettre's message builder. Recognised extra fields:
//!
//! | Key | Value |
//! |-----|-------|
//! | `replyTo` / `reply_to` | address string, `{name, address}` or a list |
//! | `cc`, `bcc` | same as `replyTo` |
//! | `headers` | object of header name to string value |
//! | `attachments` | list, see [`Attachment::list_from_value`] |
//!
//! Unknown keys are logged at debug level and skipped.

use async_trait::async_trait;
use lettre::message::{
    header::{ContentType, HeaderName, HeaderValue},
    Attachment as LettreAttachment, MultiPart, SinglePart,
};
use lettre::Message;
use serde_json::Value;

use crate::address::Address;
use crate::attachment::{Attachment, AttachmentType};
use crate::error::MailError;
use crate::message::OutgoingMessage;

/// Builds a MIME document from a rendered message.
#[async_trait]
pub trait MimeComposer: Send + Sync {
    /// Compose the message into MIME text.
    async fn compose(&self, message: &OutgoingMessage) -> Result<String, MailError>;
}

/// Composer backed by `lettre`.
#[derive(Debug, Clone, Default)]
pub struct LettreComposer;

impl LettreComposer {
    /// Create a composer.
    pub fn new() -> Self {
        Self
    }

    /// Build a lettre `Message` from our outgoing message and its decoded attachments.
    fn build_message(
        &self,
        message: &OutgoingMessage,
        attachments: Vec<Attachment>,
    ) -> Result<Message, MailError> {
        let from = Address::parse(&message.from)?;
        let to = Address::parse(&message.to)?;

        let mut builder = Message::builder()
            .from(from.to_mailbox()?)
            .to(to.to_mailbox()?)
            .subject(&message.subject);

        for (key, value) in &message.extra {
            match key.as_str() {
                "replyTo" | "reply_to" => {
                    for addr in Address::list_from_value(value)? {
                        builder = builder.reply_to(addr.to_mailbox()?);
                    }
                }
                "cc" => {
                    for addr in Address::list_from_value(value)? {
                        builder = builder.cc(addr.to_mailbox()?);
                    }
                }
                "bcc" => {
                    for addr in Address::list_from_value(value)? {
                        builder = builder.bcc(addr.to_mailbox()?);
                    }
                }
                "headers" => {
                    for header in custom_headers(value)? {
                        builder = builder.raw_header(header);
                    }
                }
                "attachments" => {}
                other => tracing::debug!(key = other, "Skipping unrecognised extra field"),
            }
        }

        let text = message.text.clone();

        let built = if attachments.is_empty() {
            match &message.html {
                Some(html) => {
                    builder.multipart(MultiPart::alternative_plain_html(text, html.clone()))?
                }
                None => builder.header(ContentType::TEXT_PLAIN).body(text)?,
            }
        } else {
            let body_part = match &message.html {
                Some(html) => MultiPart::alternative_plain_html(text, html.clone()),
                None => MultiPart::mixed().singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text),
                ),
            };

            let mut multipart = MultiPart::mixed().multipart(body_part);

            for attachment in attachments {
                let content_type = ContentType::parse(&attachment.content_type)
                    .unwrap_or(ContentType::TEXT_PLAIN);

                let part = match attachment.disposition {
                    AttachmentType::Inline => {
                        let cid = attachment
                            .content_id
                            .clone()
                            .unwrap_or_else(|| attachment.filename.clone());
                        LettreAttachment::new_inline(cid).body(attachment.data, content_type)
                    }
                    AttachmentType::Attachment => {
                        LettreAttachment::new(attachment.filename).body(attachment.data, content_type)
                    }
                };

                multipart = multipart.singlepart(part);
            }

            builder.multipart(multipart)?
        };

        Ok(built)
    }
}

#[async_trait]
impl MimeComposer for LettreComposer {
    async fn compose(&self, message: &OutgoingMessage) -> Result<String, MailError> {
        let attachments = match message.extra.get("attachments") {
            Some(value) => Attachment::list_from_value(value).await?,
            None => Vec::new(),
        };
        let built = self.build_message(message, attachments)?;
        String::from_utf8(built.formatted())
            .map_err(|e| MailError::Compose(format!("MIME output is not UTF-8: {}", e)))
    }
}

fn custom_headers(value: &Value) -> Result<Vec<HeaderValue>, MailError> {
    let Value::Object(map) = value else {
        return Err(MailError::Compose(format!(
            "headers must be an object, got {}",
            value
        )));
    };

    map.iter()
        .map(|(name, value)| {
            let name = HeaderName::new_from_ascii(name.clone())
                .map_err(|_| MailError::Compose(format!("invalid header name: {}", name)))?;
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(HeaderValue::new(name, value))
        })
        .collect()
}
