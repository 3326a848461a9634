//! Delivery client trait and delivery result types.
//!
//! A [`Mailer`] takes a composed MIME document and a recipient and hands
//! them to a delivery provider. The adapter holds it as `Arc<dyn Mailer>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MailError;

/// Result of a successful email delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResult {
    /// Message ID assigned by the provider
    pub message_id: String,
    /// Optional provider-specific response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_response: Option<serde_json::Value>,
}

impl DeliveryResult {
    /// Create a new delivery result with just a message ID.
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            provider_response: None,
        }
    }

    /// Create a delivery result with provider response.
    pub fn with_response(message_id: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            message_id: message_id.into(),
            provider_response: Some(response),
        }
    }
}

/// Trait for delivery providers that accept raw MIME documents.
///
/// # Example
///
/// ```ignore
/// use templated_mail::Mailer;
/// use templated_mail::providers::MailgunMailer;
///
/// let mailer = MailgunMailer::new("key-xxx", "mg.example.com");
/// let result = mailer.send_mime("user@example.com", &mime).await?;
/// println!("Sent with ID: {}", result.message_id);
/// ```
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a composed MIME document to `to`.
    async fn send_mime(&self, to: &str, mime: &str) -> Result<DeliveryResult, MailError>;

    /// Get the provider name (for logging/debugging).
    fn provider_name(&self) -> &'static str {
        "unknown"
    }

    /// Validate configuration.
    ///
    /// Called when the adapter is built. Override in providers that require
    /// specific config (API keys, etc.).
    fn validate_config(&self) -> Result<(), MailError> {
        Ok(())
    }
}

#[async_trait]
impl<M: Mailer + ?Sized> Mailer for std::sync::Arc<M> {
    async fn send_mime(&self, to: &str, mime: &str) -> Result<DeliveryResult, MailError> {
        (**self).send_mime(to, mime).await
    }

    fn provider_name(&self) -> &'static str {
        (**self).provider_name()
    }

    fn validate_config(&self) -> Result<(), MailError> {
        (**self).validate_config()
    }
}
