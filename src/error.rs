//! Error types for templated-mail.

use thiserror::Error;

/// Errors that can occur when configuring the adapter or sending emails.
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Adapter configuration error (missing API key, domain, sender, etc.)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A template entry in the configuration is malformed.
    #[error("Template configuration error ({template}): {reason}")]
    TemplateConfiguration { template: String, reason: String },

    /// No template is configured under the requested name.
    #[error("Could not find template with name {0}")]
    TemplateNotFound(String),

    /// A send request lacks a field the template needs.
    #[error("Cannot send email with template {template} without a {field}")]
    MissingField {
        template: String,
        field: &'static str,
    },

    /// Template body could not be read or decoded.
    #[error("Failed to load template {path}: {message}")]
    TemplateLoad { path: String, message: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    Render(String),

    /// Error building the MIME document.
    #[error("Compose error: {0}")]
    Compose(String),

    /// Invalid email address format.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Error reading or decoding an attachment.
    #[error("Attachment error: {0}")]
    AttachmentError(String),

    /// Provider-specific error with details.
    #[error("Provider error ({provider}): {message}")]
    ProviderError {
        provider: &'static str,
        message: String,
        /// Optional HTTP status code
        status: Option<u16>,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(String),
}

impl MailError {
    /// Create a template configuration error.
    pub fn template_config(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TemplateConfiguration {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Create a provider-specific error.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: None,
        }
    }

    /// Create a provider error with HTTP status.
    pub fn provider_with_status(
        provider: &'static str,
        message: impl Into<String>,
        status: u16,
    ) -> Self {
        Self::ProviderError {
            provider,
            message: message.into(),
            status: Some(status),
        }
    }

    /// Whether this error was raised before any I/O happened.
    ///
    /// Configuration and request validation errors are the caller's to fix;
    /// everything else comes from loading, composing or delivering.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::TemplateConfiguration { .. }
                | Self::TemplateNotFound(_)
                | Self::MissingField { .. }
        )
    }
}

#[cfg(feature = "_http")]
impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        Self::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Compose(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<handlebars::RenderError> for MailError {
    fn from(err: handlebars::RenderError) -> Self {
        Self::Render(err.to_string())
    }
}
