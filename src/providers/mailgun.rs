//! Mailgun API provider.
//!
//! Sends pre-built MIME documents through the `messages.mime` endpoint.
//! For reference: [Mailgun API docs](https://documentation.mailgun.com/docs/mailgun/api-reference/openapi-final/tag/Messages/)
//!
//! # Example
//!
//! ```rust,ignore
//! use templated_mail::providers::MailgunMailer;
//!
//! let mailer = MailgunMailer::new("your-api-key", "mg.yourdomain.com");
//!
//! // EU region
//! let mailer = MailgunMailer::new("your-api-key", "mg.yourdomain.com")
//!     .host("api.eu.mailgun.net");
//! ```

use async_trait::async_trait;
use base64::Engine;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;

use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};

const MAILGUN_BASE_URL: &str = "https://api.mailgun.net/v3";

/// Mailgun API delivery client.
pub struct MailgunMailer {
    api_key: String,
    domain: String,
    base_url: String,
    client: Client,
}

impl MailgunMailer {
    /// Create a new Mailgun mailer with the given API key and domain.
    pub fn new(api_key: impl Into<String>, domain: impl Into<String>) -> Self {
        Self::with_client(api_key, domain, Client::new())
    }

    /// Create with a custom reqwest client.
    pub fn with_client(
        api_key: impl Into<String>,
        domain: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            domain: domain.into(),
            base_url: MAILGUN_BASE_URL.to_string(),
            client,
        }
    }

    /// Use a different API host (e.g. `api.eu.mailgun.net`).
    ///
    /// A value with an explicit scheme (`http://127.0.0.1:8080`) is used as
    /// the origin as-is; a bare host gets `https://`.
    pub fn host(mut self, host: impl AsRef<str>) -> Self {
        self.base_url = base_url_for_host(host.as_ref());
        self
    }

    /// Set a full base URL including the API version path.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn auth_header(&self) -> String {
        let credentials = format!("api:{}", self.api_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
        format!("Basic {}", encoded)
    }

    fn build_form(&self, to: &str, mime: &str) -> Result<Form, MailError> {
        let message = Part::bytes(mime.as_bytes().to_vec())
            .file_name("message.mime")
            .mime_str("message/rfc822")
            .map_err(|e| MailError::HttpError(e.to_string()))?;

        Ok(Form::new().text("to", to.to_string()).part("message", message))
    }
}

/// Map a Mailgun `host` option to an API base URL.
pub(crate) fn base_url_for_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}/v3", host)
    } else {
        format!("https://{}/v3", host)
    }
}

#[async_trait]
impl Mailer for MailgunMailer {
    async fn send_mime(&self, to: &str, mime: &str) -> Result<DeliveryResult, MailError> {
        let form = self.build_form(to, mime)?;
        let url = format!("{}/{}/messages.mime", self.base_url, self.domain);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("User-Agent", format!("templated-mail/{}", crate::VERSION))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            let result: MailgunResponse = response.json().await?;
            Ok(DeliveryResult::with_response(
                result.id,
                serde_json::json!({
                    "provider": "mailgun",
                    "message": result.message,
                }),
            ))
        } else {
            let error_body = response.text().await.unwrap_or_default();
            let error_msg = serde_json::from_str::<MailgunError>(&error_body)
                .map(|e| e.message)
                .unwrap_or(error_body);

            Err(MailError::provider_with_status(
                "mailgun",
                error_msg,
                status.as_u16(),
            ))
        }
    }

    fn provider_name(&self) -> &'static str {
        "mailgun"
    }

    fn validate_config(&self) -> Result<(), MailError> {
        if self.api_key.is_empty() {
            return Err(MailError::Configuration("Mailgun API key is empty".into()));
        }
        if self.domain.is_empty() {
            return Err(MailError::Configuration("Mailgun domain is empty".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Mailgun API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct MailgunResponse {
    id: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct MailgunError {
    message: String,
}
