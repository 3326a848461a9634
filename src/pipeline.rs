//! The send pipeline: template lookup, variable resolution, rendering, MIME
//! composition and delivery.
//!
//! Every send runs the same steps in order:
//!
//! 1. look up the template,
//! 2. validate the request against it,
//! 3. resolve variables,
//! 4. load (or reuse) and render the plain-text body,
//! 5. load and render the HTML body when the template has one,
//! 6. merge extra fields from the template, then from the request,
//! 7. compose the MIME document,
//! 8. hand it to the delivery client.
//!
//! Any failure ends the send; nothing is retried.

use serde_json::{Map, Value};
use std::sync::Arc;

#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::cache::{BodyKind, RenderCache};
use crate::error::MailError;
use crate::identity::Identity;
use crate::loader::TemplateLoader;
use crate::mailer::{DeliveryResult, Mailer};
use crate::message::OutgoingMessage;
use crate::mime::MimeComposer;
use crate::render::Renderer;
use crate::template::{TemplateDescriptor, TemplateStore};
use crate::variables::{self, Variables};

/// Arguments for the password reset and verification emails.
#[derive(Clone)]
pub struct IdentityEmail {
    /// Action link (reset or verification URL)
    pub link: String,
    /// Application name
    pub app_name: String,
    /// The user the email is for
    pub user: Arc<dyn Identity>,
}

impl IdentityEmail {
    /// Create identity email arguments.
    pub fn new(
        link: impl Into<String>,
        app_name: impl Into<String>,
        user: impl Identity + 'static,
    ) -> Self {
        Self {
            link: link.into(),
            app_name: app_name.into(),
            user: Arc::new(user),
        }
    }
}

impl std::fmt::Debug for IdentityEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityEmail")
            .field("link", &self.link)
            .field("app_name", &self.app_name)
            .field("user", &self.user.get("username"))
            .finish()
    }
}

/// Arguments for a direct send with an explicit recipient.
///
/// ```
/// use templated_mail::SendOptions;
///
/// let options = SendOptions::new("customAlert")
///     .recipient("ops@example.com")
///     .subject("Disk almost full")
///     .variable("host", "db-1")
///     .extra("replyTo", "noc@example.com");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Template to render
    pub template_name: String,
    /// Subject override; the template subject is used otherwise
    pub subject: Option<String>,
    /// Sender override; the adapter's from address is used otherwise
    pub from_address: Option<String>,
    /// Recipient (required)
    pub recipient: Option<String>,
    /// Template variables, used as-is
    pub variables: Option<Variables>,
    /// Extra message fields, merged after the template's
    pub extra: Option<Map<String, Value>>,
}

impl SendOptions {
    /// Start options for `template_name`.
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            ..Self::default()
        }
    }

    /// Set the recipient.
    pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Override the subject.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Override the sender.
    pub fn from_address(mut self, from: impl Into<String>) -> Self {
        self.from_address = Some(from.into());
        self
    }

    /// Set one template variable.
    pub fn variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables
            .get_or_insert_with(Variables::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace all template variables.
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Add one extra message field.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// One send, normalised from the facade entry points.
#[derive(Debug, Clone)]
pub enum SendRequest {
    /// Password reset or verification email bound to a user.
    Identity {
        /// Template to render
        template_name: String,
        /// Link, app name and user
        email: IdentityEmail,
    },
    /// Generic send with an explicit recipient.
    Direct(SendOptions),
}

impl SendRequest {
    /// The template this request renders.
    pub fn template_name(&self) -> &str {
        match self {
            SendRequest::Identity { template_name, .. } => template_name,
            SendRequest::Direct(options) => &options.template_name,
        }
    }

    /// `"identity"` or `"direct"`, for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            SendRequest::Identity { .. } => "identity",
            SendRequest::Direct(_) => "direct",
        }
    }
}

/// Owns the template store, the body cache and the collaborators a send needs.
pub(crate) struct Pipeline {
    pub(crate) store: TemplateStore,
    pub(crate) cache: RenderCache,
    pub(crate) from_address: String,
    pub(crate) loader: Arc<dyn TemplateLoader>,
    pub(crate) renderer: Arc<dyn Renderer>,
    pub(crate) composer: Arc<dyn MimeComposer>,
    pub(crate) mailer: Arc<dyn Mailer>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl Pipeline {
    /// Run steps 1 through 6 and return the message that would be composed.
    pub(crate) async fn prepare(&self, request: &SendRequest) -> Result<OutgoingMessage, MailError> {
        let name = request.template_name();
        let descriptor = self
            .store
            .get(name)
            .ok_or_else(|| MailError::TemplateNotFound(name.to_string()))?;

        let mut message = self.headers(name, descriptor, request)?;

        let vars = match request {
            SendRequest::Direct(options) => variables::resolve_direct(options.variables.as_ref()),
            SendRequest::Identity { email, .. } => {
                variables::resolve_identity(
                    name,
                    &email.link,
                    &email.app_name,
                    &*email.user,
                    descriptor.enricher.as_deref(),
                )
                .await
            }
        };

        let text = self
            .cache
            .get_or_load(name, BodyKind::Text, &descriptor.plain_text_path, &*self.loader)
            .await?;
        message.text = self.renderer.render(&text, &vars)?;

        if let Some(html_path) = &descriptor.html_path {
            let html = self
                .cache
                .get_or_load(name, BodyKind::Html, html_path, &*self.loader)
                .await?;
            message.html = Some(self.renderer.render(&html, &vars)?);
        }

        message.merge_extra(&descriptor.extra);
        if let SendRequest::Direct(SendOptions {
            extra: Some(extra), ..
        }) = request
        {
            message.merge_extra(extra);
        }

        Ok(message)
    }

    /// Validate the request and fill in from, to and subject.
    fn headers(
        &self,
        name: &str,
        descriptor: &TemplateDescriptor,
        request: &SendRequest,
    ) -> Result<OutgoingMessage, MailError> {
        let missing = |field: &'static str| MailError::MissingField {
            template: name.to_string(),
            field,
        };

        match request {
            SendRequest::Direct(options) => {
                let to = non_empty(options.recipient.as_deref()).ok_or_else(|| missing("recipient"))?;
                let subject = non_empty(options.subject.as_deref())
                    .or_else(|| non_empty(Some(descriptor.subject.as_str())))
                    .ok_or_else(|| missing("subject"))?;
                let from = non_empty(options.from_address.as_deref()).unwrap_or(self.from_address.as_str());
                Ok(OutgoingMessage::new(from, to, subject))
            }
            SendRequest::Identity { email, .. } => {
                let to = email
                    .user
                    .get("email")
                    .filter(|e| !e.trim().is_empty())
                    .ok_or_else(|| missing("user email"))?;
                Ok(OutgoingMessage::new(
                    self.from_address.as_str(),
                    to,
                    descriptor.subject.as_str(),
                ))
            }
        }
    }

    /// Run the whole pipeline for one request.
    pub(crate) async fn run(&self, request: &SendRequest) -> Result<DeliveryResult, MailError> {
        let message = self.prepare(request).await?;
        tracing::debug!(to = %message.to, has_html = message.html.is_some(), "Composing MIME document");

        let mime = self.composer.compose(&message).await?;

        let provider = self.mailer.provider_name();

        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let result = self.mailer.send_mime(&message.to, &mime).await;

        #[cfg(feature = "metrics")]
        {
            let duration = start.elapsed().as_secs_f64();
            let status = if result.is_ok() { "success" } else { "error" };
            metrics::counter!(
                "templated_mail_emails_total",
                "template" => request.template_name().to_string(),
                "provider" => provider,
                "status" => status
            )
            .increment(1);
            metrics::histogram!("templated_mail_delivery_duration_seconds", "provider" => provider)
                .record(duration);
        }

        match &result {
            Ok(r) => tracing::info!(provider, message_id = %r.message_id, "Email delivered"),
            Err(e) => tracing::warn!(provider, error = %e, "Email delivery failed"),
        }

        result
    }
}
