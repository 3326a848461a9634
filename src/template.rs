//! Template descriptors and the validated template store.
//!
//! A template is a subject line plus a plain-text body file, an optional HTML
//! body file, an optional [`Enricher`] and optional extra message fields.
//!
//! ```rust,ignore
//! use templated_mail::{TemplateDescriptor, User};
//! use serde_json::json;
//!
//! let reset = TemplateDescriptor::new("Reset your password", "templates/reset.txt")
//!     .html("templates/reset.html")
//!     .extra("replyTo", "support@example.com")
//!     .enrich(|user: &dyn templated_mail::Identity| {
//!         json!({ "firstName": user.get("firstName") })
//!     });
//! ```
//!
//! Descriptors can also be read from a JSON manifest (see
//! [`AdapterConfig::templates_json`](crate::AdapterConfig::templates_json)).
//! Enrichers cannot be expressed in JSON and must be attached in code.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::MailError;
use crate::identity::Identity;

/// Template used by [`MailAdapter::send_password_reset_email`](crate::MailAdapter::send_password_reset_email).
pub const PASSWORD_RESET_TEMPLATE: &str = "passwordResetEmail";

/// Template used by [`MailAdapter::send_verification_email`](crate::MailAdapter::send_verification_email).
pub const VERIFICATION_TEMPLATE: &str = "verificationEmail";

/// Produces extra template variables for a user at send time.
///
/// The returned value should be a JSON object; anything else is discarded
/// and the send continues with the base variables.
///
/// Closures `Fn(&dyn Identity) -> Value` implement this trait directly. For
/// lookups that need to await, implement it on a struct:
///
/// ```rust,ignore
/// struct ProfileLookup { db: Db }
///
/// #[async_trait]
/// impl Enricher for ProfileLookup {
///     async fn enrich(&self, user: &dyn Identity) -> Value {
///         let profile = self.db.profile(user.get("username")).await;
///         json!({ "firstName": profile.first_name })
///     }
/// }
/// ```
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Build extra variables for this user.
    async fn enrich(&self, user: &dyn Identity) -> Value;
}

#[async_trait]
impl<F> Enricher for F
where
    F: Fn(&dyn Identity) -> Value + Send + Sync,
{
    async fn enrich(&self, user: &dyn Identity) -> Value {
        (self)(user)
    }
}

/// Configuration for a single named template.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TemplateDescriptor {
    /// Default subject line
    #[serde(default)]
    pub subject: String,
    /// Path to the plain-text body
    #[serde(default, alias = "pathPlainText")]
    pub plain_text_path: PathBuf,
    /// Path to the HTML body
    #[serde(default, alias = "pathHtml")]
    pub html_path: Option<PathBuf>,
    /// Per-send variable enrichment (identity mode only)
    #[serde(skip)]
    pub enricher: Option<Arc<dyn Enricher>>,
    /// Extra fields merged into the outgoing message (replyTo, attachments, ...)
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl TemplateDescriptor {
    /// Create a descriptor with a subject and plain-text body path.
    pub fn new(subject: impl Into<String>, plain_text_path: impl Into<PathBuf>) -> Self {
        Self {
            subject: subject.into(),
            plain_text_path: plain_text_path.into(),
            ..Self::default()
        }
    }

    /// Set the HTML body path.
    pub fn html(mut self, path: impl Into<PathBuf>) -> Self {
        self.html_path = Some(path.into());
        self
    }

    /// Attach an enricher.
    pub fn enrich(mut self, enricher: impl Enricher + 'static) -> Self {
        self.enricher = Some(Arc::new(enricher));
        self
    }

    /// Attach a shared enricher.
    pub fn enrich_arc(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Add an extra message field.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn validate(&self, name: &str) -> Result<(), MailError> {
        if self.subject.trim().is_empty() {
            return Err(MailError::template_config(name, "subject is required"));
        }
        if self.plain_text_path.as_os_str().is_empty() {
            return Err(MailError::template_config(
                name,
                "plain text template path is required",
            ));
        }
        if matches!(&self.html_path, Some(p) if p.as_os_str().is_empty()) {
            return Err(MailError::template_config(
                name,
                "html template path must not be empty when set",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for TemplateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateDescriptor")
            .field("subject", &self.subject)
            .field("plain_text_path", &self.plain_text_path)
            .field("html_path", &self.html_path)
            .field("enricher", &self.enricher.is_some())
            .field("extra", &self.extra)
            .finish()
    }
}

/// Validated, read-only set of templates keyed by name.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<String, TemplateDescriptor>,
}

impl TemplateStore {
    /// Validate every descriptor and build the store.
    ///
    /// Fails on an empty map or on the first malformed entry.
    pub fn new(templates: HashMap<String, TemplateDescriptor>) -> Result<Self, MailError> {
        if templates.is_empty() {
            return Err(MailError::template_config(
                "*",
                "at least one template must be configured",
            ));
        }

        for (name, descriptor) in &templates {
            if name.trim().is_empty() {
                return Err(MailError::template_config(name, "template name is empty"));
            }
            descriptor.validate(name)?;
        }

        Ok(Self { templates })
    }

    /// Look up a template by name.
    pub fn get(&self, name: &str) -> Option<&TemplateDescriptor> {
        self.templates.get(name)
    }

    /// Configured template names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Number of configured templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the store is empty (never true for a constructed store).
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
