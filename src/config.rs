//! Adapter configuration.
//!
//! ## Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MAILGUN_API_KEY` | Mailgun API key (required) |
//! | `MAILGUN_DOMAIN` | Mailgun sending domain (required) |
//! | `MAILGUN_FROM_ADDRESS` | Default sender, falls back to `EMAIL_FROM` |
//! | `MAILGUN_HOST` | API host, e.g. `api.eu.mailgun.net` |
//! | `MAILGUN_TEMPLATE_DIR` | Root for relative template paths |
//! | `MAILGUN_TEMPLATES` | Path to a JSON template manifest |
//!
//! A template manifest maps names to descriptors:
//!
//! ```json
//! {
//!   "passwordResetEmail": {
//!     "subject": "Reset your password",
//!     "pathPlainText": "password_reset.txt",
//!     "pathHtml": "password_reset.html"
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::error::MailError;
use crate::template::TemplateDescriptor;

/// Everything the adapter needs at construction.
#[derive(Debug, Clone, Default)]
pub struct AdapterConfig {
    /// Mailgun API key
    pub api_key: String,
    /// Mailgun sending domain
    pub domain: String,
    /// Default sender, `email` or `Name <email>`
    pub from_address: String,
    /// Optional API host override
    pub host: Option<String>,
    /// Root for relative template paths
    pub template_dir: Option<PathBuf>,
    /// Templates by name
    pub templates: HashMap<String, TemplateDescriptor>,
}

impl AdapterConfig {
    /// Create a configuration with no templates yet.
    pub fn new(
        api_key: impl Into<String>,
        domain: impl Into<String>,
        from_address: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            domain: domain.into(),
            from_address: from_address.into(),
            ..Self::default()
        }
    }

    /// Read the configuration from environment variables.
    ///
    /// Missing required variables are reported when the adapter is built,
    /// so that every problem surfaces through [`AdapterConfig::validate`].
    pub fn from_env() -> Result<Self, MailError> {
        let mut config = Self::new(
            env::var("MAILGUN_API_KEY").unwrap_or_default(),
            env::var("MAILGUN_DOMAIN").unwrap_or_default(),
            env::var("MAILGUN_FROM_ADDRESS")
                .or_else(|_| env::var("EMAIL_FROM"))
                .unwrap_or_default(),
        );

        config.host = env::var("MAILGUN_HOST").ok().filter(|h| !h.is_empty());
        config.template_dir = env::var("MAILGUN_TEMPLATE_DIR").ok().map(PathBuf::from);

        if let Ok(path) = env::var("MAILGUN_TEMPLATES") {
            let manifest = std::fs::read_to_string(&path).map_err(|e| {
                MailError::Configuration(format!("cannot read template manifest {}: {}", path, e))
            })?;
            config = config.templates_json(&manifest)?;
        }

        tracing::debug!(
            domain = %config.domain,
            templates = config.templates.len(),
            "Loaded adapter configuration from environment"
        );

        Ok(config)
    }

    /// Set the API host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the root directory for relative template paths.
    pub fn template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// Add or replace a template.
    pub fn template(mut self, name: impl Into<String>, descriptor: TemplateDescriptor) -> Self {
        self.templates.insert(name.into(), descriptor);
        self
    }

    /// Add templates from a JSON manifest.
    ///
    /// A malformed manifest is a template configuration error.
    pub fn templates_json(mut self, manifest: &str) -> Result<Self, MailError> {
        let parsed: HashMap<String, TemplateDescriptor> = serde_json::from_str(manifest)
            .map_err(|e| MailError::template_config("manifest", e.to_string()))?;
        self.templates.extend(parsed);
        Ok(self)
    }

    /// Check the top-level options.
    ///
    /// Template entries are checked by [`TemplateStore::new`](crate::TemplateStore::new).
    pub fn validate(&self) -> Result<(), MailError> {
        if self.api_key.trim().is_empty() {
            return Err(MailError::Configuration(
                "MailAdapter requires an API key".into(),
            ));
        }
        if self.domain.trim().is_empty() {
            return Err(MailError::Configuration("MailAdapter requires a domain".into()));
        }
        if self.from_address.trim().is_empty() {
            return Err(MailError::Configuration(
                "MailAdapter requires a from address".into(),
            ));
        }
        Ok(())
    }
}
