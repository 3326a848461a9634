//! The adapter facade used by the hosting platform.

use std::sync::Arc;
use tracing::Instrument;

use crate::address::Address;
use crate::cache::RenderCache;
use crate::config::AdapterConfig;
use crate::error::MailError;
use crate::loader::{FsLoader, TemplateLoader};
use crate::mailer::{DeliveryResult, Mailer};
use crate::message::OutgoingMessage;
use crate::mime::{LettreComposer, MimeComposer};
use crate::pipeline::{IdentityEmail, Pipeline, SendOptions, SendRequest};
use crate::render::{HandlebarsRenderer, Renderer};
use crate::template::{TemplateStore, PASSWORD_RESET_TEMPLATE, VERIFICATION_TEMPLATE};

/// Sends templated emails for one template set.
///
/// Build one per process and share it (it is `Send + Sync`); template bodies
/// are cached inside the adapter for its whole lifetime.
///
/// ```rust,ignore
/// use templated_mail::{AdapterConfig, IdentityEmail, MailAdapter, SendOptions, TemplateDescriptor, User};
///
/// let adapter = MailAdapter::new(
///     AdapterConfig::new(api_key, "mg.example.com", "My App <noreply@example.com>")
///         .template_dir("templates")
///         .template("passwordResetEmail", TemplateDescriptor::new("Reset your password", "reset.txt"))
///         .template("customAlert", TemplateDescriptor::new("Alert", "alert.txt")),
/// )?;
///
/// // Failures are logged, never returned.
/// adapter
///     .send_password_reset_email(IdentityEmail::new(link, "My App", User::new("alice", "a@b.com")))
///     .await;
///
/// // Failures are returned.
/// adapter
///     .send(SendOptions::new("customAlert").recipient("ops@example.com").variable("host", "db-1"))
///     .await?;
/// ```
pub struct MailAdapter {
    pipeline: Pipeline,
}

impl MailAdapter {
    /// Build an adapter that delivers through Mailgun.
    #[cfg(feature = "mailgun")]
    pub fn new(config: AdapterConfig) -> Result<Self, MailError> {
        Self::builder(config).build()
    }

    /// Build a Mailgun adapter from environment variables.
    ///
    /// See [`AdapterConfig::from_env`].
    #[cfg(feature = "mailgun")]
    pub fn from_env() -> Result<Self, MailError> {
        Self::new(AdapterConfig::from_env()?)
    }

    /// Start building an adapter with custom collaborators.
    pub fn builder(config: AdapterConfig) -> MailAdapterBuilder {
        MailAdapterBuilder {
            config,
            loader: None,
            renderer: None,
            composer: None,
            mailer: None,
        }
    }

    /// Send the password reset email to `email.user`.
    ///
    /// Never fails: errors are logged and `None` is returned.
    pub async fn send_password_reset_email(&self, email: IdentityEmail) -> Option<DeliveryResult> {
        self.send_logged(SendRequest::Identity {
            template_name: PASSWORD_RESET_TEMPLATE.to_string(),
            email,
        })
        .await
    }

    /// Send the account verification email to `email.user`.
    ///
    /// Never fails: errors are logged and `None` is returned.
    pub async fn send_verification_email(&self, email: IdentityEmail) -> Option<DeliveryResult> {
        self.send_logged(SendRequest::Identity {
            template_name: VERIFICATION_TEMPLATE.to_string(),
            email,
        })
        .await
    }

    /// Send any configured template to an explicit recipient.
    pub async fn send(&self, options: SendOptions) -> Result<DeliveryResult, MailError> {
        self.send_request(&SendRequest::Direct(options)).await
    }

    /// Run a request through the pipeline and return the result.
    pub async fn send_request(&self, request: &SendRequest) -> Result<DeliveryResult, MailError> {
        let span = tracing::info_span!(
            "templated_mail.send",
            template = request.template_name(),
            mode = request.mode(),
        );
        self.pipeline.run(request).instrument(span).await
    }

    /// Render a request without composing or sending it.
    pub async fn prepare(&self, request: &SendRequest) -> Result<OutgoingMessage, MailError> {
        self.pipeline.prepare(request).await
    }

    async fn send_logged(&self, request: SendRequest) -> Option<DeliveryResult> {
        match self.send_request(&request).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::error!(
                    template = request.template_name(),
                    error = %e,
                    "Failed to send templated email"
                );
                None
            }
        }
    }

    /// The configured templates.
    pub fn templates(&self) -> &TemplateStore {
        &self.pipeline.store
    }

    /// The template body cache.
    pub fn cache(&self) -> &RenderCache {
        &self.pipeline.cache
    }

    /// Name of the delivery provider.
    pub fn provider_name(&self) -> &'static str {
        self.pipeline.mailer.provider_name()
    }
}

/// Builder for [`MailAdapter`] that allows swapping collaborators.
pub struct MailAdapterBuilder {
    config: AdapterConfig,
    loader: Option<Arc<dyn TemplateLoader>>,
    renderer: Option<Arc<dyn Renderer>>,
    composer: Option<Arc<dyn MimeComposer>>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl MailAdapterBuilder {
    /// Use a custom template loader (default: [`FsLoader`]).
    pub fn loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Use a custom renderer (default: [`HandlebarsRenderer`]).
    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    /// Use a custom MIME composer (default: [`LettreComposer`]).
    pub fn composer(mut self, composer: impl MimeComposer + 'static) -> Self {
        self.composer = Some(Arc::new(composer));
        self
    }

    /// Use a custom delivery client (default: Mailgun).
    pub fn mailer(mut self, mailer: impl Mailer + 'static) -> Self {
        self.mailer = Some(Arc::new(mailer));
        self
    }

    /// Validate the configuration and build the adapter.
    pub fn build(self) -> Result<MailAdapter, MailError> {
        let config = self.config;
        config.validate()?;

        Address::parse(&config.from_address).map_err(|e| {
            MailError::Configuration(format!("invalid from address: {}", e))
        })?;

        let mailer = match self.mailer {
            Some(mailer) => mailer,
            None => default_mailer(&config)?,
        };
        mailer.validate_config()?;

        let loader = self.loader.unwrap_or_else(|| match &config.template_dir {
            Some(dir) => Arc::new(FsLoader::with_root(dir)),
            None => Arc::new(FsLoader::new()),
        });

        let store = TemplateStore::new(config.templates)?;

        tracing::debug!(
            templates = store.len(),
            provider = mailer.provider_name(),
            "Mail adapter ready"
        );

        Ok(MailAdapter {
            pipeline: Pipeline {
                store,
                cache: RenderCache::new(),
                from_address: config.from_address,
                loader,
                renderer: self
                    .renderer
                    .unwrap_or_else(|| Arc::new(HandlebarsRenderer::new())),
                composer: self.composer.unwrap_or_else(|| Arc::new(LettreComposer::new())),
                mailer,
            },
        })
    }
}

#[cfg(feature = "mailgun")]
fn default_mailer(config: &AdapterConfig) -> Result<Arc<dyn Mailer>, MailError> {
    let mut mailer = crate::providers::MailgunMailer::new(&config.api_key, &config.domain);
    if let Some(host) = &config.host {
        mailer = mailer.host(host);
    }
    Ok(Arc::new(mailer))
}

#[cfg(not(feature = "mailgun"))]
fn default_mailer(_config: &AdapterConfig) -> Result<Arc<dyn Mailer>, MailError> {
    Err(MailError::Configuration(
        "no mailer configured and the 'mailgun' feature is not enabled. \
        Call MailAdapterBuilder::mailer or add `features = [\"mailgun\"]` to Cargo.toml"
            .into(),
    ))
}
