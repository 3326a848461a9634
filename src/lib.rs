//! # Templated Mail
//!
//! Templated transactional email for application platforms, delivered as
//! MIME documents through Mailgun.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use templated_mail::{AdapterConfig, IdentityEmail, MailAdapter, TemplateDescriptor, User};
//!
//! let adapter = MailAdapter::new(
//!     AdapterConfig::new(api_key, "mg.example.com", "My App <noreply@example.com>")
//!         .template_dir("templates")
//!         .template(
//!             "passwordResetEmail",
//!             TemplateDescriptor::new("Reset your password", "password_reset.txt")
//!                 .html("password_reset.html"),
//!         ),
//! )?;
//!
//! adapter
//!     .send_password_reset_email(IdentityEmail::new(link, "My App", User::new("alice", "a@b.com")))
//!     .await;
//! ```
//!
//! Template bodies are Handlebars templates. Identity emails see `link`,
//! `appName`, `username` and `email`, plus whatever the template's
//! [`Enricher`] returns. Direct sends see exactly the variables passed in
//! [`SendOptions`].
//!
//! ## Environment Variables
//!
//! [`MailAdapter::from_env`] reads:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MAILGUN_API_KEY` | Mailgun API key |
//! | `MAILGUN_DOMAIN` | Mailgun sending domain |
//! | `MAILGUN_FROM_ADDRESS` | Default sender (falls back to `EMAIL_FROM`) |
//! | `MAILGUN_HOST` | API host, e.g. `api.eu.mailgun.net` |
//! | `MAILGUN_TEMPLATE_DIR` | Root for relative template paths |
//! | `MAILGUN_TEMPLATES` | Path to a JSON template manifest |
//!
//! ## Feature Flags
//!
//! - `mailgun` - Mailgun delivery client (default)
//! - `local` - LocalMailer and test assertions (default)
//! - `metrics` - Prometheus-style metrics (counters/histograms)
//!
//! ## Metrics
//!
//! Enable `features = ["metrics"]` to emit:
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `templated_mail_emails_total` | Counter | template, provider, status | Total emails sent |
//! | `templated_mail_delivery_duration_seconds` | Histogram | provider | Delivery duration |
//!
//! Install a recorder (e.g., `metrics-exporter-prometheus`) in your app to collect them.

/// The version of the templated-mail crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod adapter;
mod address;
mod attachment;
mod cache;
mod config;
mod error;
mod identity;
mod loader;
mod mailer;
mod message;
mod mime;
mod pipeline;
mod render;
mod template;
mod variables;

pub mod providers;

#[cfg(feature = "local")]
mod storage;

#[cfg(feature = "local")]
pub mod testing;

// Re-exports
pub use adapter::{MailAdapter, MailAdapterBuilder};
pub use address::Address;
pub use attachment::{Attachment, AttachmentType};
pub use cache::{BodyKind, CachedBody, RenderCache};
pub use config::AdapterConfig;
pub use error::MailError;
pub use identity::{Identity, User};
pub use loader::{FsLoader, TemplateLoader};
pub use mailer::{DeliveryResult, Mailer};
pub use message::OutgoingMessage;
pub use mime::{LettreComposer, MimeComposer};
pub use pipeline::{IdentityEmail, SendOptions, SendRequest};
pub use render::{HandlebarsRenderer, Renderer};
pub use template::{
    Enricher, TemplateDescriptor, TemplateStore, PASSWORD_RESET_TEMPLATE, VERIFICATION_TEMPLATE,
};
pub use variables::Variables;

#[cfg(feature = "local")]
pub use storage::{MemoryStorage, StoredMessage};

/// Prelude for convenient imports.
///
/// ```rust
/// use templated_mail::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AdapterConfig, DeliveryResult, Identity, IdentityEmail, MailAdapter, MailError, Mailer,
        SendOptions, TemplateDescriptor, User,
    };
}
