//! Delivery client implementations.
//!
//! Each provider implements the [`Mailer`](crate::Mailer) trait.
//!
//! ## Available Providers
//!
//! | Provider | Feature Flag | Description |
//! |----------|-------------|-------------|
//! | [`MailgunMailer`] | `mailgun` | Mailgun `messages.mime` API |
//! | [`LocalMailer`] | `local` | In-memory capture for dev/testing |
//! | [`LoggerMailer`] | (none) | Logs messages without sending |

#[cfg(feature = "mailgun")]
mod mailgun;
#[cfg(feature = "mailgun")]
pub use mailgun::MailgunMailer;

#[cfg(feature = "local")]
mod local;
#[cfg(feature = "local")]
pub use local::LocalMailer;

mod logger;
pub use logger::LoggerMailer;
