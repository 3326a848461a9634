//! Email address type with optional display name.

use crate::error::MailError;
use email_address::EmailAddress;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An email address with an optional display name.
///
/// # Examples
///
/// ```
/// use templated_mail::Address;
///
/// let addr = Address::parse("user@example.com").unwrap();
/// assert_eq!(addr.email, "user@example.com");
/// assert_eq!(addr.name, None);
///
/// let addr = Address::parse("My App <noreply@example.com>").unwrap();
/// assert_eq!(addr.email, "noreply@example.com");
/// assert_eq!(addr.name.as_deref(), Some("My App"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Optional display name (e.g., "Alice Smith")
    pub name: Option<String>,
    /// Email address (e.g., "alice@example.com")
    pub email: String,
}

impl Address {
    /// Create a new address with just an email.
    ///
    /// No validation happens here; use [`Address::parse`] for that.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new address with a name and email.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse a header-style address: `user@example.com` or `Name <user@example.com>`.
    ///
    /// The address part is validated with RFC 5321/5322 rules. Surrounding
    /// double quotes on the display name are stripped.
    pub fn parse(input: &str) -> Result<Self, MailError> {
        let input = input.trim();

        let (name, email) = match (input.rfind('<'), input.ends_with('>')) {
            (Some(open), true) => {
                let name = input[..open].trim().trim_matches('"').trim();
                let email = input[open + 1..input.len() - 1].trim();
                ((!name.is_empty()).then(|| name.to_string()), email)
            }
            _ => (None, input),
        };

        if !EmailAddress::is_valid(email) {
            return Err(MailError::InvalidAddress(format!(
                "'{}' is not a valid email address",
                input
            )));
        }

        Ok(Self {
            name,
            email: email.to_string(),
        })
    }

    /// Parse one or more addresses out of a message extra field.
    ///
    /// Accepts a string (comma separated), an object `{name, address}`, or a
    /// list of either.
    pub fn list_from_value(value: &Value) -> Result<Vec<Self>, MailError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::String(s) => s
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(Self::parse)
                .collect(),
            Value::Object(obj) => {
                let email = obj
                    .get("address")
                    .or_else(|| obj.get("email"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        MailError::InvalidAddress(format!("missing address in {}", value))
                    })?;
                let mut addr = Self::parse(email)?;
                if let Some(name) = obj.get("name").and_then(Value::as_str) {
                    addr.name = Some(name.to_string());
                }
                Ok(vec![addr])
            }
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.extend(Self::list_from_value(item)?);
                }
                Ok(out)
            }
            other => Err(MailError::InvalidAddress(format!(
                "unsupported address value: {}",
                other
            ))),
        }
    }

    /// Format as "Name <email>" or just "email" if no name.
    pub fn formatted(&self) -> String {
        match &self.name {
            Some(name) if name.is_empty() => self.email.clone(),
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }

    /// Convert to lettre's `Mailbox` for MIME headers.
    pub fn to_mailbox(&self) -> Result<Mailbox, MailError> {
        let email = self.email.parse()?;
        Ok(Mailbox::new(
            self.name.clone().filter(|n| !n.is_empty()),
            email,
        ))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

impl From<&str> for Address {
    fn from(email: &str) -> Self {
        Self::new(email)
    }
}

impl From<(&str, &str)> for Address {
    fn from((name, email): (&str, &str)) -> Self {
        Self::with_name(name, email)
    }
}
