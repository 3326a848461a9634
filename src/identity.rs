//! User identity handles passed in by the hosting platform.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Read access to a user record.
///
/// The password reset and verification emails read `username` and `email`
/// through this trait. Enrichers receive the same handle and may read any
/// other field.
pub trait Identity: Send + Sync {
    /// Get a field's value as a string.
    fn get(&self, field: &str) -> Option<String>;
}

impl Identity for Map<String, Value> {
    fn get(&self, field: &str) -> Option<String> {
        match Map::get(self, field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl Identity for HashMap<String, String> {
    fn get(&self, field: &str) -> Option<String> {
        HashMap::get(self, field).cloned()
    }
}

/// A minimal user record.
///
/// ```
/// use templated_mail::{Identity, User};
///
/// let user = User::new("alice", "alice@example.com").field("plan", "pro");
/// assert_eq!(user.get("username").as_deref(), Some("alice"));
/// assert_eq!(user.get("plan").as_deref(), Some("pro"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct User {
    fields: HashMap<String, String>,
}

impl User {
    /// Create a user with a username and email.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self::default()
            .field("username", username)
            .field("email", email)
    }

    /// Set an additional field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

impl Identity for User {
    fn get(&self, field: &str) -> Option<String> {
        self.fields.get(field).cloned()
    }
}
