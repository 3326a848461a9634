//! Local mailer for development and testing.
//!
//! Captures composed MIME documents in memory instead of sending them, for
//! programmatic assertions in tests.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use templated_mail::providers::LocalMailer;
//! use templated_mail::testing::*;
//!
//! #[tokio::test]
//! async fn sends_reset_email() {
//!     let mailer = Arc::new(LocalMailer::new());
//!     let adapter = MailAdapter::builder(config).mailer(Arc::clone(&mailer)).build()?;
//!
//!     adapter.send_password_reset_email(reset).await;
//!
//!     assert_email_sent(&mailer);
//!     assert_email_to(&mailer, "user@example.com");
//!     assert_email_subject_contains(&mailer, "Reset");
//! }
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::storage::{MemoryStorage, StoredMessage};

/// Local mailer that stores MIME documents in memory.
pub struct LocalMailer {
    storage: Arc<MemoryStorage>,
    /// If set, send_mime() will return this error (for testing error paths).
    fail_with: RwLock<Option<String>>,
}

impl LocalMailer {
    /// Create a new local mailer with fresh storage.
    pub fn new() -> Self {
        Self::with_storage(MemoryStorage::shared())
    }

    /// Create a local mailer with existing storage.
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self {
            storage,
            fail_with: RwLock::new(None),
        }
    }

    /// Get a reference to the underlying storage.
    pub fn storage(&self) -> Arc<MemoryStorage> {
        Arc::clone(&self.storage)
    }

    // =========================================================================
    // Failure Simulation (for testing)
    // =========================================================================

    /// Configure the mailer to fail with an error message.
    pub fn set_failure(&self, message: impl Into<String>) {
        *self.fail_with.write() = Some(message.into());
    }

    /// Clear the failure state.
    pub fn clear_failure(&self) {
        *self.fail_with.write() = None;
    }

    // =========================================================================
    // Message Access (for testing assertions)
    // =========================================================================

    /// Get all captured messages (newest first).
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.storage.all()
    }

    /// Get the most recently sent message.
    pub fn last_message(&self) -> Option<StoredMessage> {
        self.storage.all().into_iter().next()
    }

    /// Get the count of sent messages.
    pub fn message_count(&self) -> usize {
        self.storage.count()
    }

    /// Clear all captured messages.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Remove and return all captured messages.
    pub fn flush(&self) -> Vec<StoredMessage> {
        self.storage.flush()
    }

    /// Check if any message was sent.
    pub fn has_messages(&self) -> bool {
        self.storage.count() > 0
    }

    /// Check if a message was sent to a specific address.
    pub fn sent_to(&self, email: &str) -> bool {
        self.storage
            .all()
            .iter()
            .any(|stored| stored.to.eq_ignore_ascii_case(email))
    }

    /// Find messages matching a predicate.
    pub fn find_messages<F>(&self, predicate: F) -> Vec<StoredMessage>
    where
        F: Fn(&StoredMessage) -> bool,
    {
        self.storage
            .all()
            .into_iter()
            .filter(|stored| predicate(stored))
            .collect()
    }
}

impl Default for LocalMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mailer for LocalMailer {
    async fn send_mime(&self, to: &str, mime: &str) -> Result<DeliveryResult, MailError> {
        if let Some(message) = self.fail_with.read().clone() {
            return Err(MailError::provider("local", message));
        }

        let message_id = self.storage.push(to, mime);
        Ok(DeliveryResult::new(message_id))
    }

    fn provider_name(&self) -> &'static str {
        "local"
    }
}
