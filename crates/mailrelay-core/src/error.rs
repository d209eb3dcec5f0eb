//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while processing one binding during a polling cycle.
///
/// Each variant carries the retry policy described in the scheduler docs:
/// `Configuration`, `Credential` and `Fetch` skip the binding for the current
/// cycle; `Delivery` skips only the affected message; `MarkRead` is logged
/// and never propagated past the mark-read call site.
#[derive(Debug, Error)]
pub enum PollError {
    /// The binding references a credential resource that does not exist.
    #[error("No credential resource '{resource_id}' for mailbox {mailbox}")]
    Configuration {
        /// Referenced resource id.
        resource_id: String,
        /// Mailbox address of the binding.
        mailbox: String,
    },

    /// App-only token exchange failed.
    #[error("Credential exchange failed: {0}")]
    Credential(String),

    /// Unread-message fetch failed.
    #[error("Unread fetch failed: {0}")]
    Fetch(String),

    /// The notifier failed to deliver a message.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Marking a source message read failed. Non-fatal.
    #[error("Mark-read failed for message {message_id}: {reason}")]
    MarkRead {
        /// Source message id.
        message_id: String,
        /// Provider error text.
        reason: String,
    },

    /// Local storage failed mid-cycle.
    #[error(transparent)]
    Storage(#[from] Error),
}

impl From<sqlx::Error> for PollError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(Error::Database(err))
    }
}
