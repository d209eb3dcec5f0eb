//! Binding model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::normalize_address;

/// Days after which an unacknowledged notification is auto-acknowledged,
/// unless the binding overrides it.
pub const DEFAULT_ACK_EXPIRY_DAYS: i64 = 5;

/// Unique identifier for a mailbox binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingId(pub i64);

impl BindingId {
    /// Create a new binding ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BindingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured (channel, mailbox) pairing with its relay policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxBinding {
    /// Unique identifier (None for unsaved bindings).
    pub id: Option<BindingId>,
    /// Owning chat channel id.
    pub channel_id: String,
    /// Mailbox address, always stored in canonical form.
    pub mailbox_address: String,
    /// Optional display alias for the mailbox.
    pub alias: Option<String>,
    /// Days before auto-acknowledgement. 0 disables auto-ack.
    pub ack_expiry_days: i64,
    /// Whether the junk folder is consulted when the inbox is empty.
    pub check_junk: bool,
    /// Id of the credential resource backing this mailbox.
    pub resource_id: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl MailboxBinding {
    /// Creates an unsaved binding with default policy.
    ///
    /// The mailbox address is canonicalized here; everything downstream
    /// assumes it already is.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        mailbox_address: &str,
        resource_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            channel_id: channel_id.into(),
            mailbox_address: normalize_address(mailbox_address),
            alias: None,
            ack_expiry_days: DEFAULT_ACK_EXPIRY_DAYS,
            check_junk: false,
            resource_id: resource_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the display alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the auto-ack expiry in days (0 disables).
    #[must_use]
    pub const fn with_ack_expiry_days(mut self, days: i64) -> Self {
        self.ack_expiry_days = days;
        self
    }

    /// Enables junk-folder checking.
    #[must_use]
    pub const fn with_check_junk(mut self, check_junk: bool) -> Self {
        self.check_junk = check_junk;
        self
    }

    /// The auto-ack policy actually applied by the sweep: invalid (negative)
    /// values fall back to the default, 0 means never.
    #[must_use]
    pub const fn effective_expiry_days(&self) -> i64 {
        if self.ack_expiry_days < 0 {
            DEFAULT_ACK_EXPIRY_DAYS
        } else {
            self.ack_expiry_days
        }
    }
}
