//! Receipt model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of the delivery ledger: proof that a source message was posted to
/// a channel.
///
/// The delivery id (the posted chat message's id) is the primary key; the
/// `(source_message_id, channel_id, mailbox_address)` triple is the dedup
/// key that keeps a source message from ever being delivered twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Id assigned by the output channel to the posted message.
    pub delivery_id: String,
    /// Id assigned by the mailbox to the source message.
    pub source_message_id: String,
    /// Channel the notification was posted to.
    pub channel_id: String,
    /// Mailbox the message came from, canonical form.
    pub mailbox_address: String,
    /// Sender address, when known.
    pub sender: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Received timestamp as reported by the provider.
    pub received_at: Option<String>,
    /// Bounded preview that was posted.
    pub preview: String,
    /// Full normalized body backing the "show more" view.
    pub body: String,
    /// Time the receipt was created (delivery time).
    pub created_at: DateTime<Utc>,
    /// Acknowledging actor id; the auto-ack sentinel for system acks.
    pub acknowledged_by: Option<String>,
    /// Acknowledging actor display name.
    pub acknowledged_by_name: Option<String>,
    /// Acknowledgement time.
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl DeliveryReceipt {
    /// Whether the receipt has been acknowledged (by anyone, including the
    /// auto-ack sweep).
    #[must_use]
    pub const fn is_acknowledged(&self) -> bool {
        self.acknowledged_at.is_some()
    }

    /// Age of the receipt at `now`, in whole seconds.
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() - self.created_at.timestamp()
    }
}
