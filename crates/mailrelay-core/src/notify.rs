//! Notifier contract: hands surviving messages to the chat platform.

/// A message ready to be posted to a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundNotification {
    /// Sender address, when known.
    pub sender: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Received timestamp as reported by the provider.
    pub received_at: Option<String>,
    /// Cleaned, bounded body preview.
    pub preview: String,
    /// True when the preview was truncated and a fuller body exists.
    pub truncated: bool,
}

/// Posts notifications to the output channel.
///
/// `post` must return a stable identifier for the created chat message; the
/// pipeline keys the delivery receipt on it. Acknowledgement UI updates
/// (component edits, deletions) are the command layer's concern and are not
/// part of this contract.
pub trait Notifier {
    /// Notifier-specific error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Posts one notification to a channel and returns the delivery id.
    async fn post(
        &self,
        channel_id: &str,
        notification: &OutboundNotification,
    ) -> Result<String, Self::Error>;
}
