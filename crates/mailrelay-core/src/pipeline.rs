//! Per-binding delivery pipeline.
//!
//! One `run_once` call processes a single mailbox binding: resolve
//! credentials, fetch unread mail, drop duplicates and rule matches, hand
//! the survivors to the notifier, record receipts and mark the source
//! messages read.

use chrono::Utc;
use tracing::{debug, warn};

use crate::binding::MailboxBinding;
use crate::credential::valid_token;
use crate::error::PollError;
use crate::normalize::{FULL_BODY_MAX_CHARS, PREVIEW_MAX_CHARS, clean_body, preview};
use crate::notify::{Notifier, OutboundNotification};
use crate::provider::{FetchedMessage, MailFolder, MailboxProvider};
use crate::receipt::DeliveryReceipt;
use crate::store::Store;

/// Fetch → filter → deliver → record, for one binding at a time.
#[derive(Debug)]
pub struct DeliveryPipeline<P, N> {
    store: Store,
    provider: P,
    notifier: N,
}

impl<P: MailboxProvider, N: Notifier> DeliveryPipeline<P, N> {
    /// Creates a pipeline over an explicit store and the two collaborators.
    pub const fn new(store: Store, provider: P, notifier: N) -> Self {
        Self {
            store,
            provider,
            notifier,
        }
    }

    /// Runs one polling pass for a binding.
    ///
    /// # Errors
    ///
    /// Returns a [`PollError`] that skips the binding for this cycle:
    /// missing credential resource, failed token exchange, failed fetch, or
    /// a storage failure. Delivery failures skip only the affected message;
    /// mark-read failures are logged and ignored.
    pub async fn run_once(&self, binding: &MailboxBinding) -> Result<(), PollError> {
        let credentials = self.store.credentials();
        let Some(resource) = credentials.get(&binding.resource_id).await? else {
            return Err(PollError::Configuration {
                resource_id: binding.resource_id.clone(),
                mailbox: binding.mailbox_address.clone(),
            });
        };

        let token = valid_token(&self.provider, &credentials, &resource).await?;

        let mut messages = self
            .provider
            .fetch_unread(&token, &binding.mailbox_address, MailFolder::Primary)
            .await
            .map_err(|e| PollError::Fetch(e.to_string()))?;

        // Junk is a fallback, not a second stream: only consulted when the
        // inbox had nothing and the binding opted in.
        if messages.is_empty() && binding.check_junk {
            messages = self
                .provider
                .fetch_unread(&token, &binding.mailbox_address, MailFolder::Junk)
                .await
                .map_err(|e| PollError::Fetch(e.to_string()))?;
        }

        if messages.is_empty() {
            return Ok(());
        }

        debug!(
            channel = %binding.channel_id,
            mailbox = %binding.mailbox_address,
            count = messages.len(),
            "Processing unread messages"
        );

        for message in messages {
            if let Err(e) = self.process_message(binding, &token, &message).await {
                match e {
                    PollError::Delivery(_) => {
                        // The message stays unread upstream and has no
                        // receipt, so the next fetch retries it.
                        warn!(
                            channel = %binding.channel_id,
                            message_id = %message.id,
                            error = %e,
                            "Delivery failed; message will be retried next cycle"
                        );
                    }
                    other => return Err(other),
                }
            }
        }

        Ok(())
    }

    async fn process_message(
        &self,
        binding: &MailboxBinding,
        token: &str,
        message: &FetchedMessage,
    ) -> Result<(), PollError> {
        let receipts = self.store.receipts();

        let already_handled = receipts
            .find_by_delivery_key(&message.id, &binding.channel_id, &binding.mailbox_address)
            .await?
            .is_some();
        if already_handled {
            // Delivered in an earlier cycle but the provider still reports
            // it unread; retry the read-mark only.
            self.mark_read_best_effort(binding, token, &message.id).await;
            return Ok(());
        }

        let rules = self
            .store
            .rules()
            .list_for_scope(&binding.channel_id, &binding.mailbox_address)
            .await?;
        if crate::rules::is_suppressed(&rules, message.from.as_deref(), &message.subject) {
            debug!(
                channel = %binding.channel_id,
                message_id = %message.id,
                "Message suppressed by rule"
            );
            self.mark_read_best_effort(binding, token, &message.id).await;
            return Ok(());
        }

        let cleaned = clean_body(&message.body, message.body_format);
        let body_preview = preview(&cleaned, PREVIEW_MAX_CHARS);
        let full_body = preview(&cleaned, FULL_BODY_MAX_CHARS).text;

        let notification = OutboundNotification {
            sender: message.from.clone(),
            subject: message.subject.clone(),
            received_at: message.received_at.clone(),
            preview: body_preview.text.clone(),
            truncated: body_preview.truncated,
        };

        let delivery_id = self
            .notifier
            .post(&binding.channel_id, &notification)
            .await
            .map_err(|e| PollError::Delivery(e.to_string()))?;

        receipts
            .save(&DeliveryReceipt {
                delivery_id,
                source_message_id: message.id.clone(),
                channel_id: binding.channel_id.clone(),
                mailbox_address: binding.mailbox_address.clone(),
                sender: message.from.clone(),
                subject: message.subject.clone(),
                received_at: message.received_at.clone(),
                preview: body_preview.text,
                body: full_body,
                created_at: Utc::now(),
                acknowledged_by: None,
                acknowledged_by_name: None,
                acknowledged_at: None,
            })
            .await?;

        self.mark_read_best_effort(binding, token, &message.id).await;
        Ok(())
    }

    /// Mark-read failures never affect dedup correctness (the receipt is
    /// already persisted when this runs after a delivery), so they are
    /// logged and swallowed.
    async fn mark_read_best_effort(
        &self,
        binding: &MailboxBinding,
        token: &str,
        message_id: &str,
    ) {
        if let Err(e) = self
            .provider
            .mark_read(token, &binding.mailbox_address, message_id)
            .await
        {
            let err = PollError::MarkRead {
                message_id: message_id.to_string(),
                reason: e.to_string(),
            };
            warn!(
                channel = %binding.channel_id,
                mailbox = %binding.mailbox_address,
                error = %err,
                "Failed to mark message read"
            );
        }
    }
}
