//! Acknowledgement tracking and the expiry sweep.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::binding::DEFAULT_ACK_EXPIRY_DAYS;
use crate::error::Result;
use crate::store::Store;

/// Actor id recorded on receipts the sweep acknowledges.
pub const AUTO_ACK_ACTOR_ID: &str = "system:auto-ack";
/// Display name recorded on receipts the sweep acknowledges.
pub const AUTO_ACK_DISPLAY_NAME: &str = "Auto-acknowledged";

/// Acknowledged-or-not, every receipt is dropped after this long. The dedup
/// window is bounded by the provider's unread filter, so old rows are only
/// audit history.
const RETENTION_DAYS: i64 = 30;

const SECONDS_PER_DAY: i64 = 86_400;

/// Counters from one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Receipts auto-acknowledged this sweep.
    pub auto_acknowledged: u64,
    /// Receipts dropped by the retention cutoff.
    pub pruned: u64,
}

/// Applies acknowledgements and runs the periodic expiry sweep.
#[derive(Debug, Clone)]
pub struct AckEngine {
    store: Store,
}

impl AckEngine {
    /// Creates an engine over the shared store.
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Records an acknowledgement by `actor_id`.
    ///
    /// Repeated acknowledgements never error; the last actor and timestamp
    /// overwrite earlier ones. Returns `false` only when no receipt carries
    /// the delivery id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn acknowledge(
        &self,
        delivery_id: &str,
        actor_id: &str,
        display_name: &str,
    ) -> Result<bool> {
        let applied = self
            .store
            .receipts()
            .mark_acknowledged(delivery_id, actor_id, display_name, Utc::now())
            .await?;
        if applied {
            debug!(delivery_id, actor = actor_id, "Receipt acknowledged");
        }
        Ok(applied)
    }

    /// Auto-acknowledges unacknowledged receipts past their binding's expiry
    /// window, then prunes everything past the retention cutoff.
    ///
    /// Bindings with a 0-day policy are skipped; receipts whose binding has
    /// been deleted fall back to the default window.
    ///
    /// # Errors
    ///
    /// Returns an error if a database operation fails.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepStats> {
        let receipts = self.store.receipts();

        let expiry_by_scope: HashMap<(String, String), i64> = self
            .store
            .bindings()
            .list_all()
            .await?
            .into_iter()
            .map(|b| {
                (
                    (b.channel_id.clone(), b.mailbox_address.clone()),
                    b.effective_expiry_days(),
                )
            })
            .collect();

        let mut stats = SweepStats::default();

        for receipt in receipts.list_unacknowledged().await? {
            let scope = (receipt.channel_id.clone(), receipt.mailbox_address.clone());
            let days = expiry_by_scope
                .get(&scope)
                .copied()
                .unwrap_or(DEFAULT_ACK_EXPIRY_DAYS);
            if days == 0 {
                continue;
            }
            if receipt.age_seconds(now) < days * SECONDS_PER_DAY {
                continue;
            }
            let applied = receipts
                .mark_acknowledged(
                    &receipt.delivery_id,
                    AUTO_ACK_ACTOR_ID,
                    AUTO_ACK_DISPLAY_NAME,
                    now,
                )
                .await?;
            if applied {
                stats.auto_acknowledged += 1;
            }
        }

        let cutoff = now - Duration::days(RETENTION_DAYS);
        stats.pruned = receipts.delete_older_than(cutoff).await?;

        if stats.auto_acknowledged > 0 || stats.pruned > 0 {
            info!(
                auto_acknowledged = stats.auto_acknowledged,
                pruned = stats.pruned,
                "Expiry sweep applied changes"
            );
        }

        Ok(stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::binding::MailboxBinding;
    use crate::receipt::DeliveryReceipt;

    const CHANNEL: &str = "chan-1";
    const MAILBOX: &str = "ops@example.com";

    fn receipt(delivery_id: &str, created_at: DateTime<Utc>) -> DeliveryReceipt {
        DeliveryReceipt {
            delivery_id: delivery_id.to_string(),
            source_message_id: format!("src-{delivery_id}"),
            channel_id: CHANNEL.to_string(),
            mailbox_address: MAILBOX.to_string(),
            sender: Some("a@x.com".to_string()),
            subject: "subject".to_string(),
            received_at: None,
            preview: "preview".to_string(),
            body: "body".to_string(),
            created_at,
            acknowledged_by: None,
            acknowledged_by_name: None,
            acknowledged_at: None,
        }
    }

    async fn store_with_expiry(days: i64) -> Store {
        let store = Store::in_memory().await.unwrap();
        store
            .bindings()
            .upsert(&MailboxBinding::new(CHANNEL, MAILBOX, MAILBOX).with_ack_expiry_days(days))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_repeated_ack_overwrites_actor() {
        let store = store_with_expiry(5).await;
        let engine = AckEngine::new(store.clone());
        store.receipts().save(&receipt("d-1", Utc::now())).await.unwrap();

        assert!(engine.acknowledge("d-1", "user-1", "Alice").await.unwrap());
        assert!(engine.acknowledge("d-1", "user-2", "Bob").await.unwrap());

        let saved = store.receipts().get("d-1").await.unwrap().unwrap();
        assert_eq!(saved.acknowledged_by.as_deref(), Some("user-2"));
        assert_eq!(saved.acknowledged_by_name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_ack_of_unknown_receipt_is_noop() {
        let store = store_with_expiry(5).await;
        let engine = AckEngine::new(store);
        assert!(!engine.acknowledge("missing", "user-1", "Alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_auto_acks_aged_receipts_once() {
        let store = store_with_expiry(5).await;
        let engine = AckEngine::new(store.clone());
        let now = Utc::now();

        store
            .receipts()
            .save(&receipt("old", now - Duration::days(6)))
            .await
            .unwrap();
        store
            .receipts()
            .save(&receipt("fresh", now - Duration::days(2)))
            .await
            .unwrap();

        let stats = engine.sweep(now).await.unwrap();
        assert_eq!(stats.auto_acknowledged, 1);

        let old = store.receipts().get("old").await.unwrap().unwrap();
        assert_eq!(old.acknowledged_by.as_deref(), Some(AUTO_ACK_ACTOR_ID));
        assert_eq!(
            old.acknowledged_by_name.as_deref(),
            Some(AUTO_ACK_DISPLAY_NAME)
        );

        let fresh = store.receipts().get("fresh").await.unwrap().unwrap();
        assert!(!fresh.is_acknowledged());

        // Second sweep finds nothing new.
        let stats = engine.sweep(now).await.unwrap();
        assert_eq!(stats.auto_acknowledged, 0);
    }

    #[tokio::test]
    async fn test_zero_day_policy_never_auto_acks() {
        let store = store_with_expiry(0).await;
        let engine = AckEngine::new(store.clone());
        let now = Utc::now();

        store
            .receipts()
            .save(&receipt("ancient", now - Duration::days(20)))
            .await
            .unwrap();

        let stats = engine.sweep(now).await.unwrap();
        assert_eq!(stats.auto_acknowledged, 0);
        assert!(
            !store
                .receipts()
                .get("ancient")
                .await
                .unwrap()
                .unwrap()
                .is_acknowledged()
        );
    }

    #[tokio::test]
    async fn test_orphaned_receipts_use_default_window() {
        // No binding exists for the receipt's scope.
        let store = Store::in_memory().await.unwrap();
        let engine = AckEngine::new(store.clone());
        let now = Utc::now();

        store
            .receipts()
            .save(&receipt("orphan-old", now - Duration::days(DEFAULT_ACK_EXPIRY_DAYS + 1)))
            .await
            .unwrap();
        store
            .receipts()
            .save(&receipt("orphan-new", now - Duration::days(DEFAULT_ACK_EXPIRY_DAYS - 1)))
            .await
            .unwrap();

        let stats = engine.sweep(now).await.unwrap();
        assert_eq!(stats.auto_acknowledged, 1);
    }

    #[tokio::test]
    async fn test_sweep_prunes_past_retention_regardless_of_ack_state() {
        let store = store_with_expiry(0).await;
        let engine = AckEngine::new(store.clone());
        let now = Utc::now();

        store
            .receipts()
            .save(&receipt("stale", now - Duration::days(31)))
            .await
            .unwrap();
        store
            .receipts()
            .save(&receipt("kept", now - Duration::days(29)))
            .await
            .unwrap();

        let stats = engine.sweep(now).await.unwrap();
        assert_eq!(stats.pruned, 1);
        assert!(store.receipts().get("stale").await.unwrap().is_none());
        assert!(store.receipts().get("kept").await.unwrap().is_some());
    }
}
