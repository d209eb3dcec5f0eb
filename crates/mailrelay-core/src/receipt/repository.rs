//! Receipt storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::DeliveryReceipt;
use crate::Result;
use crate::normalize::normalize_address;
use crate::store::epoch_to_datetime;

/// Repository for delivery receipts.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
}

impl ReceiptRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS delivery_receipts (
                delivery_id TEXT PRIMARY KEY,
                source_message_id TEXT NOT NULL,
                channel_id TEXT NOT NULL,
                mailbox_address TEXT NOT NULL,
                sender TEXT,
                subject TEXT NOT NULL DEFAULT '',
                received_at TEXT,
                preview TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                acknowledged_by TEXT,
                acknowledged_by_name TEXT,
                acknowledged_at INTEGER,
                UNIQUE(source_message_id, channel_id, mailbox_address)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_receipts_created_at
            ON delivery_receipts(created_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Dedup lookup by the composite delivery key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_delivery_key(
        &self,
        source_message_id: &str,
        channel_id: &str,
        mailbox_address: &str,
    ) -> Result<Option<DeliveryReceipt>> {
        let row = sqlx::query(
            r"
            SELECT delivery_id, source_message_id, channel_id, mailbox_address,
                   sender, subject, received_at, preview, body, created_at,
                   acknowledged_by, acknowledged_by_name, acknowledged_at
            FROM delivery_receipts
            WHERE source_message_id = ? AND channel_id = ? AND mailbox_address = ?
            ",
        )
        .bind(source_message_id)
        .bind(channel_id)
        .bind(normalize_address(mailbox_address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_receipt(&r)))
    }

    /// Fetches a receipt by its delivery id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, delivery_id: &str) -> Result<Option<DeliveryReceipt>> {
        let row = sqlx::query(
            r"
            SELECT delivery_id, source_message_id, channel_id, mailbox_address,
                   sender, subject, received_at, preview, body, created_at,
                   acknowledged_by, acknowledged_by_name, acknowledged_at
            FROM delivery_receipts
            WHERE delivery_id = ?
            ",
        )
        .bind(delivery_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_receipt(&r)))
    }

    /// Saves a receipt, upserting on the delivery id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; in particular the
    /// dedup unique index rejects a second receipt for the same source
    /// message in the same scope.
    pub async fn save(&self, receipt: &DeliveryReceipt) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO delivery_receipts
                (delivery_id, source_message_id, channel_id, mailbox_address,
                 sender, subject, received_at, preview, body, created_at,
                 acknowledged_by, acknowledged_by_name, acknowledged_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(delivery_id) DO UPDATE SET
                sender = excluded.sender,
                subject = excluded.subject,
                received_at = excluded.received_at,
                preview = excluded.preview,
                body = excluded.body,
                acknowledged_by = excluded.acknowledged_by,
                acknowledged_by_name = excluded.acknowledged_by_name,
                acknowledged_at = excluded.acknowledged_at
            ",
        )
        .bind(&receipt.delivery_id)
        .bind(&receipt.source_message_id)
        .bind(&receipt.channel_id)
        .bind(normalize_address(&receipt.mailbox_address))
        .bind(&receipt.sender)
        .bind(&receipt.subject)
        .bind(&receipt.received_at)
        .bind(&receipt.preview)
        .bind(&receipt.body)
        .bind(receipt.created_at.timestamp())
        .bind(&receipt.acknowledged_by)
        .bind(&receipt.acknowledged_by_name)
        .bind(receipt.acknowledged_at.map(|t| t.timestamp()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Records an acknowledgement. Last write wins: acknowledging an
    /// already-acknowledged receipt overwrites the actor and timestamp
    /// without error.
    ///
    /// Returns `false` when no receipt carries the delivery id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn mark_acknowledged(
        &self,
        delivery_id: &str,
        actor_id: &str,
        display_name: &str,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let updated = sqlx::query(
            r"
            UPDATE delivery_receipts
            SET acknowledged_by = ?, acknowledged_by_name = ?, acknowledged_at = ?
            WHERE delivery_id = ?
            ",
        )
        .bind(actor_id)
        .bind(display_name)
        .bind(at.timestamp())
        .bind(delivery_id)
        .execute(&self.pool)
        .await?;

        Ok(updated.rows_affected() > 0)
    }

    /// Lists every unacknowledged receipt, oldest first. The sweep walks
    /// this.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_unacknowledged(&self) -> Result<Vec<DeliveryReceipt>> {
        let rows = sqlx::query(
            r"
            SELECT delivery_id, source_message_id, channel_id, mailbox_address,
                   sender, subject, received_at, preview, body, created_at,
                   acknowledged_by, acknowledged_by_name, acknowledged_at
            FROM delivery_receipts
            WHERE acknowledged_at IS NULL
            ORDER BY created_at ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_receipt).collect())
    }

    /// Deletes receipts created before the cutoff, acknowledged or not.
    /// Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM delivery_receipts WHERE created_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected())
    }
}

fn row_to_receipt(row: &SqliteRow) -> DeliveryReceipt {
    DeliveryReceipt {
        delivery_id: row.get("delivery_id"),
        source_message_id: row.get("source_message_id"),
        channel_id: row.get("channel_id"),
        mailbox_address: row.get("mailbox_address"),
        sender: row.get("sender"),
        subject: row.get("subject"),
        received_at: row.get("received_at"),
        preview: row.get("preview"),
        body: row.get("body"),
        created_at: epoch_to_datetime(row.get("created_at")),
        acknowledged_by: row.get("acknowledged_by"),
        acknowledged_by_name: row.get("acknowledged_by_name"),
        acknowledged_at: row
            .get::<Option<i64>, _>("acknowledged_at")
            .map(epoch_to_datetime),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Store;
    use chrono::Duration;

    fn receipt(delivery_id: &str, source_id: &str) -> DeliveryReceipt {
        DeliveryReceipt {
            delivery_id: delivery_id.to_string(),
            source_message_id: source_id.to_string(),
            channel_id: "chan-1".to_string(),
            mailbox_address: "ops@example.com".to_string(),
            sender: Some("a@b.c".to_string()),
            subject: "Subject".to_string(),
            received_at: Some("2024-06-01T10:00:00Z".to_string()),
            preview: "preview".to_string(),
            body: "body".to_string(),
            created_at: Utc::now(),
            acknowledged_by: None,
            acknowledged_by_name: None,
            acknowledged_at: None,
        }
    }

    #[tokio::test]
    async fn test_save_and_find_by_delivery_key() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        repo.save(&receipt("msg-1", "src-1")).await.unwrap();

        let found = repo
            .find_by_delivery_key("src-1", "chan-1", "OPS@Example.com")
            .await
            .unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().delivery_id, "msg-1");

        // Same source id in a different scope is a different key.
        assert!(
            repo.find_by_delivery_key("src-1", "chan-2", "ops@example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            repo.find_by_delivery_key("src-1", "chan-1", "other@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_dedup_key_is_unique() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        repo.save(&receipt("msg-1", "src-1")).await.unwrap();
        // A different delivery id for the same source message violates the
        // dedup index.
        assert!(repo.save(&receipt("msg-2", "src-1")).await.is_err());
    }

    #[tokio::test]
    async fn test_repeated_acknowledgement_last_write_wins() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        repo.save(&receipt("msg-1", "src-1")).await.unwrap();

        let t1 = Utc::now();
        assert!(
            repo.mark_acknowledged("msg-1", "user-1", "Alice", t1)
                .await
                .unwrap()
        );
        let t2 = t1 + Duration::seconds(30);
        assert!(
            repo.mark_acknowledged("msg-1", "user-2", "Bob", t2)
                .await
                .unwrap()
        );

        let stored = repo.get("msg-1").await.unwrap().unwrap();
        assert_eq!(stored.acknowledged_by.as_deref(), Some("user-2"));
        assert_eq!(stored.acknowledged_by_name.as_deref(), Some("Bob"));
        assert_eq!(stored.acknowledged_at.unwrap().timestamp(), t2.timestamp());
    }

    #[tokio::test]
    async fn test_acknowledge_unknown_delivery_is_noop() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        assert!(
            !repo
                .mark_acknowledged("missing", "user-1", "Alice", Utc::now())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_list_unacknowledged_excludes_acked() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        repo.save(&receipt("msg-1", "src-1")).await.unwrap();
        repo.save(&receipt("msg-2", "src-2")).await.unwrap();
        repo.mark_acknowledged("msg-1", "user-1", "Alice", Utc::now())
            .await
            .unwrap();

        let pending = repo.list_unacknowledged().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delivery_id, "msg-2");
    }

    #[tokio::test]
    async fn test_delete_older_than_ignores_ack_state() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.receipts();

        let mut old_acked = receipt("msg-1", "src-1");
        old_acked.created_at = Utc::now() - Duration::days(40);
        old_acked.acknowledged_by = Some("user-1".to_string());
        old_acked.acknowledged_at = Some(Utc::now() - Duration::days(39));
        repo.save(&old_acked).await.unwrap();

        let mut old_pending = receipt("msg-2", "src-2");
        old_pending.created_at = Utc::now() - Duration::days(35);
        repo.save(&old_pending).await.unwrap();

        repo.save(&receipt("msg-3", "src-3")).await.unwrap();

        let removed = repo
            .delete_older_than(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(repo.get("msg-3").await.unwrap().is_some());
    }
}
