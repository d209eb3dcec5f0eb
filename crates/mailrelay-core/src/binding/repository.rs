//! Binding storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{BindingId, MailboxBinding};
use crate::normalize::normalize_address;
use crate::store::epoch_to_datetime;
use crate::{Error, Result};

/// Repository for mailbox bindings.
#[derive(Debug, Clone)]
pub struct BindingRepository {
    pool: SqlitePool,
}

impl BindingRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS mailbox_bindings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL,
                mailbox_address TEXT NOT NULL,
                alias TEXT,
                ack_expiry_days INTEGER NOT NULL DEFAULT 5,
                check_junk INTEGER NOT NULL DEFAULT 0,
                resource_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE(channel_id, mailbox_address)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates or updates a binding for its (channel, mailbox) scope.
    ///
    /// A mailbox address may be bound to at most one channel: if the address
    /// is already bound elsewhere, this fails with a configuration error
    /// rather than silently creating a second subscription.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a cross-channel conflict, or a database
    /// error.
    pub async fn upsert(&self, binding: &MailboxBinding) -> Result<MailboxBinding> {
        let address = normalize_address(&binding.mailbox_address);

        if let Some(existing) = self.find_by_mailbox(&address).await? {
            if existing.channel_id != binding.channel_id {
                return Err(Error::Config(format!(
                    "mailbox {address} is already bound to channel {}",
                    existing.channel_id
                )));
            }
        }

        let now = Utc::now().timestamp();
        sqlx::query(
            r"
            INSERT INTO mailbox_bindings
                (channel_id, mailbox_address, alias, ack_expiry_days, check_junk,
                 resource_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(channel_id, mailbox_address) DO UPDATE SET
                alias = excluded.alias,
                ack_expiry_days = excluded.ack_expiry_days,
                check_junk = excluded.check_junk,
                resource_id = excluded.resource_id,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&binding.channel_id)
        .bind(&address)
        .bind(&binding.alias)
        .bind(binding.ack_expiry_days)
        .bind(binding.check_junk)
        .bind(&binding.resource_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get(&binding.channel_id, &address)
            .await?
            .ok_or_else(|| Error::Config("binding missing after upsert".into()))
    }

    /// Fetches one binding by its (channel, mailbox) scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(
        &self,
        channel_id: &str,
        mailbox_address: &str,
    ) -> Result<Option<MailboxBinding>> {
        let row = sqlx::query(
            r"
            SELECT id, channel_id, mailbox_address, alias, ack_expiry_days,
                   check_junk, resource_id, created_at, updated_at
            FROM mailbox_bindings
            WHERE channel_id = ? AND mailbox_address = ?
            ",
        )
        .bind(channel_id)
        .bind(normalize_address(mailbox_address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_binding(&r)))
    }

    /// Finds the binding holding a mailbox address, regardless of channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_mailbox(&self, mailbox_address: &str) -> Result<Option<MailboxBinding>> {
        let row = sqlx::query(
            r"
            SELECT id, channel_id, mailbox_address, alias, ack_expiry_days,
                   check_junk, resource_id, created_at, updated_at
            FROM mailbox_bindings
            WHERE mailbox_address = ?
            ",
        )
        .bind(normalize_address(mailbox_address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_binding(&r)))
    }

    /// Lists every binding, oldest first. The scheduler iterates this each
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<MailboxBinding>> {
        let rows = sqlx::query(
            r"
            SELECT id, channel_id, mailbox_address, alias, ack_expiry_days,
                   check_junk, resource_id, created_at, updated_at
            FROM mailbox_bindings
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_binding).collect())
    }

    /// Deletes a binding and its suppression rules.
    ///
    /// Returns `false` when no binding matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete(&self, channel_id: &str, mailbox_address: &str) -> Result<bool> {
        let address = normalize_address(mailbox_address);

        let deleted = sqlx::query(
            r"
            DELETE FROM mailbox_bindings
            WHERE channel_id = ? AND mailbox_address = ?
            ",
        )
        .bind(channel_id)
        .bind(&address)
        .execute(&self.pool)
        .await?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }

        // Cascade: rules are scoped to the binding and die with it.
        sqlx::query(
            r"
            DELETE FROM suppression_rules
            WHERE channel_id = ? AND mailbox_address = ?
            ",
        )
        .bind(channel_id)
        .bind(&address)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }
}

fn row_to_binding(row: &SqliteRow) -> MailboxBinding {
    MailboxBinding {
        id: Some(BindingId::new(row.get("id"))),
        channel_id: row.get("channel_id"),
        mailbox_address: row.get("mailbox_address"),
        alias: row.get("alias"),
        ack_expiry_days: row.get("ack_expiry_days"),
        check_junk: row.get::<i64, _>("check_junk") != 0,
        resource_id: row.get("resource_id"),
        created_at: epoch_to_datetime(row.get("created_at")),
        updated_at: epoch_to_datetime(row.get("updated_at")),
    }
}
