//! Rule storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::{RuleId, SuppressionRule};
use crate::normalize::normalize_address;
use crate::store::epoch_to_datetime;
use crate::{Error, Result};

/// Repository for suppression rules.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: SqlitePool,
}

impl RuleRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_schema(&self) -> Result<()> {
        // subject_contains uses '' for "no filter": SQLite treats NULLs as
        // distinct in unique indexes, which would defeat the upsert key.
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS suppression_rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                channel_id TEXT NOT NULL,
                mailbox_address TEXT NOT NULL,
                name TEXT NOT NULL,
                sender TEXT NOT NULL,
                subject_contains TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                UNIQUE(channel_id, mailbox_address, sender, subject_contains)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates a rule, or updates the friendly name of an existing rule with
    /// the same (channel, mailbox, sender, subject filter) tuple.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(&self, rule: &SuppressionRule) -> Result<SuppressionRule> {
        let sender = normalize_address(&rule.sender);
        let mailbox = normalize_address(&rule.mailbox_address);
        let subject = rule.subject_contains.clone().unwrap_or_default();

        sqlx::query(
            r"
            INSERT INTO suppression_rules
                (channel_id, mailbox_address, name, sender, subject_contains, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(channel_id, mailbox_address, sender, subject_contains) DO UPDATE SET
                name = excluded.name
            ",
        )
        .bind(&rule.channel_id)
        .bind(&mailbox)
        .bind(&rule.name)
        .bind(&sender)
        .bind(&subject)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r"
            SELECT id, channel_id, mailbox_address, name, sender, subject_contains, created_at
            FROM suppression_rules
            WHERE channel_id = ? AND mailbox_address = ? AND sender = ? AND subject_contains = ?
            ",
        )
        .bind(&rule.channel_id)
        .bind(&mailbox)
        .bind(&sender)
        .bind(&subject)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_rule(&r))
            .ok_or_else(|| Error::Config("rule missing after upsert".into()))
    }

    /// Lists the rules for one (channel, mailbox) scope, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_scope(
        &self,
        channel_id: &str,
        mailbox_address: &str,
    ) -> Result<Vec<SuppressionRule>> {
        let rows = sqlx::query(
            r"
            SELECT id, channel_id, mailbox_address, name, sender, subject_contains, created_at
            FROM suppression_rules
            WHERE channel_id = ? AND mailbox_address = ?
            ORDER BY id DESC
            ",
        )
        .bind(channel_id)
        .bind(normalize_address(mailbox_address))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_rule).collect())
    }

    /// Deletes one rule from a scope. Returns `false` when nothing matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete(
        &self,
        channel_id: &str,
        mailbox_address: &str,
        rule_id: RuleId,
    ) -> Result<bool> {
        let deleted = sqlx::query(
            r"
            DELETE FROM suppression_rules
            WHERE channel_id = ? AND mailbox_address = ? AND id = ?
            ",
        )
        .bind(channel_id)
        .bind(normalize_address(mailbox_address))
        .bind(rule_id.0)
        .execute(&self.pool)
        .await?;

        Ok(deleted.rows_affected() > 0)
    }
}

fn row_to_rule(row: &SqliteRow) -> SuppressionRule {
    let subject: String = row.get("subject_contains");
    SuppressionRule {
        id: Some(RuleId(row.get("id"))),
        channel_id: row.get("channel_id"),
        mailbox_address: row.get("mailbox_address"),
        name: row.get("name"),
        sender: row.get("sender"),
        subject_contains: (!subject.is_empty()).then_some(subject),
        created_at: epoch_to_datetime(row.get("created_at")),
    }
}
