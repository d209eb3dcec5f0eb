//! Credential resource storage repository.

use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqliteRow};

use super::model::CredentialResource;
use crate::Result;
use crate::normalize::normalize_address;
use crate::store::epoch_to_datetime;

/// Repository for credential resources.
#[derive(Debug, Clone)]
pub struct CredentialRepository {
    pool: SqlitePool,
}

impl CredentialRepository {
    /// Creates a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS credential_resources (
                id TEXT PRIMARY KEY,
                mailbox_address TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                client_secret TEXT NOT NULL,
                access_token TEXT,
                token_expires_at INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Creates or updates a resource by id. An update keeps the original
    /// creation time and drops any cached token from the input in favour of
    /// what the caller set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(&self, resource: &CredentialResource) -> Result<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r"
            INSERT INTO credential_resources
                (id, mailbox_address, tenant_id, client_id, client_secret,
                 access_token, token_expires_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                mailbox_address = excluded.mailbox_address,
                tenant_id = excluded.tenant_id,
                client_id = excluded.client_id,
                client_secret = excluded.client_secret,
                access_token = excluded.access_token,
                token_expires_at = excluded.token_expires_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&resource.id)
        .bind(normalize_address(&resource.mailbox_address))
        .bind(&resource.tenant_id)
        .bind(&resource.client_id)
        .bind(&resource.client_secret)
        .bind(&resource.access_token)
        .bind(resource.token_expires_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetches a resource by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &str) -> Result<Option<CredentialResource>> {
        let row = sqlx::query(
            r"
            SELECT id, mailbox_address, tenant_id, client_id, client_secret,
                   access_token, token_expires_at, created_at, updated_at
            FROM credential_resources
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_resource(&r)))
    }

    /// Finds the resource covering a mailbox address.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_mailbox(
        &self,
        mailbox_address: &str,
    ) -> Result<Option<CredentialResource>> {
        let row = sqlx::query(
            r"
            SELECT id, mailbox_address, tenant_id, client_id, client_secret,
                   access_token, token_expires_at, created_at, updated_at
            FROM credential_resources
            WHERE mailbox_address = ?
            ",
        )
        .bind(normalize_address(mailbox_address))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_resource(&r)))
    }

    /// Persists a freshly issued token on a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn store_token(
        &self,
        id: &str,
        access_token: &str,
        token_expires_at: i64,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE credential_resources
            SET access_token = ?, token_expires_at = ?, updated_at = ?
            WHERE id = ?
            ",
        )
        .bind(access_token)
        .bind(token_expires_at)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a resource. Done only when its owning binding goes away.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM credential_resources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(deleted.rows_affected() > 0)
    }
}

fn row_to_resource(row: &SqliteRow) -> CredentialResource {
    CredentialResource {
        id: row.get("id"),
        mailbox_address: row.get("mailbox_address"),
        tenant_id: row.get("tenant_id"),
        client_id: row.get("client_id"),
        client_secret: row.get("client_secret"),
        access_token: row.get("access_token"),
        token_expires_at: row.get("token_expires_at"),
        created_at: epoch_to_datetime(row.get("created_at")),
        updated_at: epoch_to_datetime(row.get("updated_at")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Store;

    #[tokio::test]
    async fn test_upsert_get_and_find_by_mailbox() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.credentials();

        let resource = CredentialResource::new("Ops@Example.com", "tenant", "client", "secret");
        repo.upsert(&resource).await.unwrap();

        let by_id = repo.get("ops@example.com").await.unwrap().unwrap();
        assert_eq!(by_id.tenant_id, "tenant");
        assert!(by_id.access_token.is_none());

        let by_mailbox = repo.find_by_mailbox(" OPS@example.com ").await.unwrap();
        assert!(by_mailbox.is_some());
    }

    #[tokio::test]
    async fn test_store_token_round_trip() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.credentials();

        let resource = CredentialResource::new("ops@example.com", "tenant", "client", "secret");
        repo.upsert(&resource).await.unwrap();

        repo.store_token(&resource.id, "tok-1", 1_900_000_000)
            .await
            .unwrap();

        let stored = repo.get(&resource.id).await.unwrap().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("tok-1"));
        assert_eq!(stored.token_expires_at, Some(1_900_000_000));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = Store::in_memory().await.unwrap();
        let repo = store.credentials();

        let resource = CredentialResource::new("ops@example.com", "tenant", "client", "secret");
        repo.upsert(&resource).await.unwrap();

        assert!(repo.delete(&resource.id).await.unwrap());
        assert!(!repo.delete(&resource.id).await.unwrap());
        assert!(repo.get(&resource.id).await.unwrap().is_none());
    }
}
