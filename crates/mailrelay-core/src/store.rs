//! Storage handle wiring the per-aggregate repositories to one pool.
//!
//! The store is constructed once at startup and passed explicitly into the
//! scheduler and pipeline; there is no process-global database handle.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::Result;
use crate::binding::BindingRepository;
use crate::credential::CredentialRepository;
use crate::receipt::ReceiptRepository;
use crate::rules::RuleRepository;

/// Shared storage for bindings, credentials, rules and receipts.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (or creates) the database at the given path and sets up the
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation
    /// fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        self.bindings().create_schema().await?;
        self.credentials().create_schema().await?;
        self.rules().create_schema().await?;
        self.receipts().create_schema().await?;
        Ok(())
    }

    /// Repository for mailbox bindings.
    #[must_use]
    pub fn bindings(&self) -> BindingRepository {
        BindingRepository::new(self.pool.clone())
    }

    /// Repository for credential resources.
    #[must_use]
    pub fn credentials(&self) -> CredentialRepository {
        CredentialRepository::new(self.pool.clone())
    }

    /// Repository for suppression rules.
    #[must_use]
    pub fn rules(&self) -> RuleRepository {
        RuleRepository::new(self.pool.clone())
    }

    /// Repository for delivery receipts.
    #[must_use]
    pub fn receipts(&self) -> ReceiptRepository {
        ReceiptRepository::new(self.pool.clone())
    }
}

/// Timestamps are stored as epoch seconds; out-of-range values collapse to
/// the epoch rather than failing a row read.
pub(crate) fn epoch_to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
