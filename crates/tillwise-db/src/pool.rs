//! # Store Handle
//!
//! Opens the till's SQLite file and hands out repositories.
//!
//! ## Connection Settings
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tillwise.db                                                            │
//! │                                                                         │
//! │  journal_mode = WAL      order screen reads the menu while a bill      │
//! │                          transaction is writing                         │
//! │  synchronous  = NORMAL   a power cut may lose the last commit, never   │
//! │                          corrupts the file                              │
//! │  foreign_keys = ON       bill_items → bills, products → tax_groups     │
//! │  busy_timeout = 5s       a second writer waits instead of failing      │
//! │                                                                         │
//! │  SqlitePool (max 5) ─┬─► TaxGroupRepository                             │
//! │                      ├─► ProductRepository / CategoryRepository         │
//! │                      ├─► InventoryRepository                            │
//! │                      ├─► BillRepository                                 │
//! │                      └─► SubmissionOutboxRepository                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::bill::BillRepository;
use crate::repository::category::CategoryRepository;
use crate::repository::inventory::InventoryRepository;
use crate::repository::outbox::SubmissionOutboxRepository;
use crate::repository::product::ProductRepository;
use crate::repository::tax_group::TaxGroupRepository;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings for the local store.
///
/// Usually built by [`TillConfig::db_config`](crate::TillConfig::db_config).
///
/// ```rust
/// use std::time::Duration;
/// use tillwise_db::DbConfig;
///
/// let config = DbConfig::new("/var/lib/tillwise/till.db")
///     .max_connections(3)
///     .busy_timeout(Duration::from_secs(10));
/// assert_eq!(config.max_connections, 3);
/// assert!(!config.is_in_memory());
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open.
    pub database_path: PathBuf,

    /// Default: 5. One till rarely needs more than two at once.
    pub max_connections: u32,

    pub min_connections: u32,

    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,

    /// How long SQLite waits on a locked database before `SQLITE_BUSY`.
    pub busy_timeout: Duration,

    /// Apply pending migrations when opening. Default: true.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory store, migrated on open.
    ///
    /// Limited to one connection: each SQLite in-memory connection would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            ..DbConfig::new(IN_MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(IN_MEMORY)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
        };

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the local store. Clones share one pool.
///
/// ```rust,ignore
/// let db = Database::new(TillConfig::from_env().db_config()).await?;
/// let menu = db.products().catalog(200).await?;
/// let bill = db.bills().create_bill(&order.to_submission()?).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the store and applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening local store");

        let options = config.connect_options()?;
        debug!(
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Connecting"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// A fresh, migrated in-memory store.
    pub async fn in_memory() -> DbResult<Self> {
        Self::new(DbConfig::in_memory()).await
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for ad-hoc queries. Prefer the repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn tax_groups(&self) -> TaxGroupRepository {
        TaxGroupRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.pool.clone())
    }

    pub fn bills(&self) -> BillRepository {
        BillRepository::new(self.pool.clone())
    }

    pub fn outbox(&self) -> SubmissionOutboxRepository {
        SubmissionOutboxRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing local store");
        self.pool.close().await;
    }

    /// `true` when the store answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_store_is_migrated_and_healthy() {
        let db = Database::in_memory().await.unwrap();

        assert!(db.health_check().await);
        let status = migrations::migration_status(db.pool()).await.unwrap();
        assert!(status.is_current());

        let fks: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fks, 1);
    }

    #[tokio::test]
    async fn test_in_memory_stores_are_isolated() {
        let first = Database::in_memory().await.unwrap();
        let second = Database::in_memory().await.unwrap();

        sqlx::query(
            "INSERT INTO categories (id, name, is_active, display_order, created_at, updated_at)
             VALUES ('c-1', 'Snacks', 1, 0, '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')",
        )
        .execute(first.pool())
        .await
        .unwrap();

        assert_eq!(first.categories().list_active().await.unwrap().len(), 1);
        assert!(second.categories().list_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_store_is_unhealthy() {
        let db = Database::in_memory().await.unwrap();
        db.close().await;

        assert!(!db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/till.db")
            .max_connections(2)
            .min_connections(0)
            .acquire_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_in_memory());
        assert_eq!(memory.max_connections, 1);
    }
}
