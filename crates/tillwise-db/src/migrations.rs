//! # Schema Migrations
//!
//! The local store's schema ships inside the binary. A till that was
//! offline through an upgrade catches up on its next start.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  migrations/sqlite/                 _sqlx_migrations (in tillwise.db)   │
//! │  ┌──────────────────────────────┐   ┌─────────────────────────────────┐ │
//! │  │ 001_initial_schema.sql       │──►│ version 1, checksum, applied_at │ │
//! │  │ 002_... (next release)       │──►│ (pending until next start)      │ │
//! │  └──────────────────────────────┘   └─────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Applied files are checksummed; editing one after release makes startup
//! fail. Add a new `NNN_description.sql` instead.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// How far the store's schema has been brought forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Migrations embedded in this build.
    pub embedded: usize,
    /// Migrations recorded as applied in the store.
    pub applied: usize,
}

impl MigrationStatus {
    pub fn pending(&self) -> usize {
        self.embedded.saturating_sub(self.applied)
    }

    pub fn is_current(&self) -> bool {
        self.pending() == 0
    }
}

/// Brings the schema up to date.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let before = migration_status(pool).await?;
    debug!(pending = before.pending(), "Schema check");

    MIGRATOR.run(pool).await?;

    if !before.is_current() {
        info!(
            applied = before.pending(),
            embedded = before.embedded,
            "Schema migrated"
        );
    }
    Ok(())
}

/// Compares embedded migrations with the ones the store has recorded.
///
/// A store that has never been migrated reports zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<MigrationStatus> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if tracked == 0 {
        0
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    };

    Ok(MigrationStatus {
        embedded: MIGRATOR.migrations.len(),
        applied: usize::try_from(applied).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_fresh_store_reports_everything_pending() {
        let db = Database::new(DbConfig::in_memory().run_migrations(false))
            .await
            .unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert_eq!(status.applied, 0);
        assert_eq!(status.pending(), status.embedded);
        assert!(status.embedded >= 1);

        run_migrations(db.pool()).await.unwrap();
        assert!(migration_status(db.pool()).await.unwrap().is_current());
    }

    #[tokio::test]
    async fn test_rerun_is_a_no_op() {
        let db = Database::in_memory().await.unwrap();
        run_migrations(db.pool()).await.unwrap();

        let status = migration_status(db.pool()).await.unwrap();
        assert_eq!(status.applied, status.embedded);
    }
}
