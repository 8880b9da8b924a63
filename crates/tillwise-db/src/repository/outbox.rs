//! # Submission Outbox Repository
//!
//! Bills waiting to be forwarded to the head-office backend.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  create_bill()                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT INTO bills / bill_items                              │   │
//! │  │  2. INSERT INTO inventory_ledger (SALE rows)                    │   │
//! │  │  3. INSERT INTO submission_outbox ('BILL', bill_id, <JSON>)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← all rows or none                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Forwarder (outside this crate)                                        │
//! │  1. pending(limit)           oldest first                              │
//! │  2. send to head office                                                │
//! │  3. mark_submitted(id)   or   mark_failed(id, error)                   │
//! │                                                                         │
//! │  Offline? Entries queue up. Nothing is ever lost.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tillwise_core::SubmissionOutboxEntry;

/// Entity type for bill submissions.
pub const ENTITY_BILL: &str = "BILL";

/// Repository for the submission outbox.
#[derive(Debug, Clone)]
pub struct SubmissionOutboxRepository {
    pool: SqlitePool,
}

impl SubmissionOutboxRepository {
    /// Creates a new SubmissionOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SubmissionOutboxRepository { pool }
    }

    /// Queues an entity outside any bill transaction.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&submission)?;
    /// repo.enqueue("BILL", &bill.id, &payload).await?;
    /// ```
    pub async fn enqueue(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<SubmissionOutboxEntry> {
        let mut conn = self.pool.acquire().await?;
        enqueue_on(&mut conn, entity_type, entity_id, payload).await
    }

    /// Entries not yet submitted, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<SubmissionOutboxEntry>> {
        let entries = sqlx::query_as::<_, SubmissionOutboxEntry>(
            r#"
            SELECT id, entity_type, entity_id, payload, attempts, last_error,
                   created_at, attempted_at, submitted_at
            FROM submission_outbox
            WHERE submitted_at IS NULL
            ORDER BY created_at ASC, rowid ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Marks an entry as accepted by head office.
    pub async fn mark_submitted(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE submission_outbox SET submitted_at = ?2, attempted_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }

        debug!(id = %id, "Outbox entry submitted");
        Ok(())
    }

    /// Records a failed forwarding attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE submission_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }

        warn!(id = %id, error = %error, "Outbox submission failed");
        Ok(())
    }

    /// Counts entries not yet submitted.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM submission_outbox WHERE submitted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries submitted more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn purge_submitted(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM submission_outbox WHERE submitted_at IS NOT NULL AND submitted_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Queues an entity on an existing connection (the bill transaction).
pub(crate) async fn enqueue_on(
    conn: &mut SqliteConnection,
    entity_type: &str,
    entity_id: &str,
    payload: &str,
) -> DbResult<SubmissionOutboxEntry> {
    let entry = SubmissionOutboxEntry {
        id: Uuid::new_v4().to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        payload: payload.to_string(),
        attempts: 0,
        last_error: None,
        created_at: Utc::now(),
        attempted_at: None,
        submitted_at: None,
    };

    debug!(entity_type = %entity_type, entity_id = %entity_id, "Queuing for submission");

    sqlx::query(
        r#"
        INSERT INTO submission_outbox (
            id, entity_type, entity_id, payload,
            attempts, last_error, created_at, attempted_at, submitted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.attempts)
    .bind(&entry.last_error)
    .bind(entry.created_at)
    .bind(entry.attempted_at)
    .bind(entry.submitted_at)
    .execute(&mut *conn)
    .await?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_pending_lifecycle() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.outbox();

        let first = repo.enqueue(ENTITY_BILL, "bill-1", "{}").await.unwrap();
        let second = repo.enqueue(ENTITY_BILL, "bill-2", "{}").await.unwrap();
        assert_eq!(repo.count_pending().await.unwrap(), 2);

        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending[0].id, first.id);
        assert_eq!(pending[1].id, second.id);

        repo.mark_failed(&first.id, "head office unreachable").await.unwrap();
        repo.mark_failed(&first.id, "head office unreachable").await.unwrap();
        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(
            pending[0].last_error.as_deref(),
            Some("head office unreachable")
        );
        assert!(pending[0].attempted_at.is_some());

        repo.mark_submitted(&first.id).await.unwrap();
        let pending = repo.pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_entry() {
        let db = Database::in_memory().await.unwrap();
        let err = db.outbox().mark_submitted("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_purge_keeps_recent_and_pending() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.outbox();

        let done = repo.enqueue(ENTITY_BILL, "bill-1", "{}").await.unwrap();
        repo.enqueue(ENTITY_BILL, "bill-2", "{}").await.unwrap();
        repo.mark_submitted(&done.id).await.unwrap();

        // Submitted just now: not old enough.
        assert_eq!(repo.purge_submitted(7).await.unwrap(), 0);

        sqlx::query("UPDATE submission_outbox SET submitted_at = ?2 WHERE id = ?1")
            .bind(&done.id)
            .bind(Utc::now() - Duration::days(30))
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(repo.purge_submitted(7).await.unwrap(), 1);
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }
}
