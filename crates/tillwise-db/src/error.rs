//! # Store Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Where a DbError comes from                                             │
//! │                                                                         │
//! │  Business rule in a repository     ──► Rejected(CoreError)             │
//! │    stock short, product inactive,      shown to the cashier as is      │
//! │    tax group in use, bad input                                          │
//! │                                                                         │
//! │  SQLite constraint                 ──► UniqueViolation                 │
//! │    (sqlx ErrorKind)                    ForeignKeyViolation              │
//! │                                        CheckViolation                   │
//! │                                                                         │
//! │  Pool / file / migration trouble   ──► Unavailable, ConnectionFailed,  │
//! │                                        MigrationFailed, Sqlite          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bill that fails for any reason leaves no rows behind: the error is
//! returned before the transaction commits.

use sqlx::error::ErrorKind;
use thiserror::Error;
use tillwise_core::{CoreError, ValidationError};

#[derive(Debug, Error)]
pub enum DbError {
    /// Lookup by id found nothing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index refused the write, e.g. a barcode already in use.
    ///
    /// `target` is SQLite's `table.column` list.
    #[error("{target} already exists")]
    UniqueViolation { target: String },

    /// A referenced row (category, tax group, bill) does not exist.
    #[error("Referenced record does not exist: {0}")]
    ForeignKeyViolation(String),

    /// A CHECK constraint refused the row.
    #[error("Rejected by schema check: {0}")]
    CheckViolation(String),

    #[error("Could not open the local store: {0}")]
    ConnectionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    /// No pooled connection became free in time, or the pool was closed.
    #[error("Local store unavailable: {0}")]
    Unavailable(String),

    /// Any other SQLite or driver error.
    #[error("SQLite error: {0}")]
    Sqlite(String),

    /// A business rule refused the operation.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// Outbox payload could not be encoded.
    #[error("Could not encode payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// `true` for errors the cashier can fix (as opposed to store failures).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DbError::Rejected(_) | DbError::NotFound { .. } | DbError::UniqueViolation { .. }
        )
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Rejected(CoreError::InvalidArgument(err))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // SQLite: "UNIQUE constraint failed: products.barcode"
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        target: message
                            .rsplit_once(": ")
                            .map_or(message.as_str(), |(_, target)| target)
                            .to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation(message)
                    }
                    _ => DbError::Sqlite(message),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::Unavailable(err.to_string())
            }
            other => DbError::Sqlite(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
