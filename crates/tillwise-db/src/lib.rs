//! # tillwise-db: Local Store for the Tillwise Till
//!
//! This crate persists everything the till needs while offline: the
//! catalog, the stock ledger, finalized bills and the submission outbox.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tillwise Data Flow                               │
//! │                                                                         │
//! │  Order screen (OrderBuilder in tillwise-core)                          │
//! │       │  to_submission()                                                │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   tillwise-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ TaxGroupRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ WAL, FKs on   │    │ InventoryRepo │    │   schema.sql │  │   │
//! │  │   │               │    │ BillRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   $TILLWISE_DB_PATH (default ./tillwise.db)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Till settings from the environment
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repositories (tax groups, catalog, stock, bills, outbox)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tillwise_db::{Database, TillConfig};
//!
//! tillwise_db::init_tracing();
//!
//! let config = TillConfig::from_env();
//! let db = Database::new(config.db_config()).await?;
//!
//! let bill = db.bills().create_bill(&order.to_submission()?).await?;
//! println!("{} {}", bill.bill.bill_number, config.format_currency(bill.bill.total()));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::TillConfig;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::category::CategoryRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::outbox::SubmissionOutboxRepository;
pub use repository::product::ProductRepository;
pub use repository::tax_group::TaxGroupRepository;

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tillwise=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Calling this twice is a
/// no-op for the second call.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
