//! # Inventory Repository
//!
//! Append-only stock ledger.
//!
//! ## Ledger Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  inventory_ledger (Masala Chai)                                         │
//! │                                                                         │
//! │   STOCK_ADD   +50   "Opening stock"                                     │
//! │   SALE         -2   BILL-20261019-0001                                  │
//! │   SALE         -3   BILL-20261019-0002                                  │
//! │   ADJUSTMENT   -1   "Spilled"                                           │
//! │               ────                                                      │
//! │   current      44   = SUM(quantity_change)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are never updated. SALE rows are written by the bill transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product;
use tillwise_core::validation::validate_stock_quantity;
use tillwise_core::{CoreError, InventoryMovement, MovementKind, StockLevel};

/// Repository for stock ledger operations.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records goods received.
    ///
    /// ## Errors
    /// - `Rejected(InvalidArgument)` for a quantity ≤ 0
    /// - `NotFound` for an unknown product
    pub async fn add_stock(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
    ) -> DbResult<InventoryMovement> {
        validate_stock_quantity(quantity)?;

        let mut conn = self.pool.acquire().await?;
        if product::fetch_on(&mut conn, product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let movement = record_on(
            &mut conn,
            product_id,
            quantity,
            MovementKind::StockAdd,
            None,
            notes,
            Utc::now(),
        )
        .await?;

        info!(product_id = %product_id, quantity, "Stock added");
        Ok(movement)
    }

    /// Writes stock off outside a bill (wastage, breakage).
    ///
    /// The stock check and the ledger row share one transaction, so a bill
    /// committed in between cannot push the level below zero.
    ///
    /// ## Errors
    /// - `Rejected(InvalidArgument)` for a quantity ≤ 0
    /// - `NotFound` for an unknown product
    /// - `Rejected(InsufficientStock)` when less than `quantity` is on hand
    pub async fn deduct_stock(
        &self,
        product_id: &str,
        quantity: i64,
        notes: Option<&str>,
    ) -> DbResult<InventoryMovement> {
        validate_stock_quantity(quantity)?;

        let mut tx = self.pool.begin().await?;
        let product = product::fetch_on(&mut *tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let available = stock_on(&mut *tx, product_id).await?;
        if available < quantity {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available,
                requested: quantity,
            }
            .into());
        }

        let movement = record_on(
            &mut *tx,
            product_id,
            -quantity,
            MovementKind::Adjustment,
            None,
            notes,
            Utc::now(),
        )
        .await?;
        tx.commit().await?;

        info!(product_id = %product_id, quantity, "Stock written off");
        Ok(movement)
    }

    /// Current stock for one product (0 when it has no movements).
    pub async fn current_stock(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        stock_on(&mut conn, product_id).await
    }

    /// Stock for every active product, by name.
    pub async fn stock_levels(&self) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT
                p.id AS product_id,
                p.name AS product_name,
                COALESCE(SUM(l.quantity_change), 0) AS current_stock,
                MAX(l.created_at) AS last_movement_at
            FROM products p
            LEFT JOIN inventory_ledger l ON l.product_id = p.id
            WHERE p.is_active = 1
            GROUP BY p.id, p.name
            ORDER BY p.name COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    /// Ledger rows for a product, newest first.
    pub async fn movements(&self, product_id: &str, limit: u32) -> DbResult<Vec<InventoryMovement>> {
        let movements = sqlx::query_as::<_, InventoryMovement>(
            r#"
            SELECT id, product_id, quantity_change, kind, reference_id, notes, created_at
            FROM inventory_ledger
            WHERE product_id = ?1
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

/// Sum of the ledger for a product on an existing connection.
pub(crate) async fn stock_on(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let stock: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity_change), 0) FROM inventory_ledger WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(stock)
}

/// Appends a ledger row on an existing connection.
pub(crate) async fn record_on(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity_change: i64,
    kind: MovementKind,
    reference_id: Option<&str>,
    notes: Option<&str>,
    at: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    let movement = InventoryMovement {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        quantity_change,
        kind,
        reference_id: reference_id.map(str::to_string),
        notes: notes.map(str::to_string),
        created_at: at,
    };

    debug!(product_id = %product_id, quantity_change, ?kind, "Recording stock movement");

    sqlx::query(
        r#"
        INSERT INTO inventory_ledger (
            id, product_id, quantity_change, kind, reference_id, notes, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity_change)
    .bind(movement.kind)
    .bind(&movement.reference_id)
    .bind(&movement.notes)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(movement)
}
