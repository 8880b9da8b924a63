//! # Bill Repository
//!
//! Finalized bills, their line snapshots and the GST summary report.
//!
//! ## Bill Creation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_bill(BillSubmission)                                            │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   1. Resolve each product + tax group    missing  → ProductNotFound    │
//! │                                          inactive → ProductInactive    │
//! │   2. Unit price 0 → catalog price                                      │
//! │   3. Sum quantities per product, compare with the ledger               │
//! │                                          short    → InsufficientStock  │
//! │   4. Recompute every line with TaxEngine (preview figures ignored)    │
//! │   5. BILL-YYYYMMDD-NNNN from today's count                             │
//! │   6. INSERT bills, bill_items (snapshots)                              │
//! │   7. INSERT inventory_ledger SALE rows                                 │
//! │   8. INSERT submission_outbox ('BILL', bill JSON)                      │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error drops the transaction: nothing is written.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::outbox::{self, ENTITY_BILL};
use crate::repository::{inventory, product};
use tillwise_core::{
    Bill, BillItem, BillSubmission, BillWithItems, CatalogItem, CoreError, LineTaxBreakdown,
    Money, MovementKind, TaxEngine, TaxSummaryReport, TaxSummaryRow, MAX_ORDER_LINES,
};

const SELECT_BILL: &str = r#"
    SELECT id, bill_number, payment_method, subtotal_paise, tax_paise,
           cgst_paise, sgst_paise, total_paise, created_at
    FROM bills
"#;

/// A submitted line after pricing.
struct PricedLine {
    catalog: CatalogItem,
    unit_price: Money,
    quantity: i64,
    breakdown: LineTaxBreakdown,
}

/// Repository for bills.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Turns a submitted order into a stored bill.
    ///
    /// The submission carries only product ids, quantities and unit prices;
    /// every tax figure is recomputed here.
    ///
    /// ## Errors
    /// - `Rejected(InvalidArgument)` - no items, bad quantity or price
    /// - `Rejected(OrderTooLarge)` - more than 100 lines
    /// - `Rejected(ProductNotFound | ProductInactive)`
    /// - `Rejected(InsufficientStock)`
    pub async fn create_bill(&self, submission: &BillSubmission) -> DbResult<BillWithItems> {
        let mut tx = self.pool.begin().await?;

        match write_bill(&mut *tx, submission, Utc::now()).await {
            Ok(bill) => {
                tx.commit().await?;
                info!(
                    bill_number = %bill.bill.bill_number,
                    total_paise = bill.bill.total_paise,
                    lines = bill.items.len(),
                    "Bill created"
                );
                Ok(bill)
            }
            Err(err) => {
                warn!(error = %err, "Bill rejected");
                Err(err)
            }
        }
    }

    /// A bill with its lines.
    pub async fn get_bill(&self, id: &str) -> DbResult<Option<BillWithItems>> {
        let Some(bill) = sqlx::query_as::<_, Bill>(&format!("{SELECT_BILL} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, BillItem>(
            r#"
            SELECT id, bill_id, product_id, name_snapshot, unit_price_paise, quantity,
                   tax_group_name_snapshot, tax_rate_bps_snapshot, is_tax_inclusive_snapshot,
                   taxable_paise, tax_paise, cgst_paise, sgst_paise, line_total_paise,
                   created_at
            FROM bill_items
            WHERE bill_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BillWithItems { bill, items }))
    }

    /// Most recent bills first, without lines.
    pub async fn list_bills(&self, limit: u32) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "{SELECT_BILL} ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// GST summary for bills created in `[from, to)`, grouped by rate.
    ///
    /// Sums the stored line snapshots; nothing is recalculated.
    pub async fn tax_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<TaxSummaryReport> {
        debug!(%from, %to, "Building tax summary");

        let rows = sqlx::query_as::<_, TaxSummaryRow>(
            r#"
            SELECT
                bi.tax_rate_bps_snapshot AS tax_rate_bps,
                MAX(bi.tax_group_name_snapshot) AS tax_group_name,
                COALESCE(SUM(bi.taxable_paise), 0) AS taxable_paise,
                COALESCE(SUM(bi.cgst_paise), 0) AS cgst_paise,
                COALESCE(SUM(bi.sgst_paise), 0) AS sgst_paise,
                COALESCE(SUM(bi.tax_paise), 0) AS tax_paise,
                COUNT(*) AS item_count
            FROM bill_items bi
            INNER JOIN bills b ON b.id = bi.bill_id
            WHERE b.created_at >= ?1 AND b.created_at < ?2
            GROUP BY bi.tax_rate_bps_snapshot
            ORDER BY bi.tax_rate_bps_snapshot
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(TaxSummaryReport::from_rows(from, to, rows))
    }
}

async fn write_bill(
    conn: &mut SqliteConnection,
    submission: &BillSubmission,
    now: DateTime<Utc>,
) -> DbResult<BillWithItems> {
    submission.validate()?;
    if submission.items.len() > MAX_ORDER_LINES {
        return Err(CoreError::OrderTooLarge {
            max: MAX_ORDER_LINES,
        }
        .into());
    }

    let mut lines = Vec::with_capacity(submission.items.len());
    for item in &submission.items {
        let catalog = product::catalog_item_on(conn, &item.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(item.product_id.clone()))?;

        if !catalog.product.is_active {
            return Err(CoreError::ProductInactive(catalog.product.name.clone()).into());
        }

        let unit_price = if item.unit_price.is_zero() {
            catalog.product.price()
        } else {
            item.unit_price
        };
        let breakdown =
            TaxEngine::calculate_line(unit_price, item.quantity, &catalog.tax_treatment())?;

        lines.push(PricedLine {
            catalog,
            unit_price,
            quantity: item.quantity,
            breakdown,
        });
    }

    ensure_stock(conn, &lines).await?;

    let summary = TaxEngine::summarize(lines.iter().map(|l| &l.breakdown))?;
    let bill = Bill {
        id: Uuid::new_v4().to_string(),
        bill_number: next_bill_number(conn, now).await?,
        payment_method: submission.payment_method,
        subtotal_paise: summary.subtotal.paise(),
        tax_paise: summary.total_tax.paise(),
        cgst_paise: summary.total_cgst.paise(),
        sgst_paise: summary.total_sgst.paise(),
        total_paise: summary.grand_total.paise(),
        created_at: now,
    };

    debug!(id = %bill.id, bill_number = %bill.bill_number, "Inserting bill");

    sqlx::query(
        r#"
        INSERT INTO bills (
            id, bill_number, payment_method, subtotal_paise, tax_paise,
            cgst_paise, sgst_paise, total_paise, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&bill.id)
    .bind(&bill.bill_number)
    .bind(bill.payment_method)
    .bind(bill.subtotal_paise)
    .bind(bill.tax_paise)
    .bind(bill.cgst_paise)
    .bind(bill.sgst_paise)
    .bind(bill.total_paise)
    .bind(bill.created_at)
    .execute(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = snapshot(&bill, line);
        insert_item(conn, &item).await?;
        inventory::record_on(
            conn,
            &item.product_id,
            -item.quantity,
            MovementKind::Sale,
            Some(&bill.id),
            Some(&bill.bill_number),
            now,
        )
        .await?;
        items.push(item);
    }

    let stored = BillWithItems { bill, items };
    let payload = serde_json::to_string(&stored)?;
    outbox::enqueue_on(conn, ENTITY_BILL, &stored.bill.id, &payload).await?;

    Ok(stored)
}

/// Checks the ledger covers each product's combined quantity.
async fn ensure_stock(conn: &mut SqliteConnection, lines: &[PricedLine]) -> DbResult<()> {
    let mut demand: Vec<(&str, &str, i64)> = Vec::new();
    for line in lines {
        let product = &line.catalog.product;
        match demand.iter_mut().find(|(id, _, _)| *id == product.id) {
            Some((_, _, requested)) => *requested += line.quantity,
            None => demand.push((product.id.as_str(), product.name.as_str(), line.quantity)),
        }
    }

    for (product_id, name, requested) in demand {
        let available = inventory::stock_on(conn, product_id).await?;
        if available < requested {
            return Err(CoreError::InsufficientStock {
                product: name.to_string(),
                available,
                requested,
            }
            .into());
        }
    }

    Ok(())
}

/// `BILL-YYYYMMDD-NNNN`, numbered from 1 each day.
async fn next_bill_number(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
    let prefix = format!("BILL-{}-", now.format("%Y%m%d"));

    let issued: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE bill_number LIKE ?1")
        .bind(format!("{prefix}%"))
        .fetch_one(&mut *conn)
        .await?;

    Ok(format!("{prefix}{:04}", issued + 1))
}

fn snapshot(bill: &Bill, line: &PricedLine) -> BillItem {
    let tax = line.catalog.tax_treatment();

    BillItem {
        id: Uuid::new_v4().to_string(),
        bill_id: bill.id.clone(),
        product_id: line.catalog.product.id.clone(),
        name_snapshot: line.catalog.product.name.clone(),
        unit_price_paise: line.unit_price.paise(),
        quantity: line.quantity,
        tax_group_name_snapshot: line.catalog.tax_group.as_ref().map(|g| g.name.clone()),
        tax_rate_bps_snapshot: tax.effective_rate().bps(),
        is_tax_inclusive_snapshot: tax.configuration().is_some_and(|c| c.is_tax_inclusive),
        taxable_paise: line.breakdown.taxable_value.paise(),
        tax_paise: line.breakdown.tax_amount.paise(),
        cgst_paise: line.breakdown.cgst.paise(),
        sgst_paise: line.breakdown.sgst.paise(),
        line_total_paise: line.breakdown.line_total.paise(),
        created_at: bill.created_at,
    }
}

async fn insert_item(conn: &mut SqliteConnection, item: &BillItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (
            id, bill_id, product_id, name_snapshot, unit_price_paise, quantity,
            tax_group_name_snapshot, tax_rate_bps_snapshot, is_tax_inclusive_snapshot,
            taxable_paise, tax_paise, cgst_paise, sgst_paise, line_total_paise,
            created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.unit_price_paise)
    .bind(item.quantity)
    .bind(&item.tax_group_name_snapshot)
    .bind(item.tax_rate_bps_snapshot)
    .bind(item.is_tax_inclusive_snapshot)
    .bind(item.taxable_paise)
    .bind(item.tax_paise)
    .bind(item.cgst_paise)
    .bind(item.sgst_paise)
    .bind(item.line_total_paise)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
