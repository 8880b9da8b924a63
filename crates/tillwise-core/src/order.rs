//! # Order Builder
//!
//! The order currently being rung up at the till.
//!
//! ## Order Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Order Builder Operations                             │
//! │                                                                         │
//! │  Cashier Action           Builder Call            Line Change          │
//! │  ──────────────           ────────────            ───────────          │
//! │                                                                         │
//! │  Tap menu item ──────────► add_item() ──────────► push or merge        │
//! │                                                                         │
//! │  Stepper + / - ──────────► increment() ─────────► qty ± 1 (min 1)      │
//! │                            decrement()                                  │
//! │                                                                         │
//! │  Type quantity ──────────► update_quantity() ───► qty = n (0 removes)  │
//! │                                                                         │
//! │  Tap remove ─────────────► remove_item() ───────► line removed         │
//! │                                                                         │
//! │  Take payment ───────────► to_submission() ─────► BillSubmission       │
//! │                                                                         │
//! │  Every change recomputes that line's preview with TaxEngine; the       │
//! │  order totals are folded from the line previews on demand.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The builder is an owned value. Whoever drives the order screen holds it;
//! there is no global order state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tax::{LineTaxBreakdown, TaxEngine};
use crate::types::{BillItemRequest, BillSubmission, CatalogItem, PaymentMethod, TaxTreatment};
use crate::validation::validate_order_size;
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Order Line
// =============================================================================

/// One product on the order.
///
/// ## Design Notes
/// - `name`, `unit_price` and `tax` are frozen when the product is added, so
///   a catalog edit mid-order does not change what the cashier already sees.
/// - `preview` is always in sync with `quantity`; it is recomputed on every
///   quantity change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub tax: TaxTreatment,
    pub preview: LineTaxBreakdown,
}

impl OrderLine {
    fn from_catalog(item: &CatalogItem, quantity: i64) -> CoreResult<Self> {
        let tax = item.tax_treatment();
        let unit_price = item.product.price();
        let preview = TaxEngine::calculate_line(unit_price, quantity, &tax)?;

        Ok(OrderLine {
            product_id: item.product.id.clone(),
            name: item.product.name.clone(),
            unit_price,
            quantity,
            tax,
            preview,
        })
    }

    fn set_quantity(&mut self, quantity: i64) -> CoreResult<()> {
        check_quantity(quantity)?;
        self.preview = TaxEngine::calculate_line(self.unit_price, quantity, &self.tax)?;
        self.quantity = quantity;
        Ok(())
    }
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    crate::validation::validate_quantity(quantity)?;
    Ok(())
}

// =============================================================================
// Order Builder
// =============================================================================

/// The in-progress order.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product merges)
/// - Every quantity is between 1 and 999
/// - At most 100 lines
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderBuilder {
    lines: Vec<OrderLine>,
    payment_method: PaymentMethod,
    /// Restored by `clear()` for the next customer.
    default_payment_method: PaymentMethod,
    #[ts(as = "String")]
    created_at: DateTime<Utc>,
}

impl OrderBuilder {
    /// Starts an empty order paid in cash.
    pub fn new() -> Self {
        Self::with_payment_method(PaymentMethod::default())
    }

    /// Starts an empty order with the till's preselected payment method.
    pub fn with_payment_method(method: PaymentMethod) -> Self {
        OrderBuilder {
            lines: Vec::new(),
            payment_method: method,
            default_payment_method: method,
            created_at: Utc::now(),
        }
    }

    /// Adds a catalog item or, if it is already on the order, adds to its
    /// quantity.
    ///
    /// ## Errors
    /// - `ProductInactive` when the product has been withdrawn
    /// - `QuantityTooLarge` when the merged quantity would exceed 999
    /// - `OrderTooLarge` when a new line would exceed 100 lines
    pub fn add_item(&mut self, item: &CatalogItem, quantity: i64) -> CoreResult<&OrderLine> {
        if !item.product.is_active {
            return Err(CoreError::ProductInactive(item.product.name.clone()));
        }
        check_quantity(quantity)?;

        if let Some(index) = self.position(&item.product.id) {
            let line = &mut self.lines[index];
            line.set_quantity(line.quantity + quantity)?;
            return Ok(&self.lines[index]);
        }

        validate_order_size(self.lines.len()).map_err(|_| CoreError::OrderTooLarge {
            max: crate::MAX_ORDER_LINES,
        })?;

        self.lines.push(OrderLine::from_catalog(item, quantity)?);
        let index = self.lines.len() - 1;
        Ok(&self.lines[index])
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_item(product_id);
        }

        self.line_mut(product_id)?.set_quantity(quantity)
    }

    /// Stepper "+".
    pub fn increment(&mut self, product_id: &str) -> CoreResult<()> {
        let line = self.line_mut(product_id)?;
        line.set_quantity(line.quantity + 1)
    }

    /// Stepper "-". Stops at 1; use `remove_item` to drop the line.
    pub fn decrement(&mut self, product_id: &str) -> CoreResult<()> {
        let line = self.line_mut(product_id)?;
        if line.quantity <= 1 {
            return Ok(());
        }
        line.set_quantity(line.quantity - 1)
    }

    /// Removes a line by product id.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        let index = self
            .position(product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))?;
        self.lines.remove(index);
        Ok(())
    }

    /// Empties the order and restores the preselected payment method.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.payment_method = self.default_payment_method;
        self.created_at = Utc::now();
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Order-level figures for the totals panel.
    ///
    /// Fails only when the order's money totals overflow.
    pub fn totals(&self) -> CoreResult<OrderTotals> {
        OrderTotals::try_from(self)
    }

    /// Builds the raw submission sent when the cashier takes payment.
    ///
    /// Only product ids, quantities and unit prices travel; the receiving
    /// side recomputes all tax figures.
    pub fn to_submission(&self) -> CoreResult<BillSubmission> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyOrder);
        }

        Ok(BillSubmission {
            items: self
                .lines
                .iter()
                .map(|line| BillItemRequest {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            payment_method: self.payment_method,
        })
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut OrderLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound(product_id.to_string()))
    }
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Totals panel figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub total_tax: Money,
    pub total_cgst: Money,
    pub total_sgst: Money,
    pub grand_total: Money,
}

impl TryFrom<&OrderBuilder> for OrderTotals {
    type Error = CoreError;

    fn try_from(order: &OrderBuilder) -> CoreResult<Self> {
        let summary = TaxEngine::summarize(order.lines.iter().map(|l| &l.preview))?;

        Ok(OrderTotals {
            line_count: order.lines.len(),
            total_quantity: order.lines.iter().map(|l| l.quantity).sum(),
            subtotal: summary.subtotal,
            total_tax: summary.total_tax,
            total_cgst: summary.total_cgst,
            total_sgst: summary.total_sgst,
            grand_total: summary.grand_total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, SplitType, TaxGroup};
    use crate::MAX_ORDER_LINES;

    fn catalog_item(id: &str, price_paise: i64, gst_bps: Option<(u32, bool)>) -> CatalogItem {
        let now = Utc::now();
        let tax_group = gst_bps.map(|(bps, inclusive)| TaxGroup {
            id: format!("tg-{}", bps),
            name: format!("GST {}%", bps / 100),
            total_rate_bps: bps,
            split_type: SplitType::Gst5050,
            is_tax_inclusive: inclusive,
            is_active: true,
            code: None,
            created_at: now,
            updated_at: now,
        });

        CatalogItem {
            product: Product {
                id: id.to_string(),
                name: format!("Item {}", id),
                barcode: None,
                category_id: None,
                price_paise,
                tax_group_id: tax_group.as_ref().map(|g| g.id.clone()),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
            tax_group,
        }
    }

    #[test]
    fn test_add_item_computes_preview() {
        let mut order = OrderBuilder::new();
        let chai = catalog_item("chai", 10000, Some((1800, false)));

        let line = order.add_item(&chai, 2).unwrap();

        assert_eq!(line.preview.taxable_value.paise(), 20000);
        assert_eq!(line.preview.tax_amount.paise(), 3600);
        assert_eq!(line.preview.line_total.paise(), 23600);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut order = OrderBuilder::new();
        let chai = catalog_item("chai", 2000, Some((500, false)));

        order.add_item(&chai, 2).unwrap();
        order.add_item(&chai, 3).unwrap();

        assert_eq!(order.lines().len(), 1);
        let line = order.line("chai").unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.preview.taxable_value.paise(), 10000);
        assert_eq!(line.preview.tax_amount.paise(), 500);
    }

    #[test]
    fn test_merge_beyond_max_quantity_is_rejected() {
        let mut order = OrderBuilder::new();
        let chai = catalog_item("chai", 2000, None);

        order.add_item(&chai, 998).unwrap();
        let err = order.add_item(&chai, 2).unwrap_err();

        assert!(matches!(err, CoreError::QuantityTooLarge { requested: 1000, .. }));
        assert_eq!(order.line("chai").unwrap().quantity, 998);
    }

    #[test]
    fn test_add_rejects_bad_quantity_and_inactive_product() {
        let mut order = OrderBuilder::new();
        let mut chai = catalog_item("chai", 2000, None);

        assert!(matches!(
            order.add_item(&chai, 0).unwrap_err(),
            CoreError::InvalidArgument(_)
        ));

        chai.product.is_active = false;
        let err = order.add_item(&chai, 1).unwrap_err();
        assert!(matches!(err, CoreError::ProductInactive(_)));
        assert_eq!(err.to_string(), "Product is no longer sold: Item chai");
        assert!(order.is_empty());
    }

    #[test]
    fn test_line_limit() {
        let mut order = OrderBuilder::new();
        for i in 0..MAX_ORDER_LINES {
            order
                .add_item(&catalog_item(&i.to_string(), 100, None), 1)
                .unwrap();
        }

        let err = order
            .add_item(&catalog_item("one-too-many", 100, None), 1)
            .unwrap_err();
        assert!(matches!(err, CoreError::OrderTooLarge { .. }));

        // Merging into an existing line is still allowed at the limit.
        order.add_item(&catalog_item("0", 100, None), 1).unwrap();
        assert_eq!(order.line("0").unwrap().quantity, 2);
    }

    #[test]
    fn test_update_quantity_recomputes_and_zero_removes() {
        let mut order = OrderBuilder::new();
        let thali = catalog_item("thali", 11800, Some((1800, true)));
        order.add_item(&thali, 1).unwrap();

        order.update_quantity("thali", 3).unwrap();
        let line = order.line("thali").unwrap();
        assert_eq!(line.preview.line_total.paise(), 35400);
        assert_eq!(line.preview.taxable_value.paise(), 30000);

        order.update_quantity("thali", 0).unwrap();
        assert!(order.is_empty());

        assert!(matches!(
            order.update_quantity("thali", 2).unwrap_err(),
            CoreError::LineNotFound(_)
        ));
    }

    #[test]
    fn test_stepper_never_goes_below_one() {
        let mut order = OrderBuilder::new();
        let chai = catalog_item("chai", 2000, None);
        order.add_item(&chai, 1).unwrap();

        order.increment("chai").unwrap();
        assert_eq!(order.line("chai").unwrap().quantity, 2);

        order.decrement("chai").unwrap();
        order.decrement("chai").unwrap();
        order.decrement("chai").unwrap();
        assert_eq!(order.line("chai").unwrap().quantity, 1);
        assert_eq!(order.line("chai").unwrap().preview.line_total.paise(), 2000);
    }

    #[test]
    fn test_totals_sum_line_previews() {
        let mut order = OrderBuilder::new();
        order
            .add_item(&catalog_item("chai", 10000, Some((1800, false))), 2)
            .unwrap();
        order
            .add_item(&catalog_item("thali", 11800, Some((1800, true))), 1)
            .unwrap();
        order.add_item(&catalog_item("water", 5000, None), 3).unwrap();

        let totals = order.totals().unwrap();

        assert_eq!(totals.line_count, 3);
        assert_eq!(totals.total_quantity, 6);
        assert_eq!(totals.subtotal.paise(), 20000 + 10000 + 15000);
        assert_eq!(totals.total_tax.paise(), 3600 + 1800);
        assert_eq!(totals.total_cgst.paise(), 1800 + 900);
        assert_eq!(totals.total_sgst.paise(), 1800 + 900);
        assert_eq!(totals.grand_total.paise(), 23600 + 11800 + 15000);
    }

    #[test]
    fn test_empty_order_totals_are_zero() {
        let totals = OrderBuilder::new().totals().unwrap();
        assert_eq!(totals.line_count, 0);
        assert!(totals.grand_total.is_zero());
        assert!(totals.total_tax.is_zero());
    }

    #[test]
    fn test_totals_report_overflow() {
        let mut order = OrderBuilder::new();
        let huge = i64::MAX / 4 + 1;
        order
            .add_item(&catalog_item("gold", huge, Some((10_000, false))), 1)
            .unwrap();
        order
            .add_item(&catalog_item("silver", huge, Some((10_000, false))), 1)
            .unwrap();

        assert!(matches!(
            order.totals().unwrap_err(),
            CoreError::InvalidArgument(_)
        ));

        order.remove_item("silver").unwrap();
        assert_eq!(order.totals().unwrap().line_count, 1);
    }

    #[test]
    fn test_clear_restores_preselected_payment() {
        let mut order = OrderBuilder::with_payment_method(PaymentMethod::Upi);
        assert_eq!(order.payment_method(), PaymentMethod::Upi);

        order
            .add_item(&catalog_item("chai", 2000, None), 1)
            .unwrap();
        order.set_payment_method(PaymentMethod::Card);
        order.clear();

        assert!(order.is_empty());
        assert_eq!(order.payment_method(), PaymentMethod::Upi);
        assert_eq!(OrderBuilder::new().payment_method(), PaymentMethod::Cash);
    }

    #[test]
    fn test_to_submission() {
        let mut order = OrderBuilder::new();
        assert!(matches!(
            order.to_submission().unwrap_err(),
            CoreError::EmptyOrder
        ));

        order
            .add_item(&catalog_item("chai", 2000, Some((500, false))), 2)
            .unwrap();
        order.set_payment_method(PaymentMethod::Upi);

        let submission = order.to_submission().unwrap();
        assert_eq!(submission.payment_method, PaymentMethod::Upi);
        assert_eq!(submission.items.len(), 1);
        assert_eq!(submission.items[0].product_id, "chai");
        assert_eq!(submission.items[0].quantity, 2);
        assert_eq!(submission.items[0].unit_price, Money::from_paise(2000));
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_clear_resets_payment_method() {
        let mut order = OrderBuilder::new();
        order.add_item(&catalog_item("chai", 2000, None), 1).unwrap();
        order.set_payment_method(PaymentMethod::Card);

        order.clear();

        assert!(order.is_empty());
        assert_eq!(order.payment_method(), PaymentMethod::Cash);
    }
}
