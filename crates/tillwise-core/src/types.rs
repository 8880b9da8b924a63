//! # Domain Types
//!
//! Core domain types used throughout Tillwise.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxGroup     │   │     Product     │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  total_rate_bps │◄──│  tax_group_id   │   │  bill_number    │       │
//! │  │  split_type     │   │  price_paise    │   │  cgst / sgst    │       │
//! │  │  is_inclusive   │   │  category_id    │   │  total_paise    │       │
//! │  └────────┬────────┘   └─────────────────┘   └─────────────────┘       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ TaxConfiguration│   │  TaxTreatment   │   │ PaymentMethod   │       │
//! │  │  rate, split,   │──►│  Taxed(config)  │   │  CASH/UPI/CARD  │       │
//! │  │  inclusive      │   │  Untaxed        │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_barcode, validate_name, validate_price_paise, validate_quantity,
    validate_tax_rate_bps, ValidationResult,
};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so GST 18% is 1800 bps and 2.5% is 250 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Parses a percentage such as `"18"` or `"2.5"`.
impl FromStr for TaxRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Hundredths of a percent parse exactly like paise of a rupee.
        let bps = s
            .parse::<Money>()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "tax_rate".to_string(),
                reason: "expected a percentage such as 18 or 2.5".to_string(),
            })?
            .paise();

        let bps = u32::try_from(bps).map_err(|_| ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        })?;
        validate_tax_rate_bps(bps)?;
        Ok(TaxRate(bps))
    }
}

// =============================================================================
// Split Type
// =============================================================================

/// How a line's tax amount is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SplitType {
    /// Split evenly into CGST and SGST.
    #[default]
    #[serde(rename = "GST_50_50")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "GST_50_50"))]
    Gst5050,
    /// The whole tax is reported as one component (under CGST).
    #[serde(rename = "NO_SPLIT")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "NO_SPLIT"))]
    NoSplit,
}

// =============================================================================
// Tax Configuration & Treatment
// =============================================================================

/// The tax rule applied to an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxConfiguration {
    pub rate: TaxRate,
    pub split_type: SplitType,
    /// `true` when quoted prices already contain the tax.
    pub is_tax_inclusive: bool,
}

/// Whether a line is taxed at all.
///
/// Products without a tax group are `Untaxed`; a `Taxed` configuration with
/// a zero rate prices exactly like `Untaxed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "configuration", rename_all = "snake_case")]
#[ts(export)]
pub enum TaxTreatment {
    Taxed(TaxConfiguration),
    #[default]
    Untaxed,
}

impl TaxTreatment {
    /// Returns the configuration when taxed.
    pub fn configuration(&self) -> Option<&TaxConfiguration> {
        match self {
            TaxTreatment::Taxed(config) => Some(config),
            TaxTreatment::Untaxed => None,
        }
    }

    /// Rate that actually applies (zero when untaxed).
    pub fn effective_rate(&self) -> TaxRate {
        self.configuration()
            .map(|config| config.rate)
            .unwrap_or_default()
    }
}

impl From<Option<TaxConfiguration>> for TaxTreatment {
    fn from(config: Option<TaxConfiguration>) -> Self {
        config.map_or(TaxTreatment::Untaxed, TaxTreatment::Taxed)
    }
}

// =============================================================================
// Tax Group
// =============================================================================

/// A named, persisted tax rule (e.g. "GST 5%", "GST 18% incl.").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxGroup {
    pub id: String,
    pub name: String,
    /// Total rate in basis points (1800 = 18%).
    pub total_rate_bps: u32,
    pub split_type: SplitType,
    pub is_tax_inclusive: bool,
    pub is_active: bool,
    /// System-level code (e.g. `SERVICE_CHARGE_GST`).
    pub code: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TaxGroup {
    /// Returns the total rate.
    #[inline]
    pub fn total_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.total_rate_bps)
    }

    /// The tax rule this group applies to a line.
    pub fn configuration(&self) -> TaxConfiguration {
        TaxConfiguration {
            rate: self.total_rate(),
            split_type: self.split_type,
            is_tax_inclusive: self.is_tax_inclusive,
        }
    }
}

/// Input for creating a tax group.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewTaxGroup {
    pub name: String,
    pub total_rate_bps: u32,
    #[serde(default)]
    pub split_type: SplitType,
    #[serde(default)]
    pub is_tax_inclusive: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub code: Option<String>,
}

impl NewTaxGroup {
    /// Validates the draft and returns it with a trimmed name.
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = validate_name("name", &self.name)?;
        validate_tax_rate_bps(self.total_rate_bps)?;
        Ok(self)
    }
}

/// Partial update for a tax group. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxGroupUpdate {
    pub name: Option<String>,
    pub total_rate_bps: Option<u32>,
    pub split_type: Option<SplitType>,
    pub is_tax_inclusive: Option<bool>,
    pub is_active: Option<bool>,
}

impl TaxGroupUpdate {
    /// Validates the provided fields and trims the name.
    pub fn validated(mut self) -> ValidationResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name("name", name)?);
        }
        if let Some(bps) = self.total_rate_bps {
            validate_tax_rate_bps(bps)?;
        }
        Ok(self)
    }

    /// Applies the update onto an existing group.
    pub fn apply_to(&self, group: &mut TaxGroup) {
        if let Some(name) = &self.name {
            group.name = name.clone();
        }
        if let Some(bps) = self.total_rate_bps {
            group.total_rate_bps = bps;
        }
        if let Some(split_type) = self.split_type {
            group.split_type = split_type;
        }
        if let Some(inclusive) = self.is_tax_inclusive {
            group.is_tax_inclusive = inclusive;
        }
        if let Some(active) = self.is_active {
            group.is_active = active;
        }
    }
}

fn default_active() -> bool {
    true
}

// =============================================================================
// Category
// =============================================================================

/// A menu section (Beverages, Snacks, Meals, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    /// Lower values sort first on the menu grid.
    pub display_order: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCategory {
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: i64,
}

impl NewCategory {
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = validate_name("name", &self.name)?;
        Ok(self)
    }
}

/// Partial update for a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub display_order: Option<i64>,
}

impl CategoryUpdate {
    pub fn validated(mut self) -> ValidationResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name("name", name)?);
        }
        Ok(self)
    }
}

// =============================================================================
// Product
// =============================================================================

/// An item on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on the order screen and the bill.
    pub name: String,

    /// Barcode for packaged goods.
    pub barcode: Option<String>,

    pub category_id: Option<String>,

    /// Selling price in paise.
    pub price_paise: i64,

    /// Tax group applied to this product; `None` means untaxed.
    pub tax_group_id: Option<String>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub price_paise: i64,
    #[serde(default)]
    pub tax_group_id: Option<String>,
}

impl NewProduct {
    /// Validates the draft, trimming the name and dropping a blank barcode.
    pub fn validated(mut self) -> ValidationResult<Self> {
        self.name = validate_name("name", &self.name)?;
        self.barcode = match self.barcode.take() {
            Some(code) if !code.trim().is_empty() => Some(validate_barcode(&code)?),
            _ => None,
        };
        validate_price_paise(self.price_paise)?;
        Ok(self)
    }
}

/// Partial update for a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub price_paise: Option<i64>,
    pub tax_group_id: Option<String>,
}

impl ProductUpdate {
    pub fn validated(mut self) -> ValidationResult<Self> {
        if let Some(name) = &self.name {
            self.name = Some(validate_name("name", name)?);
        }
        if let Some(code) = &self.barcode {
            self.barcode = Some(validate_barcode(code)?);
        }
        if let Some(price) = self.price_paise {
            validate_price_paise(price)?;
        }
        Ok(self)
    }

    /// Applies the update onto an existing product.
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(code) = &self.barcode {
            product.barcode = Some(code.clone());
        }
        if let Some(category_id) = &self.category_id {
            product.category_id = Some(category_id.clone());
        }
        if let Some(price) = self.price_paise {
            product.price_paise = price;
        }
        if let Some(tax_group_id) = &self.tax_group_id {
            product.tax_group_id = Some(tax_group_id.clone());
        }
    }
}

/// A product together with the tax group it resolves to.
///
/// This is what the catalog hands to the order screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogItem {
    pub product: Product,
    pub tax_group: Option<TaxGroup>,
}

impl CatalogItem {
    pub fn tax_treatment(&self) -> TaxTreatment {
        self.tax_group
            .as_ref()
            .map(TaxGroup::configuration)
            .into()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Upi,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Upi => "UPI",
            PaymentMethod::Card => "CARD",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "UPI" => Ok(PaymentMethod::Upi),
            "CARD" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: "must be one of CASH, UPI, CARD".to_string(),
            }),
        }
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MovementKind {
    /// Goods received.
    StockAdd,
    /// Goods sold on a bill.
    Sale,
    /// Manual write-off: wastage, breakage, staff meals.
    Adjustment,
}

/// One row of the inventory ledger.
///
/// Stock is never stored directly: the current level is the sum of
/// `quantity_change` over all movements for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    /// Signed: positive for stock added, negative for sales and adjustments.
    pub quantity_change: i64,
    pub kind: MovementKind,
    /// Bill id for sales.
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Current stock for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: i64,
    #[ts(as = "Option<String>")]
    pub last_movement_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Bill Submission
// =============================================================================

/// One raw line of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillItemRequest {
    pub product_id: String,
    pub quantity: i64,
    /// Price quoted on the order screen. Zero means "use the catalog price".
    pub unit_price: Money,
}

/// What the order screen sends when the cashier takes payment.
///
/// The preview figures are deliberately absent: the receiving side
/// recomputes everything from these raw lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillSubmission {
    pub items: Vec<BillItemRequest>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl BillSubmission {
    /// Checks the submission has at least one well-formed line.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            });
        }
        for item in &self.items {
            validate_quantity(item.quantity)?;
            validate_price_paise(item.unit_price.paise())?;
        }
        Ok(())
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A finalized bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: String,
    /// `BILL-YYYYMMDD-NNNN`
    pub bill_number: String,
    pub payment_method: PaymentMethod,
    /// Sum of line taxable values.
    pub subtotal_paise: i64,
    pub tax_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub total_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }
}

/// A line on a finalized bill.
/// Uses the snapshot pattern so reports never depend on the current catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_paise: i64,
    pub quantity: i64,
    pub tax_group_name_snapshot: Option<String>,
    pub tax_rate_bps_snapshot: u32,
    pub is_tax_inclusive_snapshot: bool,
    pub taxable_paise: i64,
    pub tax_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub line_total_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A bill with its lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillWithItems {
    pub bill: Bill,
    pub items: Vec<BillItem>,
}

// =============================================================================
// Reports
// =============================================================================

/// Bill item snapshots summed for one tax rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxSummaryRow {
    pub tax_rate_bps: u32,
    pub tax_group_name: Option<String>,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub tax_paise: i64,
    pub item_count: i64,
}

/// GST summary for a date range, grouped by rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxSummaryReport {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    pub rows: Vec<TaxSummaryRow>,
    pub taxable_paise: i64,
    pub cgst_paise: i64,
    pub sgst_paise: i64,
    pub tax_paise: i64,
}

impl TaxSummaryReport {
    /// Builds the report, deriving grand totals from the rows.
    pub fn from_rows(from: DateTime<Utc>, to: DateTime<Utc>, rows: Vec<TaxSummaryRow>) -> Self {
        TaxSummaryReport {
            from,
            to,
            taxable_paise: rows.iter().map(|r| r.taxable_paise).sum(),
            cgst_paise: rows.iter().map(|r| r.cgst_paise).sum(),
            sgst_paise: rows.iter().map(|r| r.sgst_paise).sum(),
            tax_paise: rows.iter().map(|r| r.tax_paise).sum(),
            rows,
        }
    }
}

// =============================================================================
// Submission Outbox
// =============================================================================

/// A bill waiting to be forwarded to head office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SubmissionOutboxEntry {
    pub id: String,
    /// "BILL" today; kept generic for future entity kinds.
    pub entity_type: String,
    pub entity_id: String,
    /// JSON body to forward; for bills, the stored `BillWithItems`.
    pub payload: String,
    pub attempts: i64,
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub submitted_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
