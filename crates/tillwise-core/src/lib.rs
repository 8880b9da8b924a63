//! # tillwise-core: Pure Business Logic for Tillwise
//!
//! A bill is priced twice: once on screen while the cashier builds it, and
//! again inside the store transaction from catalog data. Both passes run
//! the same [`TaxEngine`], so the printed bill always matches the preview.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order screen                          tillwise-db                      │
//! │  ┌──────────────────────┐              ┌───────────────────────────┐    │
//! │  │ OrderBuilder         │  submission  │ BillRepository            │    │
//! │  │   add / step / remove│ ───────────► │   resolve catalog rows    │    │
//! │  │   totals()           │              │   recompute every line    │    │
//! │  └──────────┬───────────┘              └─────────────┬─────────────┘    │
//! │             └───────────────┬────────────────────────┘                  │
//! │                             ▼                                           │
//! │        TaxEngine::calculate_line ──► split_tax ──► summarize            │
//! │        Money (paise, i64)   TaxRate (bps)   validation                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No I/O happens here. The only clock read stamps `created_at` on a new
//! order.
//!
//! ## Pricing one line
//!
//! ```rust
//! use tillwise_core::money::Money;
//! use tillwise_core::tax::TaxEngine;
//! use tillwise_core::types::{SplitType, TaxConfiguration, TaxRate, TaxTreatment};
//!
//! let gst = TaxTreatment::Taxed(TaxConfiguration {
//!     rate: TaxRate::from_bps(1800),
//!     split_type: SplitType::Gst5050,
//!     is_tax_inclusive: false,
//! });
//!
//! let line = TaxEngine::calculate_line(Money::from_paise(10000), 2, &gst).unwrap();
//! assert_eq!(line.taxable_value.paise(), 20000);
//! assert_eq!(line.tax_amount.paise(), 3600);
//! assert_eq!(line.cgst.paise(), 1800);
//! assert_eq!(line.line_total.paise(), 23600);
//! ```

pub mod error;
pub mod money;
pub mod order;
pub mod tax;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{OrderBuilder, OrderLine, OrderTotals};
pub use tax::{BillSummary, LineTaxBreakdown, TaxEngine};
pub use types::*;

/// Distinct lines one order may hold.
pub const MAX_ORDER_LINES: usize = 100;

/// Units of one product on a single line. Catches 1000 typed for 10.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Characters allowed in tax group, category and product names.
pub const MAX_NAME_LENGTH: usize = 255;
