//! # Tax Engine
//!
//! GST preview calculation for order lines and order-level aggregation.
//!
//! ## Pricing Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  gross = unit_price × quantity                                          │
//! │                                                                         │
//! │  Untaxed / 0%   taxable = gross            tax = 0                     │
//! │                                                                         │
//! │  Inclusive      taxable = gross / (1+r)    tax = gross - taxable       │
//! │                 total   = gross                                         │
//! │                                                                         │
//! │  Exclusive      taxable = gross            tax = gross × r             │
//! │                 total   = taxable + tax                                 │
//! │                                                                         │
//! │  GST_50_50      cgst = tax / 2 (half up)   sgst = tax - cgst           │
//! │  NO_SPLIT       cgst = tax                 sgst = 0                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every figure is rounded to the paisa, half away from zero. SGST is always
//! derived by subtraction, so `cgst + sgst == tax` holds exactly even when
//! the tax is an odd number of paise.
//!
//! The order screen uses these numbers as a preview only; the bill store
//! recomputes them when the bill is submitted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{SplitType, TaxTreatment};
use crate::validation::{validate_price_paise, validate_tax_rate_bps};

// =============================================================================
// Results
// =============================================================================

/// Tax breakdown for a single order line.
///
/// ## Invariants
/// - `line_total == taxable_value + tax_amount`
/// - `cgst + sgst == tax_amount`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineTaxBreakdown {
    /// Price before tax (exclusive) or the price with tax extracted (inclusive).
    pub taxable_value: Money,
    pub tax_amount: Money,
    /// Central GST component.
    pub cgst: Money,
    /// State GST component.
    pub sgst: Money,
    pub line_total: Money,
}

impl LineTaxBreakdown {
    /// Breakdown for a line that carries no tax.
    pub fn untaxed(gross: Money) -> Self {
        LineTaxBreakdown {
            taxable_value: gross,
            tax_amount: Money::zero(),
            cgst: Money::zero(),
            sgst: Money::zero(),
            line_total: gross,
        }
    }
}

/// Order-level totals folded from line breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillSummary {
    /// Sum of taxable values.
    pub subtotal: Money,
    pub total_tax: Money,
    pub total_cgst: Money,
    pub total_sgst: Money,
    /// Sum of line totals.
    pub grand_total: Money,
}

impl BillSummary {
    fn with_line(self, line: &LineTaxBreakdown) -> Option<Self> {
        Some(BillSummary {
            subtotal: self.subtotal.checked_add(line.taxable_value)?,
            total_tax: self.total_tax.checked_add(line.tax_amount)?,
            total_cgst: self.total_cgst.checked_add(line.cgst)?,
            total_sgst: self.total_sgst.checked_add(line.sgst)?,
            grand_total: self.grand_total.checked_add(line.line_total)?,
        })
    }
}

// =============================================================================
// Tax Engine
// =============================================================================

/// Pure tax calculator. Holds no state.
pub struct TaxEngine;

impl TaxEngine {
    /// Calculates the tax breakdown for one line.
    ///
    /// ## Errors
    /// `CoreError::InvalidArgument` when the quantity is not positive, the
    /// price is negative, the rate exceeds 100% or the line total does not
    /// fit in the money representation.
    ///
    /// ## Example
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::tax::TaxEngine;
    /// use tillwise_core::types::{SplitType, TaxConfiguration, TaxRate, TaxTreatment};
    ///
    /// // ₹118.00 including 18% GST
    /// let inclusive = TaxTreatment::Taxed(TaxConfiguration {
    ///     rate: TaxRate::from_bps(1800),
    ///     split_type: SplitType::Gst5050,
    ///     is_tax_inclusive: true,
    /// });
    /// let line = TaxEngine::calculate_line(Money::from_paise(11800), 1, &inclusive).unwrap();
    ///
    /// assert_eq!(line.line_total.paise(), 11800);
    /// assert_eq!(line.taxable_value.paise(), 10000);
    /// assert_eq!(line.cgst.paise(), 900);
    /// assert_eq!(line.sgst.paise(), 900);
    /// ```
    pub fn calculate_line(
        unit_price: Money,
        quantity: i64,
        treatment: &TaxTreatment,
    ) -> CoreResult<LineTaxBreakdown> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        validate_price_paise(unit_price.paise())?;

        let gross = unit_price
            .checked_mul_quantity(quantity)
            .ok_or_else(|| overflow("line total"))?;

        let config = match treatment {
            TaxTreatment::Taxed(config) => {
                validate_tax_rate_bps(config.rate.bps())?;
                if config.rate.is_zero() {
                    return Ok(LineTaxBreakdown::untaxed(gross));
                }
                config
            }
            TaxTreatment::Untaxed => return Ok(LineTaxBreakdown::untaxed(gross)),
        };

        let (taxable_value, tax_amount) = if config.is_tax_inclusive {
            let taxable = gross.extract_taxable(config.rate);
            (taxable, gross - taxable)
        } else {
            (gross, gross.calculate_tax(config.rate))
        };

        let line_total = taxable_value
            .paise()
            .checked_add(tax_amount.paise())
            .map(Money::from_paise)
            .ok_or_else(|| overflow("line total"))?;

        let (cgst, sgst) = Self::split_tax(tax_amount, config.split_type);

        Ok(LineTaxBreakdown {
            taxable_value,
            tax_amount,
            cgst,
            sgst,
            line_total,
        })
    }

    /// Splits a tax amount into (CGST, SGST).
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::tax::TaxEngine;
    /// use tillwise_core::types::SplitType;
    ///
    /// let (cgst, sgst) = TaxEngine::split_tax(Money::from_paise(5), SplitType::Gst5050);
    /// assert_eq!((cgst.paise(), sgst.paise()), (3, 2));
    /// ```
    pub fn split_tax(tax_amount: Money, split_type: SplitType) -> (Money, Money) {
        match split_type {
            SplitType::Gst5050 => {
                let cgst = tax_amount.halve();
                (cgst, tax_amount - cgst)
            }
            SplitType::NoSplit => (tax_amount, Money::zero()),
        }
    }

    /// Folds line breakdowns into order totals.
    ///
    /// Sums the already-rounded per-line figures and never re-rounds, so
    /// the totals always agree with the lines the cashier sees.
    ///
    /// ## Errors
    /// `CoreError::InvalidArgument` when a total does not fit in 64-bit
    /// paise. Each line may be valid on its own while their sum is not.
    pub fn summarize<'a, I>(lines: I) -> CoreResult<BillSummary>
    where
        I: IntoIterator<Item = &'a LineTaxBreakdown>,
    {
        lines
            .into_iter()
            .try_fold(BillSummary::default(), |summary, line| {
                summary
                    .with_line(line)
                    .ok_or_else(|| CoreError::from(overflow("bill total")))
            })
    }
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::Overflow {
        field: field.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaxConfiguration, TaxRate};
    use proptest::prelude::*;

    fn gst(bps: u32, split_type: SplitType, inclusive: bool) -> TaxTreatment {
        TaxTreatment::Taxed(TaxConfiguration {
            rate: TaxRate::from_bps(bps),
            split_type,
            is_tax_inclusive: inclusive,
        })
    }

    #[test]
    fn test_exclusive_even_split() {
        // ₹100 × 2 at 18% exclusive
        let line = TaxEngine::calculate_line(
            Money::from_paise(10000),
            2,
            &gst(1800, SplitType::Gst5050, false),
        )
        .unwrap();

        assert_eq!(line.taxable_value.paise(), 20000);
        assert_eq!(line.tax_amount.paise(), 3600);
        assert_eq!(line.cgst.paise(), 1800);
        assert_eq!(line.sgst.paise(), 1800);
        assert_eq!(line.line_total.paise(), 23600);
    }

    #[test]
    fn test_inclusive_even_split() {
        // ₹118 × 1 at 18% inclusive
        let line = TaxEngine::calculate_line(
            Money::from_paise(11800),
            1,
            &gst(1800, SplitType::Gst5050, true),
        )
        .unwrap();

        assert_eq!(line.line_total.paise(), 11800);
        assert_eq!(line.taxable_value.paise(), 10000);
        assert_eq!(line.tax_amount.paise(), 1800);
        assert_eq!(line.cgst.paise(), 900);
        assert_eq!(line.sgst.paise(), 900);
    }

    #[test]
    fn test_untaxed_line() {
        // ₹50 × 3, no tax group
        let line =
            TaxEngine::calculate_line(Money::from_paise(5000), 3, &TaxTreatment::Untaxed).unwrap();

        assert_eq!(line, LineTaxBreakdown::untaxed(Money::from_paise(15000)));
        assert!(line.tax_amount.is_zero());
    }

    #[test]
    fn test_zero_rate_behaves_like_untaxed() {
        for inclusive in [true, false] {
            let line = TaxEngine::calculate_line(
                Money::from_paise(5000),
                3,
                &gst(0, SplitType::Gst5050, inclusive),
            )
            .unwrap();
            assert_eq!(line, LineTaxBreakdown::untaxed(Money::from_paise(15000)));
        }
    }

    #[test]
    fn test_odd_paisa_split_reconciles() {
        let (cgst, sgst) = TaxEngine::split_tax(Money::from_paise(5), SplitType::Gst5050);
        assert_eq!(cgst.paise(), 3);
        assert_eq!(sgst.paise(), 2);
        assert_eq!(cgst + sgst, Money::from_paise(5));
    }

    #[test]
    fn test_no_split_reports_everything_as_cgst() {
        let line = TaxEngine::calculate_line(
            Money::from_paise(10000),
            1,
            &gst(500, SplitType::NoSplit, false),
        )
        .unwrap();

        assert_eq!(line.tax_amount.paise(), 500);
        assert_eq!(line.cgst.paise(), 500);
        assert!(line.sgst.is_zero());
    }

    #[test]
    fn test_inclusive_rounding_extracts_to_paisa() {
        // ₹100 incl. 18%: taxable 84.745... → 84.75, tax 15.25
        let line = TaxEngine::calculate_line(
            Money::from_paise(10000),
            1,
            &gst(1800, SplitType::Gst5050, true),
        )
        .unwrap();

        assert_eq!(line.taxable_value.paise(), 8475);
        assert_eq!(line.tax_amount.paise(), 1525);
        assert_eq!(line.cgst.paise(), 763);
        assert_eq!(line.sgst.paise(), 762);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let treatment = gst(1800, SplitType::Gst5050, false);

        let err = TaxEngine::calculate_line(Money::from_paise(100), 0, &treatment).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));

        let err = TaxEngine::calculate_line(Money::from_paise(-1), 1, &treatment).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));

        let err = TaxEngine::calculate_line(
            Money::from_paise(100),
            1,
            &gst(10001, SplitType::Gst5050, false),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));

        let err = TaxEngine::calculate_line(Money::from_paise(i64::MAX), 2, &treatment).unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[test]
    fn test_summarize_sums_rounded_lines() {
        // Three ₹0.25 lines at 10% exclusive: each tax 2.5 → 3 paise.
        // Summing rounded lines gives 9 paise; rounding the exact sum would give 8.
        let treatment = gst(1000, SplitType::Gst5050, false);
        let line = TaxEngine::calculate_line(Money::from_paise(25), 1, &treatment).unwrap();
        let summary = TaxEngine::summarize(&[line, line, line]).unwrap();

        assert_eq!(summary.subtotal.paise(), 75);
        assert_eq!(summary.total_tax.paise(), 9);
        assert_eq!(summary.total_cgst.paise(), 6);
        assert_eq!(summary.total_sgst.paise(), 3);
        assert_eq!(summary.grand_total.paise(), 84);
    }

    #[test]
    fn test_summarize_empty() {
        let summary = TaxEngine::summarize(&[]).unwrap();
        assert_eq!(summary, BillSummary::default());
        assert!(summary.grand_total.is_zero());
    }

    #[test]
    fn test_summarize_rejects_total_overflow() {
        // Each line fits on its own; two of them do not.
        let line = TaxEngine::calculate_line(
            Money::from_paise(i64::MAX / 4 + 1),
            1,
            &gst(10_000, SplitType::Gst5050, false),
        )
        .unwrap();
        assert!(line.line_total.is_positive());

        let err = TaxEngine::summarize(&[line, line]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidArgument(ValidationError::Overflow { .. })
        ));
        assert!(TaxEngine::summarize(&[line]).is_ok());
    }

    fn any_treatment() -> impl Strategy<Value = TaxTreatment> {
        prop_oneof![
            Just(TaxTreatment::Untaxed),
            (0u32..=10_000, any::<bool>(), any::<bool>()).prop_map(|(bps, split, inclusive)| {
                gst(
                    bps,
                    if split { SplitType::Gst5050 } else { SplitType::NoSplit },
                    inclusive,
                )
            }),
        ]
    }

    proptest! {
        /// Property: untaxed lines total exactly price × quantity
        #[test]
        fn prop_untaxed_total_is_gross(price in 0i64..10_000_000, qty in 1i64..1000) {
            let line = TaxEngine::calculate_line(Money::from_paise(price), qty, &TaxTreatment::Untaxed).unwrap();
            prop_assert_eq!(line.line_total.paise(), price * qty);
            prop_assert!(line.tax_amount.is_zero());
        }

        /// Property: taxable + tax == total, cgst + sgst == tax
        #[test]
        fn prop_line_reconciles(price in 0i64..10_000_000, qty in 1i64..1000, treatment in any_treatment()) {
            let line = TaxEngine::calculate_line(Money::from_paise(price), qty, &treatment).unwrap();
            prop_assert_eq!(line.taxable_value + line.tax_amount, line.line_total);
            prop_assert_eq!(line.cgst + line.sgst, line.tax_amount);
            prop_assert!(!line.tax_amount.is_negative());
        }

        /// Property: the split never drifts, even for odd paise
        #[test]
        fn prop_even_split_is_exact(tax in 0i64..10_000_000) {
            let (cgst, sgst) = TaxEngine::split_tax(Money::from_paise(tax), SplitType::Gst5050);
            prop_assert_eq!(cgst.paise() + sgst.paise(), tax);
            prop_assert!((cgst.paise() - sgst.paise()).abs() <= 1);
        }

        /// Property: identical inputs give identical outputs
        #[test]
        fn prop_idempotent(price in 0i64..10_000_000, qty in 1i64..1000, treatment in any_treatment()) {
            let first = TaxEngine::calculate_line(Money::from_paise(price), qty, &treatment).unwrap();
            let second = TaxEngine::calculate_line(Money::from_paise(price), qty, &treatment).unwrap();
            prop_assert_eq!(first, second);
        }

        /// Property: the exclusive total fed back as an inclusive price
        /// recovers the taxable value within one paisa
        #[test]
        fn prop_inclusive_exclusive_round_trip(price in 0i64..10_000_000, qty in 1i64..1000, bps in 1u32..=10_000) {
            let exclusive = TaxEngine::calculate_line(
                Money::from_paise(price), qty, &gst(bps, SplitType::Gst5050, false),
            ).unwrap();
            let inclusive = TaxEngine::calculate_line(
                exclusive.line_total, 1, &gst(bps, SplitType::Gst5050, true),
            ).unwrap();
            prop_assert!((inclusive.taxable_value.paise() - exclusive.taxable_value.paise()).abs() <= 1);
        }
    }
}
