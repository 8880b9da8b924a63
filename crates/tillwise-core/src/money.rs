//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Paise                                            │
//! │    Every amount is a whole number of paise (1/100 rupee).              │
//! │    Multiplication by a quantity is exact; only the tax divisions       │
//! │    round, and they round half away from zero to 2 decimal places.     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tillwise_core::money::Money;
//!
//! let price = Money::from_paise(11800); // ₹118.00
//! let total = price * 2;                 // ₹236.00
//! assert_eq!(total.paise(), 23600);
//!
//! let parsed: Money = "118.00".parse().unwrap();
//! assert_eq!(parsed, price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;

/// Basis points in 100%.
const BPS_SCALE: i128 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (the smallest rupee unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for adjustments
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer**: the UI receives paise
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_paise ──► OrderLine.unit_price ──► LineTaxBreakdown     │
/// │                                                        │                │
/// │                                   OrderTotals ◄────────┘                │
/// │                                        │                                │
/// │                              Bill.total_paise (authoritative)           │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    ///
    /// let price = Money::from_paise(4550); // ₹45.50
    /// assert_eq!(price.paise(), 4550);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees_paise(-5, 50)` is -₹5.50.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
    /// assert_eq!(Money::from_rupees_paise(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    ///
    /// let unit_price = Money::from_paise(4500);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_paise(13500)));
    /// assert_eq!(Money::from_paise(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(paise) => Some(Money(paise)),
            None => None,
        }
    }

    /// Computes `self × rate`, rounded half away from zero to the paisa.
    ///
    /// This is the exclusive-pricing tax: the price excludes tax and the
    /// tax is added on top.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::types::TaxRate;
    ///
    /// let taxable = Money::from_paise(20000); // ₹200.00
    /// let tax = taxable.calculate_tax(TaxRate::from_bps(1800)); // 18%
    /// assert_eq!(tax.paise(), 3600);
    ///
    /// // ₹10.00 at 8.25% = ₹0.825 → ₹0.83
    /// assert_eq!(Money::from_paise(1000).calculate_tax(TaxRate::from_bps(825)).paise(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        let tax = div_round_half_up(self.0 as i128 * rate.bps() as i128, BPS_SCALE);
        Money(tax as i64)
    }

    /// Extracts the taxable value from a tax-inclusive amount.
    ///
    /// `taxable = self / (1 + rate)`, rounded half away from zero.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    /// use tillwise_core::types::TaxRate;
    ///
    /// let inclusive = Money::from_paise(11800); // ₹118.00 incl. 18%
    /// assert_eq!(inclusive.extract_taxable(TaxRate::from_bps(1800)).paise(), 10000);
    /// ```
    pub fn extract_taxable(&self, rate: TaxRate) -> Money {
        let taxable = div_round_half_up(
            self.0 as i128 * BPS_SCALE,
            BPS_SCALE + rate.bps() as i128,
        );
        Money(taxable as i64)
    }

    /// Halves the amount, rounding half away from zero.
    ///
    /// ```rust
    /// use tillwise_core::money::Money;
    ///
    /// assert_eq!(Money::from_paise(5).halve().paise(), 3);
    /// assert_eq!(Money::from_paise(3600).halve().paise(), 1800);
    /// ```
    pub fn halve(&self) -> Money {
        Money(div_round_half_up(self.0 as i128, 2) as i64)
    }
}

/// Integer division rounding half away from zero (decimal ROUND_HALF_UP).
///
/// `denominator` must be positive.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    if 2 * remainder.abs() >= denominator {
        quotient + numerator.signum()
    } else {
        quotient
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `123.45` rendering; currency symbols and grouping belong to the
/// till configuration.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

/// Parses a decimal rupee amount such as `"118"`, `"45.5"` or `"-2.25"`.
///
/// More than two fractional digits are rounded half away from zero, so
/// `"0.125"` becomes 13 paise.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("expected a number"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("expected digits with an optional decimal point"));
        }

        let overflow = || ValidationError::Overflow {
            field: "amount".to_string(),
        };

        let mut paise: i64 = 0;
        for c in whole.chars() {
            paise = paise
                .checked_mul(10)
                .and_then(|p| p.checked_add(i64::from(c as u8 - b'0')))
                .ok_or_else(overflow)?;
        }

        let mut frac_digits = frac.bytes().map(|b| i64::from(b - b'0'));
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().is_some_and(|d| d >= 5);

        paise = paise
            .checked_mul(100)
            .and_then(|p| p.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -paise } else { paise }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a line quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
