//! # Input Checks
//!
//! Boundary rules shared by the calculator, the order builder and the
//! store's drafts. Every check either hands back a cleaned value or a
//! [`ValidationError`] naming the field.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cashier input ──► order screen stepper (never below 1)                 │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   these checks ──► ValidationError { field, .. }        │
//! │                        │                                                │
//! │                        ▼                                                │
//! │                   SQLite CHECK / UNIQUE NOCASE / foreign keys           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```rust
//! use tillwise_core::validation::{validate_name, validate_quantity};
//!
//! assert_eq!(validate_name("name", "  Masala Chai ").unwrap(), "Masala Chai");
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_NAME_LENGTH, MAX_ORDER_LINES};

pub type ValidationResult<T> = Result<T, ValidationError>;

pub const MAX_BARCODE_LENGTH: usize = 100;

/// Longest search text the product lookup accepts.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// 100% in basis points.
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

fn required(field: &str) -> ValidationError {
    ValidationError::Required {
        field: field.to_string(),
    }
}

fn too_long(field: &str, max: usize) -> ValidationError {
    ValidationError::TooLong {
        field: field.to_string(),
        max,
    }
}

/// Trims `raw` and bounds its length in characters.
fn trimmed_within(field: &str, raw: &str, max: usize) -> ValidationResult<String> {
    let value = raw.trim();
    if value.chars().count() > max {
        return Err(too_long(field, max));
    }
    Ok(value.to_owned())
}

// =============================================================================
// Text
// =============================================================================

/// Display name of a tax group, category or product.
///
/// Returns the trimmed name; blank or longer than 255 characters is refused.
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = trimmed_within(field, name, MAX_NAME_LENGTH)?;
    if name.is_empty() {
        return Err(required(field));
    }
    Ok(name)
}

/// Printed or scanned product code. Inner whitespace is refused.
pub fn validate_barcode(barcode: &str) -> ValidationResult<String> {
    let barcode = trimmed_within("barcode", barcode, MAX_BARCODE_LENGTH)?;

    if barcode.is_empty() {
        Err(required("barcode"))
    } else if barcode.contains(char::is_whitespace) {
        Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain spaces".to_string(),
        })
    } else {
        Ok(barcode)
    }
}

/// Product search text. An empty query is fine and means "everything".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    trimmed_within("query", query, MAX_SEARCH_LENGTH)
}

// =============================================================================
// Amounts
// =============================================================================

/// Units on one order line: 1 through [`MAX_ITEM_QUANTITY`].
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    match qty {
        q if q < 1 => Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }),
        q if q > MAX_ITEM_QUANTITY => Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        }),
        _ => Ok(()),
    }
}

/// Zero is a valid price (complimentary items).
pub fn validate_price_paise(paise: i64) -> ValidationResult<()> {
    if paise.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }
    Ok(())
}

/// Percent bounds are reported in whole percent, not bps.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps <= MAX_TAX_RATE_BPS {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 100,
        })
    }
}

/// Units received into stock.
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    if qty > 0 {
        Ok(())
    } else {
        Err(ValidationError::MustBePositive {
            field: "stock quantity".to_string(),
        })
    }
}

/// Whether an order holding `current_lines` distinct lines can take another.
pub fn validate_order_size(current_lines: usize) -> ValidationResult<()> {
    if current_lines < MAX_ORDER_LINES {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        field: "order lines".to_string(),
        min: 0,
        max: MAX_ORDER_LINES as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_trimmed_and_bounded() {
        assert_eq!(validate_name("name", "GST 18%").unwrap(), "GST 18%");
        assert_eq!(validate_name("name", "  Chai  ").unwrap(), "Chai");
        assert_eq!(validate_name("name", &"é".repeat(255)).unwrap().chars().count(), 255);

        for blank in ["", "   ", "\t\n"] {
            assert!(matches!(
                validate_name("name", blank),
                Err(ValidationError::Required { .. })
            ));
        }
        assert!(matches!(
            validate_name("name", &"A".repeat(256)),
            Err(ValidationError::TooLong { max: 255, .. })
        ));
    }

    #[test]
    fn test_barcode_rules() {
        assert_eq!(validate_barcode(" 8901234567890 ").unwrap(), "8901234567890");
        assert!(matches!(
            validate_barcode("89 01"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(validate_barcode(&"1".repeat(101)).is_err());
        assert!(validate_barcode(" ").is_err());
    }

    #[test]
    fn test_search_query_may_be_empty() {
        assert_eq!(validate_search_query("  ").unwrap(), "");
        assert_eq!(validate_search_query(" dosa ").unwrap(), "dosa");
        assert!(validate_search_query(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        for ok in [1, 2, 998, 999] {
            assert!(validate_quantity(ok).is_ok(), "{ok}");
        }
        for bad in [i64::MIN, -1, 0, 1000] {
            assert!(validate_quantity(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_price_and_rate_bounds() {
        assert!(validate_price_paise(0).is_ok());
        assert!(validate_price_paise(4550).is_ok());
        assert!(validate_price_paise(-1).is_err());

        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1800).is_ok());
        assert!(validate_tax_rate_bps(MAX_TAX_RATE_BPS).is_ok());
        assert!(validate_tax_rate_bps(MAX_TAX_RATE_BPS + 1).is_err());
    }

    #[test]
    fn test_stock_receipts_must_add_something() {
        assert!(validate_stock_quantity(12).is_ok());
        assert!(validate_stock_quantity(0).is_err());
        assert!(validate_stock_quantity(-5).is_err());
    }

    #[test]
    fn test_order_line_limit() {
        assert!(validate_order_size(0).is_ok());
        assert!(validate_order_size(MAX_ORDER_LINES - 1).is_ok());
        assert!(validate_order_size(MAX_ORDER_LINES).is_err());
    }
}
