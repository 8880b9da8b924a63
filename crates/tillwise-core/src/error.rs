//! # Error Types
//!
//! Domain-specific error types for tillwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tillwise-core errors (this file)                                      │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  tillwise-db errors (separate crate)                                   │
//! │  └── DbError          - Database failures, wraps CoreError rejections  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError::InvalidArgument → DbError          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Why the till refused an operation.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id doesn't exist in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but was soft-deleted. Carries the product name.
    #[error("Product is no longer sold: {0}")]
    ProductInactive(String),

    /// Not enough stock on the ledger to complete a bill.
    ///
    /// ## User Workflow
    /// ```text
    /// Submit bill (Masala Chai x 5)
    ///      │
    ///      ▼
    /// Ledger stock: 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Masala Chai", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Attempted to submit an order with no lines.
    #[error("Order has no items")]
    EmptyOrder,

    /// Order has exceeded maximum allowed lines.
    #[error("Order cannot have more than {max} lines")]
    OrderTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// No line for this product in the order.
    #[error("Product {0} is not in the order")]
    LineNotFound(String),

    /// A tax group cannot be deactivated while products still use it.
    #[error("Cannot deactivate tax group {id}: {product_count} product(s) still use it")]
    TaxGroupInUse { id: String, product_count: i64 },

    /// Case-insensitive name clash.
    #[error("{entity} with name '{name}' already exists")]
    DuplicateName { entity: String, name: String },

    /// Malformed input reached a calculation or repository.
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// A single field failed a boundary check.
///
/// `field` names the offending input as the order screen labels it
/// (`quantity`, `unit_price`, `name`, ...).
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Unparseable amount, rate, payment method or id.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Result does not fit in 64-bit paise.
    #[error("{field} is too large")]
    Overflow { field: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
