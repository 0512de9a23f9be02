//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule failures                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - Caller-facing taxonomy                         │
//! │                                                                         │
//! │  tally-db errors (separate crate)                                      │
//! │  └── DbError          - Storage failures (wraps CoreError)             │
//! │                                                                         │
//! │  server errors (in app)                                                │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Error Kind
// =============================================================================

/// The four outcomes a caller of the ledger has to distinguish.
///
/// | Kind | Meaning | Storage effect |
/// |---|---|---|
/// | `InvalidRequest` | malformed or out-of-range input | none |
/// | `NotFound` | referenced row does not exist | none |
/// | `ConsistencyViolation` | would oversell or overpay under a strict policy | rolled back |
/// | `StorageFailure` | commit failed (conflict, timeout, connectivity) | rolled back |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    ConsistencyViolation,
    StorageFailure,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The request cannot be executed as written.
    ///
    /// ## When This Occurs
    /// - Empty cart
    /// - Product in the cart is unknown or inactive
    /// - Unit price differs from the sell price and overrides are off
    /// - Credit sale without a customer
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Selling more than is on hand while the stock floor is strict.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 5)
    ///      │
    ///      ▼
    /// UPDATE ... WHERE stock_quantity >= 5  → 0 rows
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, client shows "Only 3 in stock"
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A payment larger than what is still owed on the sale.
    #[error("Payment of {amount} exceeds remaining balance {remaining} on sale {sale_id}")]
    Overpayment {
        sale_id: String,
        amount: Money,
        remaining: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidRequest error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidRequest(reason.into())
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Classifies this error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidRequest(_) | CoreError::Validation(_) => ErrorKind::InvalidRequest,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. } | CoreError::Overpayment { .. } => {
                ErrorKind::ConsistencyViolation
            }
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before any storage work runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for p-1: available 3, requested 5"
        );

        let err = CoreError::Overpayment {
            sale_id: "s-1".to_string(),
            amount: Money::from_cents(6000),
            remaining: Money::from_cents(5000),
        };
        assert_eq!(
            err.to_string(),
            "Payment of 60.00 exceeds remaining balance 50.00 on sale s-1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "items".to_string(),
        };
        assert_eq!(err.to_string(), "items is required");

        let err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "items".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(CoreError::invalid("empty").kind(), ErrorKind::InvalidRequest);
        assert_eq!(CoreError::not_found("Sale", "x").kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::InsufficientStock {
                product_id: "p".into(),
                available: 0,
                requested: 1
            }
            .kind(),
            ErrorKind::ConsistencyViolation
        );
    }
}
