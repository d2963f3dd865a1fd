//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core (this file)                                                │
//! │  ├── ValidationError  - Local checks, raised before any remote call    │
//! │  └── CoreError        - Domain rejections (stock, terminal sale, ...)  │
//! │                                                                         │
//! │  tally-core gateway.rs                                                 │
//! │  └── GatewayError     - Domain rejection OR store unavailable          │
//! │                                                                         │
//! │  tally-db                                                              │
//! │  └── DbError          - sqlx failures, mapped to GatewayError          │
//! │                                                                         │
//! │  tally-session                                                         │
//! │  └── SessionError     - What the console surface sees                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → GatewayError → SessionError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;
use crate::types::SaleStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// The Transaction Gateway reports these verbatim; the session layer never
/// retries them, because a retried stock-insufficient submission could
/// succeed later with quantities the cashier did not intend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Product id is unknown to the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but has been retired from the catalog.
    #[error("Product {0} is not active")]
    ProductInactive(String),

    /// Not enough stock to cover the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Submit sale (Gin Tonic × 5)
    ///      │
    ///      ▼
    /// Gateway checks stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Console keeps the draft and shows "Only 3 left"
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    #[error("Sale item not found: {0}")]
    SaleItemNotFound(String),

    #[error("Draft item not found: {0}")]
    DraftItemNotFound(String),

    /// Cancelled and refunded sales are immutable.
    #[error("Sale {sale_id} is {status}; terminal sales cannot be modified")]
    TerminalSale { sale_id: String, status: SaleStatus },

    /// The state machine has no edge for this transition.
    #[error("Sale {sale_id} cannot move from {from} to {to}")]
    InvalidTransition {
        sale_id: String,
        from: SaleStatus,
        to: SaleStatus,
    },

    #[error("Draft cannot have more than {max} items")]
    DraftTooLarge { max: usize },

    #[error("Draft has no items")]
    EmptyDraft,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised locally before anything is sent to the
/// Transaction Gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} cannot be negative")]
    CannotBeNegative { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// `subtotal - discount + tax` came out below zero.
    #[error("Sale total cannot be negative (would be {total})")]
    NegativeTotal { total: Money },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn cannot_be_negative(field: impl Into<String>) -> Self {
        ValidationError::CannotBeNegative {
            field: field.into(),
        }
    }
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
            product_id: "gin-tonic".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for gin-tonic: available 3, requested 5"
        );

        let err = CoreError::TerminalSale {
            sale_id: "s-1".to_string(),
            status: SaleStatus::Refunded,
        };
        assert_eq!(
            err.to_string(),
            "Sale s-1 is refunded; terminal sales cannot be modified"
        );
    }

    #[test]
    fn test_negative_total_message() {
        let err = ValidationError::NegativeTotal {
            total: Money::from_cents(-500),
        };
        assert_eq!(
            err.to_string(),
            "Sale total cannot be negative (would be -$5.00)"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("refund_reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
