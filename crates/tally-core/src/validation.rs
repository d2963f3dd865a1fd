//! # Validation Module
//!
//! Local input validation, run before anything reaches the Transaction Gateway.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Console surface                                              │
//! │  ├── Disables controls for terminal sales                              │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: SaleLifecycleManager (never trusts layer 1)                  │
//! │  └── THIS MODULE: quantities, prices, reasons, projected totals        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Transaction Gateway (SQLite)                                 │
//! │  ├── Conditional stock decrement                                       │
//! │  ├── Status re-check inside the transaction                            │
//! │  └── CHECK / UNIQUE / foreign key constraints                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_quantity, validate_reason};
//!
//! assert!(validate_quantity(5).is_ok());
//! assert!(validate_reason("  ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{
    MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_NOTES_LENGTH, MAX_REASON_LENGTH, MAX_UNIT_PRICE_CENTS,
};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product search query.
///
/// ## Rules
/// - Can be empty (returns all products)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a cancel / refund reason.
///
/// ## Rules
/// - Must not be blank
/// - At most `MAX_REASON_LENGTH` characters
///
/// ## Returns
/// The trimmed reason.
///
/// ```rust
/// use tally_core::validation::validate_reason;
///
/// assert_eq!(validate_reason(" wrong order ").unwrap(), "wrong order");
/// assert!(validate_reason("").is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::required("refund_reason"));
    }

    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field: "refund_reason".to_string(),
            max: MAX_REASON_LENGTH,
        });
    }

    Ok(reason.to_string())
}

/// Validates free-text sale notes. Blank notes collapse to `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LENGTH,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Validates that an identifier is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sales list: edit line on sale #42                                      │
/// │                                                                         │
/// │  User enters quantity: 5                                               │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(5) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       │                                                                 │
/// │       ├── qty > 999? → Error: "quantity must be between 1 and 999"     │
/// │       │                                                                 │
/// │       └── OK → Gateway update_item                                     │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (comped drinks).
///
/// ## Rules
/// - Must not be negative
/// - At most `MAX_UNIT_PRICE_CENTS`
///
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(0)).is_ok());
/// assert!(validate_price(Money::from_cents(-100)).is_err());
/// assert!(validate_price(Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    validate_bounded("unit_price", price, MAX_UNIT_PRICE_CENTS)
}

/// Validates a sale-level amount (discount, tax).
///
/// ## Rules
/// - Must not be negative
/// - At most `MAX_AMOUNT_CENTS`
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    validate_bounded(field, amount, MAX_AMOUNT_CENTS)
}

fn validate_bounded(field: &str, amount: Money, max: i64) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::cannot_be_negative(field));
    }
    if amount.cents() > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max,
        });
    }
    Ok(())
}

/// Validates a projected sale total.
pub fn validate_total(total: Money) -> ValidationResult<()> {
    if total.is_negative() {
        return Err(ValidationError::NegativeTotal { total });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(validate_reason("customer left").unwrap(), "customer left");
        assert!(matches!(
            validate_reason("   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_reason(&"x".repeat(MAX_REASON_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some(" table 4 ")).unwrap(),
            Some("table 4".to_string())
        );
        assert!(validate_notes(Some(&"n".repeat(MAX_NOTES_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_amount("discount", Money::from_cents(-1)).is_err());
        assert!(validate_amount("tax", Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        assert!(validate_amount("tax", Money::from_cents(MAX_AMOUNT_CENTS + 1)).is_err());
        assert!(validate_price(Money::from_cents(MAX_UNIT_PRICE_CENTS)).is_ok());
        assert_eq!(
            validate_price(Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange {
                field: "unit_price".to_string(),
                min: 0,
                max: MAX_UNIT_PRICE_CENTS,
            })
        );
        assert!(validate_total(Money::zero()).is_ok());
        assert_eq!(
            validate_total(Money::from_cents(-500)),
            Err(ValidationError::NegativeTotal {
                total: Money::from_cents(-500)
            })
        );
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  gin ").unwrap(), "gin");
        assert!(validate_search_query(&"q".repeat(101)).is_err());
    }
}
