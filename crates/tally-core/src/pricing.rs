//! # Pricing Calculator
//!
//! Pure arithmetic over line items. No side effects, no rounding: every
//! amount is integer cents and products of price × quantity are widened to
//! i128 inside [`Money::multiply_quantity`].
//!
//! ```text
//!   subtotal = Σ quantity_i × unit_price_i
//!   total    = subtotal − discount + tax
//! ```
//!
//! A negative `total` is rejected here, before any gateway call. The SQLite
//! gateway checks again inside its transaction.
//!
//! ## Example
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::pricing;
//!
//! let subtotal = pricing::line_total(2, Money::from_cents(1000));
//! let total = pricing::total(subtotal, Money::zero(), Money::zero());
//! assert_eq!(total.cents(), 2000);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::SaleItem;
use crate::validation::{validate_total, ValidationResult};

// =============================================================================
// Priced Lines
// =============================================================================

/// Anything that contributes `quantity × unit_price` to a subtotal.
pub trait Priced {
    fn unit_price(&self) -> Money;
    fn quantity(&self) -> i64;

    fn line_total(&self) -> Money {
        line_total(self.quantity(), self.unit_price())
    }
}

impl Priced for SaleItem {
    fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

// =============================================================================
// Functions
// =============================================================================

#[inline]
pub fn line_total(quantity: i64, unit_price: Money) -> Money {
    unit_price.multiply_quantity(quantity)
}

pub fn subtotal<P: Priced>(items: &[P]) -> Money {
    items.iter().map(Priced::line_total).sum()
}

#[inline]
pub fn total(subtotal: Money, discount: Money, tax: Money) -> Money {
    subtotal - discount + tax
}

/// Rejects a total below zero with [`ValidationError::NegativeTotal`].
pub fn ensure_non_negative_total(total: Money) -> ValidationResult<Money> {
    validate_total(total)?;
    Ok(total)
}

// =============================================================================
// Totals
// =============================================================================

/// Full price breakdown of a draft or sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl Totals {
    pub fn compute<P: Priced>(items: &[P], discount: Money, tax: Money) -> Self {
        let subtotal = subtotal(items);
        Totals {
            subtotal,
            discount,
            tax,
            total: total(subtotal, discount, tax),
        }
    }

    /// Returns `self` if the total is non-negative.
    pub fn validated(self) -> Result<Self, ValidationError> {
        ensure_non_negative_total(self.total)?;
        Ok(self)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Line(i64, i64);

    impl Priced for Line {
        fn unit_price(&self) -> Money {
            Money::from_cents(self.1)
        }

        fn quantity(&self) -> i64 {
            self.0
        }
    }

    #[test]
    fn test_single_line_without_discount() {
        // Two units at $10.00, no discount
        let totals = Totals::compute(&[Line(2, 1000)], Money::zero(), Money::zero());
        assert_eq!(totals.subtotal.cents(), 2000);
        assert_eq!(totals.total.cents(), 2000);
        assert!(totals.validated().is_ok());
    }

    #[test]
    fn test_discount_larger_than_subtotal_is_rejected() {
        let totals = Totals::compute(&[Line(2, 1000)], Money::from_cents(2500), Money::zero());
        assert_eq!(totals.total.cents(), -500);
        assert_eq!(
            totals.validated(),
            Err(ValidationError::NegativeTotal {
                total: Money::from_cents(-500)
            })
        );
    }

    #[test]
    fn test_tax_is_added() {
        let totals = Totals::compute(
            &[Line(1, 800), Line(3, 450)],
            Money::from_cents(100),
            Money::from_cents(215),
        );
        assert_eq!(totals.subtotal.cents(), 2150);
        assert_eq!(totals.total.cents(), 2265);
    }

    #[test]
    fn test_empty_subtotal_is_zero() {
        let lines: [Line; 0] = [];
        assert_eq!(subtotal(&lines), Money::zero());
    }

    proptest! {
        #[test]
        fn prop_total_rejected_iff_negative(
            lines in prop::collection::vec((1i64..50, 0i64..100_000), 0..10),
            discount in 0i64..1_000_000,
            tax in 0i64..100_000,
        ) {
            let lines: Vec<Line> = lines.into_iter().map(|(q, p)| Line(q, p)).collect();
            let totals = Totals::compute(&lines, Money::from_cents(discount), Money::from_cents(tax));
            let expected: i64 = lines.iter().map(|l| l.0 * l.1).sum::<i64>() - discount + tax;

            prop_assert_eq!(totals.total.cents(), expected);
            prop_assert_eq!(totals.validated().is_err(), expected < 0);
        }
    }
}
