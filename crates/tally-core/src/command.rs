//! # Gateway Commands
//!
//! Payloads the session layer hands to the Transaction Gateway.
//!
//! ## Idempotent Submission
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier taps "Charge" twice (or the first response is lost)           │
//! │                                                                         │
//! │  SaleDraft ── prepare() ──► CreateSaleCommand { key: K, ... }          │
//! │                                   │                                     │
//! │            ┌──────────────────────┴──────────────────────┐             │
//! │            ▼                                             ▼             │
//! │   create_sale(K) ─► new sale #41          create_sale(K) ─► sale #41   │
//! │   stock decremented                       deduplicated = true,         │
//! │                                           stock untouched              │
//! │                                                                         │
//! │  The draft keeps K until it is cleared after a successful submit.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing;
use crate::types::{Attributable, PaymentMethod, SaleStatus};
use crate::validation::{
    validate_amount, validate_id, validate_notes, validate_price, validate_quantity,
    ValidationResult,
};
use crate::MAX_DRAFT_ITEMS;

// =============================================================================
// Idempotency Key
// =============================================================================

/// Identifies one logical sale submission (UUID v4 text).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn new() -> Self {
        IdempotencyKey(uuid::Uuid::new_v4().to_string())
    }

    /// Accepts a key produced elsewhere (e.g. persisted by the console).
    pub fn parse(value: &str) -> ValidationResult<Self> {
        let parsed = uuid::Uuid::parse_str(value.trim()).map_err(|_| {
            ValidationError::InvalidFormat {
                field: "idempotency_key".to_string(),
                reason: "must be a valid UUID".to_string(),
            }
        })?;
        Ok(IdempotencyKey(parsed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Create Sale
// =============================================================================

/// One line of a new sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleLine {
    pub product_id: String,
    pub quantity: i64,
    /// Price captured in the draft (snapshot or manual override).
    pub unit_price_cents: i64,
}

impl pricing::Priced for NewSaleLine {
    fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

/// Everything the gateway needs to atomically create a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateSaleCommand {
    pub idempotency_key: IdempotencyKey,
    pub venue_id: String,
    pub attribution: Attributable,
    pub items: Vec<NewSaleLine>,
    pub payment_method: PaymentMethod,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub notes: Option<String>,
    /// `Pending` or `Completed`.
    pub initial_status: SaleStatus,
}

impl CreateSaleCommand {
    pub fn totals(&self) -> pricing::Totals {
        pricing::Totals::compute(
            &self.items,
            Money::from_cents(self.discount_cents),
            Money::from_cents(self.tax_cents),
        )
    }

    /// Full local validation. The gateway calls this too before opening its
    /// transaction.
    pub fn validate(&self) -> CoreResult<()> {
        validate_id("venue_id", &self.venue_id)?;
        validate_id("employee_id", self.attribution.id())?;
        validate_id("employee_name", self.attribution.name())?;

        if self.items.is_empty() {
            return Err(CoreError::EmptyDraft);
        }
        if self.items.len() > MAX_DRAFT_ITEMS {
            return Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_ITEMS,
            });
        }
        if self.initial_status.is_terminal() {
            return Err(CoreError::InvalidTransition {
                sale_id: self.idempotency_key.to_string(),
                from: SaleStatus::Pending,
                to: self.initial_status,
            });
        }

        for line in &self.items {
            validate_id("product_id", &line.product_id)?;
            validate_quantity(line.quantity)?;
            validate_price(Money::from_cents(line.unit_price_cents))?;
        }

        validate_amount("discount", Money::from_cents(self.discount_cents))?;
        validate_amount("tax", Money::from_cents(self.tax_cents))?;
        validate_notes(self.notes.as_deref())?;
        self.totals().validated()?;

        Ok(())
    }
}

/// What the gateway returns for `create_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale_id: String,
    pub sale_number: i64,
    /// The key had already been used; no new sale was created.
    pub deduplicated: bool,
}

// =============================================================================
// Item Patch
// =============================================================================

/// Partial update of a persisted line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemPatch {
    pub quantity: Option<i64>,
    pub unit_price: Option<Money>,
}

impl ItemPatch {
    pub fn quantity(quantity: i64) -> Self {
        ItemPatch {
            quantity: Some(quantity),
            unit_price: None,
        }
    }

    pub fn unit_price(price: Money) -> Self {
        ItemPatch {
            quantity: None,
            unit_price: Some(price),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity.is_none() && self.unit_price.is_none()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.is_empty() {
            return Err(ValidationError::Required {
                field: "quantity or unit_price".to_string(),
            });
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(price) = self.unit_price {
            validate_price(price)?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateSaleCommand {
        CreateSaleCommand {
            idempotency_key: IdempotencyKey::new(),
            venue_id: crate::DEFAULT_VENUE_ID.to_string(),
            attribution: Attributable::Admin {
                id: "a-1".to_string(),
                name: "Owner".to_string(),
            },
            items: vec![NewSaleLine {
                product_id: "p1".to_string(),
                quantity: 2,
                unit_price_cents: 1000,
            }],
            payment_method: PaymentMethod::Cash,
            discount_cents: 0,
            tax_cents: 0,
            notes: None,
            initial_status: SaleStatus::Completed,
        }
    }

    #[test]
    fn test_valid_command() {
        let cmd = command();
        assert!(cmd.validate().is_ok());
        assert_eq!(cmd.totals().total.cents(), 2000);
    }

    #[test]
    fn test_negative_total_rejected() {
        let mut cmd = command();
        cmd.discount_cents = 2500;
        assert!(matches!(
            cmd.validate(),
            Err(CoreError::Validation(ValidationError::NegativeTotal { .. }))
        ));
    }

    #[test]
    fn test_oversized_price_or_tax_rejected() {
        let mut cmd = command();
        cmd.items[0].unit_price_cents = i64::MAX;
        cmd.tax_cents = 1;
        assert!(matches!(
            cmd.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut cmd = command();
        cmd.tax_cents = i64::MAX;
        assert!(matches!(
            cmd.validate(),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn test_terminal_initial_status_rejected() {
        let mut cmd = command();
        cmd.initial_status = SaleStatus::Refunded;
        assert!(matches!(
            cmd.validate(),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut cmd = command();
        cmd.items.clear();
        assert_eq!(cmd.validate(), Err(CoreError::EmptyDraft));
    }

    #[test]
    fn test_idempotency_key_parse() {
        let key = IdempotencyKey::new();
        assert_eq!(IdempotencyKey::parse(key.as_str()).unwrap(), key);
        assert!(IdempotencyKey::parse("twice").is_err());
        assert_ne!(IdempotencyKey::new(), IdempotencyKey::new());
    }

    #[test]
    fn test_item_patch_validation() {
        assert!(ItemPatch::default().validate().is_err());
        assert!(ItemPatch::quantity(0).validate().is_err());
        assert!(ItemPatch::unit_price(Money::from_cents(-1)).validate().is_err());
        assert!(ItemPatch::unit_price(Money::from_cents(i64::MAX)).validate().is_err());
        assert!(ItemPatch::quantity(3).validate().is_ok());
    }
}
