//! # Sale Draft
//!
//! The client-local, unpersisted sale-in-progress.
//!
//! ## Draft Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Draft Operations                                     │
//! │                                                                         │
//! │  Console Action           SaleDraft method        Draft State Change    │
//! │  ──────────────           ────────────────        ──────────────────    │
//! │                                                                         │
//! │  Tap product ────────────► add_item() ──────────► qty + 1 (clamped)    │
//! │                                                                         │
//! │  Type quantity ──────────► set_quantity() ──────► clamp to [1, stock]  │
//! │                                                   or remove if n ≤ 0    │
//! │                                                                         │
//! │  Comp a drink ───────────► set_unit_price() ────► price override       │
//! │                                                                         │
//! │  Charge ─────────────────► prepare() ───────────► (read only, command) │
//! │                                                                         │
//! │  Sale committed ─────────► clear() ─────────────► empty, new key       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock clamp is advisory: `available_quantity` is whatever the last
//! snapshot said. The Transaction Gateway re-checks stock when the sale is
//! committed and its rejection is the only authoritative failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::command::{CreateSaleCommand, IdempotencyKey, NewSaleLine};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{Priced, Totals};
use crate::types::{Attributable, PaymentMethod, Product, SaleStatus};
use crate::validation::{validate_amount, validate_notes, validate_price, ValidationResult};
use crate::{DEFAULT_VENUE_ID, MAX_DRAFT_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Draft Item
// =============================================================================

/// A line in the draft.
///
/// ## Design Notes
/// - `id`: generated locally, unrelated to the future `SaleItem` id
/// - `name` and `unit_price_cents` are frozen when the product is first added
/// - `available_quantity` is the stock ceiling from the most recent snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftItem {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    /// Always within `[1, available_quantity]`.
    pub quantity: i64,
    pub available_quantity: i64,
}

impl DraftItem {
    fn from_product(product: &Product) -> Self {
        DraftItem {
            id: uuid::Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.unit_price_cents,
            quantity: 1,
            available_quantity: product.available_quantity,
        }
    }

    /// Highest quantity this line may hold.
    fn ceiling(&self) -> i64 {
        self.available_quantity.clamp(1, MAX_ITEM_QUANTITY)
    }
}

impl Priced for DraftItem {
    fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    fn quantity(&self) -> i64 {
        self.quantity
    }
}

// =============================================================================
// Sale Draft
// =============================================================================

/// The sale being composed at the bar.
///
/// ## Invariants
/// - Items are unique by `product_id` (adding the same product again bumps
///   the quantity)
/// - Every item has `1 <= quantity <= available_quantity`
/// - At most `MAX_DRAFT_ITEMS` distinct lines
/// - `idempotency_key` survives failed submissions and is replaced only by
///   [`SaleDraft::clear`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    pub venue_id: String,
    pub items: Vec<DraftItem>,
    pub discount: Money,
    pub tax: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub idempotency_key: IdempotencyKey,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleDraft {
    /// Creates an empty draft for the default venue.
    pub fn new() -> Self {
        Self::for_venue(DEFAULT_VENUE_ID)
    }

    pub fn for_venue(venue_id: impl Into<String>) -> Self {
        SaleDraft {
            venue_id: venue_id.into(),
            items: Vec::new(),
            discount: Money::zero(),
            tax: Money::zero(),
            payment_method: PaymentMethod::default(),
            notes: None,
            idempotency_key: IdempotencyKey::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of `product`, or bumps an existing line by one.
    ///
    /// ## Behavior
    /// - Product already in draft: quantity + 1, clamped to the stock ceiling
    ///   taken from this snapshot
    /// - Product not in draft: new line with quantity 1 at the snapshot price
    /// - No stock in the snapshot: `InsufficientStock`, draft unchanged
    /// - Snapshot price above `MAX_UNIT_PRICE_CENTS`: rejected, draft unchanged
    ///
    /// ## Returns
    /// The line's resulting quantity.
    pub fn add_item(&mut self, product: &Product) -> CoreResult<i64> {
        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id.clone()));
        }
        validate_price(product.unit_price())?;

        let existing = self.items.iter().position(|i| i.product_id == product.id);

        if product.available_quantity <= 0 {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.available_quantity.max(0),
                requested: existing.map_or(1, |idx| self.items[idx].quantity + 1),
            });
        }

        if let Some(idx) = existing {
            let item = &mut self.items[idx];
            item.available_quantity = product.available_quantity;
            item.quantity = (item.quantity + 1).clamp(1, item.ceiling());
            return Ok(item.quantity);
        }

        if self.items.len() >= MAX_DRAFT_ITEMS {
            return Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_ITEMS,
            });
        }

        self.items.push(DraftItem::from_product(product));
        Ok(1)
    }

    /// Sets a line's quantity.
    ///
    /// ## Behavior
    /// - `n <= 0`: removes the line, returns `None`
    /// - otherwise: clamps `n` into `[1, available_quantity]`
    pub fn set_quantity(&mut self, item_id: &str, n: i64) -> CoreResult<Option<i64>> {
        if n <= 0 {
            self.remove(item_id)?;
            return Ok(None);
        }

        let item = self.item_mut(item_id)?;
        item.quantity = n.clamp(1, item.ceiling());
        Ok(Some(item.quantity))
    }

    /// Overrides a line's price (manual per-line discount). Must be ≥ 0.
    pub fn set_unit_price(&mut self, item_id: &str, price: Money) -> CoreResult<()> {
        validate_price(price)?;
        self.item_mut(item_id)?.unit_price_cents = price.cents();
        Ok(())
    }

    pub fn remove(&mut self, item_id: &str) -> CoreResult<DraftItem> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| CoreError::DraftItemNotFound(item_id.to_string()))?;
        Ok(self.items.remove(idx))
    }

    /// Sets the sale-level discount.
    ///
    /// Only the sign is checked here; whether the discount exceeds the
    /// subtotal is decided at [`SaleDraft::prepare`], so a discount may be
    /// typed before the items that cover it.
    pub fn set_discount(&mut self, amount: Money) -> ValidationResult<()> {
        validate_amount("discount", amount)?;
        self.discount = amount;
        Ok(())
    }

    pub fn set_tax(&mut self, amount: Money) -> ValidationResult<()> {
        validate_amount("tax", amount)?;
        self.tax = amount;
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    pub fn set_notes(&mut self, notes: Option<&str>) -> ValidationResult<()> {
        self.notes = validate_notes(notes)?;
        Ok(())
    }

    /// Empties the draft and issues a fresh idempotency key.
    pub fn clear(&mut self) {
        self.items.clear();
        self.discount = Money::zero();
        self.tax = Money::zero();
        self.payment_method = PaymentMethod::default();
        self.notes = None;
        self.idempotency_key = IdempotencyKey::new();
        self.created_at = Utc::now();
    }

    pub fn item(&self, item_id: &str) -> Option<&DraftItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_for_product(&self, product_id: &str) -> Option<&DraftItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn totals(&self) -> Totals {
        Totals::compute(&self.items, self.discount, self.tax)
    }

    /// Builds the creation command for this draft without consuming it.
    ///
    /// Fails with `EmptyDraft` or `NegativeTotal` before anything reaches the
    /// gateway. Calling it again after a failed submission yields a command
    /// with the same idempotency key.
    pub fn prepare(
        &self,
        attribution: Attributable,
        initial_status: SaleStatus,
    ) -> CoreResult<CreateSaleCommand> {
        if self.is_empty() {
            return Err(CoreError::EmptyDraft);
        }
        self.totals().validated()?;

        let command = CreateSaleCommand {
            idempotency_key: self.idempotency_key.clone(),
            venue_id: self.venue_id.clone(),
            attribution,
            items: self
                .items
                .iter()
                .map(|i| NewSaleLine {
                    product_id: i.product_id.clone(),
                    quantity: i.quantity,
                    unit_price_cents: i.unit_price_cents,
                })
                .collect(),
            payment_method: self.payment_method,
            discount_cents: self.discount.cents(),
            tax_cents: self.tax.cents(),
            notes: self.notes.clone(),
            initial_status,
        };
        command.validate()?;
        Ok(command)
    }

    fn item_mut(&mut self, item_id: &str) -> CoreResult<&mut DraftItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::DraftItemNotFound(item_id.to_string()))
    }
}

impl Default for SaleDraft {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::{MAX_AMOUNT_CENTS, MAX_UNIT_PRICE_CENTS};
    use proptest::prelude::*;

    fn product(id: &str, price_cents: i64, available: i64) -> Product {
        Product {
            id: id.to_string(),
            venue_id: DEFAULT_VENUE_ID.to_string(),
            name: format!("Product {}", id),
            category: Some("Spirits".to_string()),
            unit_price_cents: price_cents,
            available_quantity: available,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    fn bartender() -> Attributable {
        Attributable::Employee {
            id: "e-1".to_string(),
            name: "Ana".to_string(),
            category: "bartender".to_string(),
        }
    }

    #[test]
    fn test_add_same_product_increments_and_clamps() {
        let mut draft = SaleDraft::new();
        let gin = product("gin", 900, 2);

        assert_eq!(draft.add_item(&gin).unwrap(), 1);
        assert_eq!(draft.add_item(&gin).unwrap(), 2);
        assert_eq!(draft.add_item(&gin).unwrap(), 2);
        assert_eq!(draft.item_count(), 1);
    }

    #[test]
    fn test_add_refreshes_ceiling_from_newer_snapshot() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("gin", 900, 5)).unwrap();
        let id = draft.items[0].id.clone();
        draft.set_quantity(&id, 4).unwrap();

        // Someone else sold two bottles meanwhile
        assert_eq!(draft.add_item(&product("gin", 900, 3)).unwrap(), 3);
        assert_eq!(draft.items[0].available_quantity, 3);
    }

    #[test]
    fn test_add_out_of_stock_is_rejected() {
        let mut draft = SaleDraft::new();
        let err = draft.add_item(&product("gin", 900, 0)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 0, .. }));
        assert!(draft.is_empty());
    }

    #[test]
    fn test_add_inactive_is_rejected() {
        let mut draft = SaleDraft::new();
        let mut retired = product("old", 500, 10);
        retired.is_active = false;
        assert_eq!(
            draft.add_item(&retired),
            Err(CoreError::ProductInactive("old".to_string()))
        );
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 5)).unwrap();
        let id = draft.items[0].id.clone();

        assert_eq!(draft.set_quantity(&id, 0).unwrap(), None);
        assert!(draft.is_empty());
        assert!(matches!(
            draft.set_quantity(&id, 2),
            Err(CoreError::DraftItemNotFound(_))
        ));
    }

    #[test]
    fn test_scenario_single_line_total() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 10)).unwrap();
        let id = draft.items[0].id.clone();
        draft.set_quantity(&id, 2).unwrap();

        let totals = draft.totals();
        assert_eq!(totals.subtotal, Money::from_cents(2000));
        assert_eq!(totals.total, Money::from_cents(2000));

        let command = draft.prepare(bartender(), SaleStatus::Completed).unwrap();
        assert_eq!(command.items[0].quantity, 2);
        assert_eq!(command.idempotency_key, draft.idempotency_key);
    }

    #[test]
    fn test_scenario_discount_exceeding_subtotal() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 10)).unwrap();
        let id = draft.items[0].id.clone();
        draft.set_quantity(&id, 2).unwrap();
        draft.set_discount(Money::from_cents(2500)).unwrap();

        let err = draft.prepare(bartender(), SaleStatus::Completed).unwrap_err();
        assert_eq!(
            err,
            CoreError::Validation(ValidationError::NegativeTotal {
                total: Money::from_cents(-500)
            })
        );
        // Draft untouched
        assert_eq!(draft.item_count(), 1);
    }

    #[test]
    fn test_prepare_empty_draft() {
        let draft = SaleDraft::new();
        assert_eq!(
            draft.prepare(bartender(), SaleStatus::Completed),
            Err(CoreError::EmptyDraft)
        );
    }

    #[test]
    fn test_key_stable_until_clear() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 10)).unwrap();
        let key = draft.idempotency_key.clone();

        let first = draft.prepare(bartender(), SaleStatus::Pending).unwrap();
        let second = draft.prepare(bartender(), SaleStatus::Pending).unwrap();
        assert_eq!(first.idempotency_key, key);
        assert_eq!(second.idempotency_key, key);

        draft.clear();
        assert!(draft.is_empty());
        assert_ne!(draft.idempotency_key, key);
    }

    #[test]
    fn test_negative_amounts_rejected() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 10)).unwrap();
        let id = draft.items[0].id.clone();

        assert!(draft.set_discount(Money::from_cents(-1)).is_err());
        assert!(draft.set_tax(Money::from_cents(-1)).is_err());
        assert!(draft.set_unit_price(&id, Money::from_cents(-1)).is_err());

        draft.set_unit_price(&id, Money::zero()).unwrap();
        assert_eq!(draft.totals().total, Money::zero());
    }

    #[test]
    fn test_oversized_amounts_rejected_before_totals() {
        let mut draft = SaleDraft::new();
        draft.add_item(&product("p1", 1000, 10)).unwrap();
        let id = draft.items[0].id.clone();

        assert!(matches!(
            draft.set_unit_price(&id, Money::from_cents(i64::MAX)),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(draft.set_tax(Money::from_cents(i64::MAX)).is_err());
        assert!(draft.set_discount(Money::from_cents(i64::MAX)).is_err());
        assert!(draft.add_item(&product("p2", i64::MAX, 10)).is_err());

        draft.set_tax(Money::from_cents(1)).unwrap();
        assert_eq!(draft.totals().total, Money::from_cents(1001));
    }

    #[test]
    fn test_largest_draft_totals_fit() {
        let mut draft = SaleDraft::new();
        for n in 0..MAX_DRAFT_ITEMS {
            let id = format!("p{}", n);
            draft
                .add_item(&product(&id, MAX_UNIT_PRICE_CENTS, MAX_ITEM_QUANTITY))
                .unwrap();
        }
        assert_eq!(
            draft.add_item(&product("one-too-many", 100, 5)),
            Err(CoreError::DraftTooLarge {
                max: MAX_DRAFT_ITEMS
            })
        );
        assert_eq!(draft.item_count(), MAX_DRAFT_ITEMS);

        let ids: Vec<String> = draft.items.iter().map(|i| i.id.clone()).collect();
        for id in &ids {
            draft.set_quantity(id, MAX_ITEM_QUANTITY).unwrap();
        }
        draft.set_tax(Money::from_cents(MAX_AMOUNT_CENTS)).unwrap();
        draft.set_discount(Money::from_cents(MAX_AMOUNT_CENTS)).unwrap();

        let totals = draft.totals();
        assert_eq!(totals.subtotal, Money::from_cents(MAX_AMOUNT_CENTS));
        assert_eq!(totals.total, Money::from_cents(MAX_AMOUNT_CENTS));
    }

    proptest! {
        #[test]
        fn prop_set_quantity_stays_within_stock(available in 1i64..500, n in any::<i64>()) {
            let mut draft = SaleDraft::new();
            draft.add_item(&product("p1", 100, available)).unwrap();
            let id = draft.items[0].id.clone();

            match draft.set_quantity(&id, n).unwrap() {
                Some(qty) => {
                    prop_assert!(n > 0);
                    prop_assert!(qty >= 1 && qty <= available);
                    prop_assert_eq!(draft.items[0].quantity, qty);
                }
                None => {
                    prop_assert!(n <= 0);
                    prop_assert!(draft.is_empty());
                }
            }
        }

        #[test]
        fn prop_prepare_rejects_negative_totals(
            price in 0i64..10_000,
            qty in 1i64..20,
            discount in 0i64..200_000,
            tax in 0i64..10_000,
        ) {
            let mut draft = SaleDraft::new();
            draft.add_item(&product("p1", price, 50)).unwrap();
            let id = draft.items[0].id.clone();
            draft.set_quantity(&id, qty).unwrap();
            draft.set_discount(Money::from_cents(discount)).unwrap();
            draft.set_tax(Money::from_cents(tax)).unwrap();

            let total = price * qty - discount + tax;
            let result = draft.prepare(bartender(), SaleStatus::Completed);
            prop_assert_eq!(result.is_err(), total < 0);
        }
    }
}
