//! # Sale Lifecycle Manager
//!
//! Orchestrates sale creation and every later mutation against a
//! [`TransactionGateway`].
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  manager.cancel(&sale, "wrong tab")                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Local checks on the caller's copy                                  │
//! │     terminal? reason blank? projected total < 0?  ──► Validation /     │
//! │       │                                               Rejected         │
//! │       ▼                                                                 │
//! │  2. In-flight guard for sale.id  ── already held ──► Busy              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. Exactly one gateway call (never retried)  ── fails ──► Rejected /  │
//! │       │                                                   Transport    │
//! │       ▼                                                                 │
//! │  4. Refetch authoritative sale, return it                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  guard dropped (also on every early return)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The caller's copy of the sale is never modified; on success it should be
//! replaced with the returned sale. A draft is cleared only after its sale
//! has been created and read back, so a failed submission keeps the draft
//! and its idempotency key, and resubmitting it cannot double-charge.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tally_core::command::ItemPatch;
use tally_core::lifecycle::{self, SaleEvent};
use tally_core::pricing;
use tally_core::validation::{validate_id, validate_price, validate_quantity, validate_reason};
use tally_core::{
    Attributable, CoreError, Money, Sale, SaleDraft, SaleStatus, TransactionGateway,
    ValidationError,
};
use tracing::{debug, info, warn};

use crate::error::{SaleOperation, SessionError, SessionResult};

// =============================================================================
// In-flight Guard
// =============================================================================

type InFlight = Arc<Mutex<HashSet<String>>>;

/// Marks one sale (or draft) as having a mutation in flight until dropped.
struct InFlightGuard {
    in_flight: InFlight,
    key: String,
}

impl InFlightGuard {
    fn acquire(in_flight: &InFlight, key: &str) -> SessionResult<Self> {
        let mut set = in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !set.insert(key.to_string()) {
            warn!(sale_id = %key, "Rejecting concurrent mutation");
            return Err(SessionError::Busy {
                sale_id: key.to_string(),
            });
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(in_flight),
            key: key.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.key);
    }
}

// =============================================================================
// Manager
// =============================================================================

/// Sale Lifecycle Manager for one console session.
pub struct SaleLifecycleManager<G> {
    gateway: Arc<G>,
    in_flight: InFlight,
}

impl<G> Clone for SaleLifecycleManager<G> {
    fn clone(&self) -> Self {
        SaleLifecycleManager {
            gateway: Arc::clone(&self.gateway),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<G: TransactionGateway> SaleLifecycleManager<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        SaleLifecycleManager {
            gateway,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    /// Whether a mutation of `sale_id` is currently in flight.
    pub fn is_busy(&self, sale_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(sale_id)
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Submits a draft as a new sale.
    ///
    /// On success the draft is cleared (which rotates its idempotency key)
    /// and the stored sale is returned. On any failure the draft is left
    /// exactly as it was.
    pub async fn submit(
        &self,
        draft: &mut SaleDraft,
        attribution: Attributable,
        initial_status: SaleStatus,
    ) -> SessionResult<Sale> {
        let op = SaleOperation::Submit;
        let command = draft
            .prepare(attribution, initial_status)
            .map_err(|e| SessionError::core(op, e))?;

        let _guard = InFlightGuard::acquire(&self.in_flight, command.idempotency_key.as_str())?;

        debug!(
            idempotency_key = %command.idempotency_key,
            lines = command.items.len(),
            status = %initial_status,
            "Submitting draft"
        );

        let receipt = self
            .gateway
            .create_sale(&command)
            .await
            .map_err(|e| SessionError::gateway(op, e))?;

        let sale = self.refetch(&receipt.sale_id).await?;
        draft.clear();

        info!(
            sale_id = %sale.id,
            sale_number = sale.sale_number,
            total = %sale.total(),
            deduplicated = receipt.deduplicated,
            "Draft submitted"
        );
        Ok(sale)
    }

    // -------------------------------------------------------------------------
    // Item Edits
    // -------------------------------------------------------------------------

    /// Adds a line to an existing sale. `unit_price` defaults to the
    /// product's current price.
    pub async fn add_item(
        &self,
        sale: &Sale,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> SessionResult<Sale> {
        let op = SaleOperation::AddItem;
        lifecycle::ensure_editable(&sale.id, sale.status).map_err(|e| SessionError::core(op, e))?;
        validate_id("product_id", product_id).map_err(|e| SessionError::validation(op, e))?;
        validate_quantity(quantity).map_err(|e| SessionError::validation(op, e))?;
        if let Some(price) = unit_price {
            validate_price(price).map_err(|e| SessionError::validation(op, e))?;
        }

        let _guard = InFlightGuard::acquire(&self.in_flight, &sale.id)?;

        let item_id = self
            .gateway
            .add_item(&sale.id, product_id, quantity, unit_price)
            .await
            .map_err(|e| SessionError::gateway(op, e))?;

        info!(sale_id = %sale.id, item_id = %item_id, quantity, "Item added to sale");
        self.refetch(&sale.id).await
    }

    /// Changes quantity and/or unit price of a persisted line.
    pub async fn update_item(
        &self,
        sale: &Sale,
        item_id: &str,
        patch: ItemPatch,
    ) -> SessionResult<Sale> {
        let op = SaleOperation::UpdateItem;
        lifecycle::ensure_editable(&sale.id, sale.status).map_err(|e| SessionError::core(op, e))?;
        if patch.is_empty() {
            return Err(SessionError::validation(
                op,
                ValidationError::required("quantity or unit_price"),
            ));
        }
        patch.validate().map_err(|e| SessionError::validation(op, e))?;

        let item = sale
            .item(item_id)
            .ok_or_else(|| SessionError::core(op, CoreError::SaleItemNotFound(item_id.into())))?;
        let new_line = pricing::line_total(
            patch.quantity.unwrap_or(item.quantity),
            patch.unit_price.unwrap_or_else(|| item.unit_price()),
        );
        ensure_projected_total(op, sale, sale.subtotal() - item.line_total() + new_line)?;

        let _guard = InFlightGuard::acquire(&self.in_flight, &sale.id)?;

        self.gateway
            .update_item(item_id, patch.quantity, patch.unit_price)
            .await
            .map_err(|e| SessionError::gateway(op, e))?;

        info!(sale_id = %sale.id, item_id = %item_id, ?patch, "Sale item updated");
        self.refetch(&sale.id).await
    }

    pub async fn remove_item(&self, sale: &Sale, item_id: &str) -> SessionResult<Sale> {
        let op = SaleOperation::RemoveItem;
        lifecycle::ensure_editable(&sale.id, sale.status).map_err(|e| SessionError::core(op, e))?;

        let item = sale
            .item(item_id)
            .ok_or_else(|| SessionError::core(op, CoreError::SaleItemNotFound(item_id.into())))?;
        ensure_projected_total(op, sale, sale.subtotal() - item.line_total())?;

        let _guard = InFlightGuard::acquire(&self.in_flight, &sale.id)?;

        self.gateway
            .remove_item(item_id)
            .await
            .map_err(|e| SessionError::gateway(op, e))?;

        info!(sale_id = %sale.id, item_id = %item_id, "Sale item removed");
        self.refetch(&sale.id).await
    }

    // -------------------------------------------------------------------------
    // Status Transitions
    // -------------------------------------------------------------------------

    /// Cancels a sale, returning every remaining unit to stock.
    pub async fn cancel(&self, sale: &Sale, reason: &str) -> SessionResult<Sale> {
        self.apply_event(SaleOperation::Cancel, sale, SaleEvent::Cancel, Some(reason))
            .await
    }

    /// Refunds a sale, returning every remaining unit to stock.
    pub async fn refund(&self, sale: &Sale, reason: &str) -> SessionResult<Sale> {
        self.apply_event(SaleOperation::Refund, sale, SaleEvent::Refund, Some(reason))
            .await
    }

    /// Confirms a pending sale.
    pub async fn confirm(&self, sale: &Sale) -> SessionResult<Sale> {
        self.apply_event(SaleOperation::Confirm, sale, SaleEvent::Confirm, None)
            .await
    }

    async fn apply_event(
        &self,
        op: SaleOperation,
        sale: &Sale,
        event: SaleEvent,
        reason: Option<&str>,
    ) -> SessionResult<Sale> {
        let to = event.target();
        lifecycle::transition(&sale.id, sale.status, to).map_err(|e| SessionError::core(op, e))?;

        let reason = if event.requires_reason() {
            Some(
                validate_reason(reason.unwrap_or(""))
                    .map_err(|e| SessionError::validation(op, e))?,
            )
        } else {
            None
        };

        let _guard = InFlightGuard::acquire(&self.in_flight, &sale.id)?;

        self.gateway
            .transition_status(&sale.id, to, reason.as_deref())
            .await
            .map_err(|e| SessionError::gateway(op, e))?;

        info!(sale_id = %sale.id, from = %sale.status, to = %to, "Sale status changed");
        self.refetch(&sale.id).await
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Reads the authoritative copy of a sale.
    pub async fn fetch(&self, sale_id: &str) -> SessionResult<Sale> {
        self.refetch(sale_id).await
    }

    async fn refetch(&self, sale_id: &str) -> SessionResult<Sale> {
        self.gateway
            .get_sale(sale_id)
            .await
            .map_err(|e| SessionError::gateway(SaleOperation::Fetch, e))
    }
}

/// Rejects an edit whose resulting total would be negative.
fn ensure_projected_total(op: SaleOperation, sale: &Sale, subtotal: Money) -> SessionResult<()> {
    pricing::ensure_non_negative_total(pricing::total(subtotal, sale.discount(), sale.tax()))
        .map(|_| ())
        .map_err(|e| SessionError::validation(op, e))
}

// =============================================================================
// Unit Tests
// =============================================================================
