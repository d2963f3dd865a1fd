//! # Collaborator Contracts
//!
//! The three seams between the pure core and whatever holds the data.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   tally-session                          tally-db                       │
//! │   ─────────────                          ────────                       │
//! │   Draft builder ──► StockSnapshotProvider ◄── SqliteGateway             │
//! │   Lifecycle mgr ──► TransactionGateway    ◄── SqliteGateway             │
//! │   Subscriber    ──► ChangeFeed            ◄── SaleChangeFeed            │
//! │                                                                         │
//! │   Every TransactionGateway operation is all-or-nothing. The session     │
//! │   layer never compensates for a partial failure.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::command::{CreateSaleCommand, SaleReceipt};
use crate::error::{CoreError, ValidationError};
use crate::money::Money;
use crate::types::{Product, ProductFilter, Sale, SaleChange, SaleFilter, SaleStatus};

// =============================================================================
// Gateway Error
// =============================================================================

/// What a collaborator call can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The store understood the request and refused it.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The store could not be reached or failed internally.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Transport / storage failure rather than a business rejection.
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }

    pub fn as_domain(&self) -> Option<&CoreError> {
        match self {
            GatewayError::Domain(err) => Some(err),
            GatewayError::Unavailable(_) => None,
        }
    }
}

impl From<ValidationError> for GatewayError {
    fn from(err: ValidationError) -> Self {
        GatewayError::Domain(CoreError::Validation(err))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

// =============================================================================
// Stock Snapshot Provider
// =============================================================================

/// Read-only, possibly stale view of products and their stock.
#[async_trait]
pub trait StockSnapshotProvider: Send + Sync {
    async fn list(&self, filter: &ProductFilter) -> GatewayResult<Vec<Product>>;

    /// `ProductNotFound` if the id is unknown.
    async fn get(&self, product_id: &str) -> GatewayResult<Product>;

    async fn get_available(&self, product_id: &str) -> GatewayResult<i64> {
        Ok(self.get(product_id).await?.available_quantity)
    }
}

// =============================================================================
// Transaction Gateway
// =============================================================================

/// The only component allowed to persist sales and move stock.
#[async_trait]
pub trait TransactionGateway: Send + Sync {
    /// Creates the sale, its items and decrements stock for every line.
    ///
    /// A command whose idempotency key was already used returns the original
    /// receipt with `deduplicated = true` and changes nothing.
    async fn create_sale(&self, command: &CreateSaleCommand) -> GatewayResult<SaleReceipt>;

    /// Inserts a line and decrements stock by `quantity`. Without
    /// `unit_price` the product's current price is used.
    async fn add_item(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Option<Money>,
    ) -> GatewayResult<String>;

    /// Changes a line and moves stock by the quantity delta (new − old).
    async fn update_item(
        &self,
        item_id: &str,
        quantity: Option<i64>,
        unit_price: Option<Money>,
    ) -> GatewayResult<()>;

    /// Deletes a line and restores its quantity.
    async fn remove_item(&self, item_id: &str) -> GatewayResult<()>;

    /// Moves the sale along the state machine. Entering cancelled or
    /// refunded restores stock for every remaining line.
    async fn transition_status(
        &self,
        sale_id: &str,
        new_status: SaleStatus,
        reason: Option<&str>,
    ) -> GatewayResult<()>;

    /// `SaleNotFound` if the id is unknown.
    async fn get_sale(&self, sale_id: &str) -> GatewayResult<Sale>;

    /// Newest first.
    async fn list_sales(&self, filter: &SaleFilter) -> GatewayResult<Vec<Sale>>;
}

// =============================================================================
// Change Feed
// =============================================================================

/// Source of venue-scoped sale change events.
pub trait ChangeFeed: Send + Sync {
    /// Dropping the returned subscription unsubscribes.
    fn subscribe(&self, venue_id: &str) -> Box<dyn ChangeSubscription>;
}

#[async_trait]
pub trait ChangeSubscription: Send {
    /// Next event for the subscribed venue, `None` once the feed is closed.
    async fn next(&mut self) -> Option<SaleChange>;
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let transport = GatewayError::Unavailable("database is locked".to_string());
        assert!(transport.is_transport());
        assert!(transport.as_domain().is_none());

        let domain: GatewayError = CoreError::SaleNotFound("s-1".to_string()).into();
        assert!(!domain.is_transport());
        assert_eq!(domain.to_string(), "Sale not found: s-1");
    }

    #[test]
    fn test_validation_lifts_into_domain() {
        let err: GatewayError = ValidationError::required("refund_reason").into();
        assert!(matches!(
            err,
            GatewayError::Domain(CoreError::Validation(_))
        ));
    }
}
