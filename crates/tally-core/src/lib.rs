//! # tally-core: Pure Sale-Transaction Logic for the Venue Console
//!
//! This crate is the **heart** of Tally. It contains the sale lifecycle rules
//! as pure functions and plain types with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Console surface (bar / back office)          │   │
//! │  │    Product grid ──► Draft ──► Submit ──► Sales list / Dashboard │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    tally-session                                │   │
//! │  │    SaleLifecycleManager, ChangeFeedSubscriber, Dashboard        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ gateway traits                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  cart   │ │ pricing │ │lifecycle│ │aggregate│  │   │
//! │  │   │  Sale   │ │SaleDraft│ │ Totals  │ │ states  │ │ reports │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                ▲                                        │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │                    tally-db (Transaction Gateway)               │   │
//! │  │              SQLite, migrations, stock, change feed             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleItem, Attributable, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`cart`] - The client-side sale draft
//! - [`pricing`] - Subtotal / total arithmetic
//! - [`lifecycle`] - Sale state machine
//! - [`command`] - Gateway commands carrying idempotency keys
//! - [`aggregation`] - Dashboard reductions over sales
//! - [`gateway`] - Contracts for stock, transactions and the change feed
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::cart::SaleDraft;
//! use tally_core::money::Money;
//!
//! let mut draft = SaleDraft::new();
//! draft.set_discount(Money::from_cents(500)).unwrap();
//!
//! // An empty draft with a discount prices below zero
//! assert_eq!(draft.totals().total.cents(), -500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregation;
pub mod cart;
pub mod command;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{DraftItem, SaleDraft};
pub use command::{CreateSaleCommand, IdempotencyKey, ItemPatch, SaleReceipt};
pub use error::{CoreError, CoreResult, ValidationError};
pub use gateway::{
    ChangeFeed, ChangeSubscription, GatewayError, GatewayResult, StockSnapshotProvider,
    TransactionGateway,
};
pub use money::Money;
pub use pricing::Totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default venue ID for single-venue installs.
///
/// The schema keys everything by `venue_id`, so a multi-venue back office can
/// share one store.
pub const DEFAULT_VENUE_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum distinct lines allowed in a single draft.
pub const MAX_DRAFT_ITEMS: usize = 100;

/// Maximum quantity of a single line.
///
/// Catches typing 1000 instead of 10 before the gateway sees it.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum unit price of one line, in cents ($1,000,000).
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;

/// Maximum sale-level discount or tax, in cents.
///
/// Equal to the largest possible subtotal, so `subtotal + tax - discount`
/// stays far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = MAX_UNIT_PRICE_CENTS * MAX_ITEM_QUANTITY * MAX_DRAFT_ITEMS as i64;

/// Maximum length of a cancel / refund reason.
pub const MAX_REASON_LENGTH: usize = 500;

/// Maximum length of free-text sale notes.
pub const MAX_NOTES_LENGTH: usize = 1000;
