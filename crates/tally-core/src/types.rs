//! # Domain Types
//!
//! Core domain types used throughout Tally.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  venue_id       │   │  sale_number    │   │  sale_id (FK)   │       │
//! │  │  unit_price     │   │  status         │   │  name snapshot  │       │
//! │  │  available_qty  │   │  total_cents    │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Attributable   │   │   SaleStatus    │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Employee       │   │  Pending        │   │  Cash           │       │
//! │  │  Admin          │   │  Completed      │   │  Transfer       │       │
//! │  └─────────────────┘   │  Cancelled      │   │  Credit / Debit │       │
//! │                        │  Refunded       │   │  Mixed          │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every sale has:
//! - `id`: UUID v4 - immutable, used for relations and the change feed
//! - `sale_number`: per-venue sequence - what staff read out loud

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A stock snapshot of one product.
///
/// Read-only from the core's point of view. The snapshot may be stale; the
/// Transaction Gateway re-checks `available_quantity` at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Venue this product belongs to.
    pub venue_id: String,

    /// Display name shown on the product grid and frozen onto sale items.
    pub name: String,

    /// Optional grouping ("Beer", "Spirits", ...).
    pub category: Option<String>,

    /// Current price in cents.
    pub unit_price_cents: i64,

    /// Units on hand. Never negative.
    pub available_quantity: i64,

    /// Retired products stay in the table for history but cannot be sold.
    pub is_active: bool,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Whether this snapshot claims `quantity` units can be sold.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.available_quantity >= quantity
    }
}

/// Query for the Stock Snapshot Provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductFilter {
    pub venue_id: String,
    /// Case-insensitive name fragment.
    pub query: Option<String>,
    /// Only products with `available_quantity > 0`.
    pub in_stock_only: bool,
    /// Include retired products.
    pub include_inactive: bool,
    pub limit: Option<i64>,
}

impl ProductFilter {
    pub fn for_venue(venue_id: impl Into<String>) -> Self {
        ProductFilter {
            venue_id: venue_id.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Sale Status
// =============================================================================

/// The status of a persisted sale.
///
/// ```text
///   submit ──► Pending ──confirm──► Completed
///                 │                     │
///                 ├──cancel──► Cancelled ◄──cancel──┤
///                 └──refund──► Refunded  ◄──refund──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Created, awaiting confirmation.
    Pending,
    /// Paid and finalized. Still editable.
    Completed,
    /// Voided before or after payment. Terminal.
    Cancelled,
    /// Money returned to the customer. Terminal.
    Refunded,
}

impl SaleStatus {
    pub const ALL: [SaleStatus; 4] = [
        SaleStatus::Pending,
        SaleStatus::Completed,
        SaleStatus::Cancelled,
        SaleStatus::Refunded,
    ];

    /// Cancelled and refunded sales are immutable.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, SaleStatus::Cancelled | SaleStatus::Refunded)
    }

    /// Items may be added, changed or removed.
    #[inline]
    pub const fn is_editable(&self) -> bool {
        !self.is_terminal()
    }

    /// Storage / wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "pending",
            SaleStatus::Completed => "completed",
            SaleStatus::Cancelled => "cancelled",
            SaleStatus::Refunded => "refunded",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaleStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(SaleStatus::Pending),
            "completed" => Ok(SaleStatus::Completed),
            "cancelled" => Ok(SaleStatus::Cancelled),
            "refunded" => Ok(SaleStatus::Refunded),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("unknown sale status '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    /// Bank transfer / QR payment.
    Transfer,
    Credit,
    Debit,
    /// Split across several methods.
    Mixed,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Credit,
        PaymentMethod::Debit,
        PaymentMethod::Mixed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "credit" => Ok(PaymentMethod::Credit),
            "debit" => Ok(PaymentMethod::Debit),
            "mixed" => Ok(PaymentMethod::Mixed),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Attribution
// =============================================================================

/// Who rang up a sale.
///
/// Resolved once when the sale is created into the immutable
/// `employee_id` / `employee_name` pair on [`Sale`]; nothing downstream
/// re-derives whether the seller was staff or an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attributable {
    Employee {
        id: String,
        name: String,
        /// Staff category ("bartender", "waiter", ...).
        category: String,
    },
    Admin {
        id: String,
        name: String,
    },
}

impl Attributable {
    pub fn id(&self) -> &str {
        match self {
            Attributable::Employee { id, .. } | Attributable::Admin { id, .. } => id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Attributable::Employee { name, .. } | Attributable::Admin { name, .. } => name,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Attributable::Admin { .. })
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A persisted sale with its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub venue_id: String,
    /// Per-venue sequence assigned by the gateway.
    pub sale_number: i64,
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub employee_id: String,
    pub employee_name: String,
    pub notes: Option<String>,
    /// Set when the sale enters cancelled / refunded.
    pub refund_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    #[inline]
    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn item(&self, item_id: &str) -> Option<&SaleItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Units of `product_id` across all lines of this sale.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .filter(|i| i.product_id == product_id)
            .map(|i| i.quantity)
            .sum()
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Read-model query for sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleFilter {
    pub venue_id: String,
    pub status: Option<SaleStatus>,
    pub employee_id: Option<String>,
    /// Inclusive lower bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl SaleFilter {
    pub fn for_venue(venue_id: impl Into<String>) -> Self {
        SaleFilter {
            venue_id: venue_id.into(),
            ..Default::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }
}

// =============================================================================
// Change Feed Events
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    Create,
    Update,
    Delete,
}

/// One event on the venue's sale change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleChange {
    pub venue_id: String,
    pub operation: ChangeOperation,
    pub sale_id: String,
}

impl SaleChange {
    pub fn new(
        venue_id: impl Into<String>,
        operation: ChangeOperation,
        sale_id: impl Into<String>,
    ) -> Self {
        SaleChange {
            venue_id: venue_id.into(),
            operation,
            sale_id: sale_id.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
