//! # Persisted Record Types
//!
//! The order records written at commit time. These shapes are the de facto
//! wire format between the lifecycle engine and its reporting/receipt
//! consumers.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order Record Lifecycle                             │
//! │                                                                         │
//! │  begin_checkout ──► Order { status: Pending } + OrderItem rows         │
//! │        │                                                                │
//! │        ├── confirm_payment ──► + Payment { Completed }                 │
//! │        │                       Order { status: Completed }             │
//! │        │                                                                │
//! │        ├── abort_checkout ───► draft rows DELETED (no tombstone)       │
//! │        │                                                                │
//! │        └── refund ───────────► + Payment { amount: -x, Refunded }      │
//! │                                Order { status: Refunded }              │
//! │                                                                         │
//! │  OrderItem rows are immutable after creation.                          │
//! │  Payment rows are append-only: a refund is a NEW negative row,         │
//! │  never an edit of the original.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = the store's flat 10% sales tax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of a persisted order.
///
/// Transitions are enforced by the checkout coordinator and the refund
/// processor; the database layer guards them again in SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Draft created by begin_checkout, payment not yet confirmed.
    Pending,
    /// Payment confirmed, order is durable.
    Completed,
    /// Payment declined or abandoned. Draft rows are deleted outright,
    /// so this status only appears transiently in memory.
    Cancelled,
    /// A completed order whose payment was reversed.
    Refunded,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

// =============================================================================
// Payment Method & Status
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Digital wallet / QR payment.
    Digital,
}

/// Status of a payment ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// A confirmed charge.
    Completed,
    /// A reversal row; its amount is negative.
    Refunded,
}

// =============================================================================
// Order
// =============================================================================

/// A persisted order.
///
/// Created only by the checkout coordinator, in `Pending` status, before
/// payment confirmation. The only mutations ever applied are the status
/// transitions described on [`OrderStatus`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub loyalty_cents: i64,
    pub total_cents: i64,
    /// Operator who rang the ticket up.
    pub staff_id: String,
    /// Optional for walk-in customers.
    pub customer_id: Option<String>,
    pub table_number: Option<String>,
    /// Set when the first (and only) charge is confirmed.
    pub payment_method: Option<PaymentMethod>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Order Item
// =============================================================================

/// A line item on a persisted order.
///
/// Uses the snapshot pattern: name and unit price are frozen at commit
/// time, so later catalog edits never rewrite sales history. Refunds do
/// not touch item rows either.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at commit time (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at commit time (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A row in the append-only payment ledger.
///
/// A refund is a new row with a negative amount and `Refunded` status,
/// never an edit of the original charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Amount in cents; negative for refunds.
    pub amount_cents: i64,
    /// Free-text note, e.g. the refund reason.
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
