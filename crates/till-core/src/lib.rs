//! # till-core: Pure Business Logic for Till POS
//!
//! This crate is the **heart** of the order lifecycle engine. It contains
//! the cart, the pricing rules and the held-ticket store as pure logic with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Till POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    UI / Register Frontend                       │   │
//! │  │    Product grid ──► Ticket panel ──► Tender ──► Receipt        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              till-checkout (Lifecycle Engine)                   │   │
//! │  │    TillSession, CheckoutCoordinator, RefundProcessor           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ till-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   cart    │  │  pricing  │  │   hold    │  │   money   │  │   │
//! │  │   │   Cart    │  │  Totals   │  │ HoldStore │  │   Money   │  │   │
//! │  │   │ CartLine  │  │  compute  │  │ HeldOrder │  │  TaxRate  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`cart`] - The live ticket: lines, discount, loyalty redemption
//! - [`pricing`] - Pure totals computation (subtotal/tax/discount/loyalty)
//! - [`hold`] - Suspended ticket snapshots with resume/discard
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`types`] - Persisted record types (Order, OrderItem, Payment)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod hold;
pub mod money;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use cart::{Cart, CartLine, DiscountKind, DiscountSpec, LoyaltyRedemption};
pub use error::{CoreError, ValidationError};
pub use hold::{HeldOrder, HoldHandle, HoldStore};
pub use money::Money;
pub use pricing::Totals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed on a single ticket.
///
/// Prevents runaway carts and keeps transactions a sane size.
/// Can be made configurable per store in future versions.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default sales tax rate in basis points (10%).
///
/// The original store configuration taxed every ticket at a flat 10%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1000;

/// Default loyalty exchange rate: points needed per $1 of discount.
///
/// A loyalty program configured with a rate of zero or less falls back
/// to this value rather than granting unbounded discounts.
pub const DEFAULT_POINTS_PER_DOLLAR: i64 = 100;
