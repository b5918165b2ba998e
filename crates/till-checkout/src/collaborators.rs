//! # Collaborator Contracts
//!
//! Trait seams for the systems around the order lifecycle engine.
//!
//! The engine consumes catalog, loyalty, and coupon data as read-only
//! inputs; the single mutation it ever asks for is the loyalty point
//! debit at payment time. Real implementations (database-backed,
//! remote, cached) live outside this crate; tests use in-memory
//! fakes.

use async_trait::async_trait;
use thiserror::Error;

// =============================================================================
// Error
// =============================================================================

/// Failure reported by a collaborator implementation.
///
/// Intentionally opaque: the engine retries or surfaces the message,
/// it never routes on collaborator internals.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct CollaboratorError(String);

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        CollaboratorError(message.into())
    }
}

/// Result type alias for collaborator calls.
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

// =============================================================================
// Product Catalog
// =============================================================================

/// Catalog data needed to ring up a product.
///
/// The name and price are frozen into the cart line at add time; a
/// later catalog change never retroactively reprices a rung-up line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub name: String,
    pub unit_price_cents: i64,
}

/// Read-only product lookup.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product by id. `Ok(None)` means the id is unknown;
    /// `Err` means the catalog itself failed.
    async fn product(&self, product_id: &str) -> CollaboratorResult<Option<CatalogProduct>>;
}

// =============================================================================
// Loyalty Ledger
// =============================================================================

/// Customer loyalty point balance store.
///
/// `debit_points` is called exactly once per committed order, at
/// payment confirmation. Browsing a redemption preview never mutates
/// the ledger.
#[async_trait]
pub trait LoyaltyLedger: Send + Sync {
    /// Points currently available to the customer.
    async fn available_points(&self, customer_id: &str) -> CollaboratorResult<i64>;

    /// Removes points from the customer's balance.
    async fn debit_points(&self, customer_id: &str, points: i64) -> CollaboratorResult<()>;
}

// =============================================================================
// Coupon Validator
// =============================================================================

/// Coupon code validation.
#[async_trait]
pub trait CouponValidator: Send + Sync {
    /// Validates a coupon code against the current subtotal and
    /// returns the discount it grants, in cents. `Ok(None)` means the
    /// code is not valid for this ticket.
    async fn validate(&self, code: &str, subtotal_cents: i64) -> CollaboratorResult<Option<i64>>;
}
