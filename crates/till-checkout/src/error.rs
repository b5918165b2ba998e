//! # Checkout Error Types
//!
//! Error taxonomy for the order lifecycle engine.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       CheckoutError Taxonomy                            │
//! │                                                                         │
//! │  VALIDATION   bad quantity, empty cart, out-of-range discount.         │
//! │               Rejected before any write; operator corrects and retries.│
//! │                                                                         │
//! │  STATE        checkout already in flight, stale token, resume onto a   │
//! │               non-empty cart, refund of a non-completed order.         │
//! │               Rejected with no side effects.                           │
//! │                                                                         │
//! │  PERSISTENCE  store write failure mid-commit. The draft is rolled      │
//! │               back and the live cart preserved; caller retries.        │
//! │                                                                         │
//! │  INTEGRITY    payment amount does not match the order total. Fatal to  │
//! │               the one attempt, never to prior completed orders.        │
//! │                                                                         │
//! │  COLLABORATOR catalog / loyalty ledger / coupon service failure.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is local to one ticket or one transaction; none
//! require restarting the till session.

use thiserror::Error;
use till_core::{CoreError, OrderStatus};
use till_db::DbError;

use crate::collaborators::CollaboratorError;

/// Broad error category, for callers that route on kind rather than
/// on individual variants (UI toast vs. retry prompt vs. alert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    Persistence,
    Integrity,
    Collaborator,
}

/// Errors from the checkout coordinator, refund processor, and session.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Input rejected by the domain layer before any write.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// Checkout requires at least one line on the ticket.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// Discounts reduced the ticket to nothing; there is no payment
    /// to take.
    #[error("Cannot check out a zero-total cart")]
    ZeroTotal,

    /// A previous checkout attempt is still awaiting payment.
    #[error("Checkout already in progress for order {order_id}")]
    CheckoutInProgress { order_id: String },

    /// The token does not match the attempt currently in flight
    /// (already committed, already aborted, or never begun).
    #[error("Checkout token for order {order_id} is no longer valid")]
    StaleToken { order_id: String },

    /// Resuming a held ticket requires an empty live cart.
    #[error("Live cart is not empty")]
    CartNotEmpty,

    /// Catalog has no such product.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// No order with this id exists.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// Only completed orders can be refunded.
    #[error("Order {order_id} is not refundable (status: {status:?})")]
    NotRefundable {
        order_id: String,
        status: OrderStatus,
    },

    /// Refund amount out of range.
    #[error("Invalid refund amount {amount_cents} (must be in 1..={max_cents})")]
    InvalidAmount { amount_cents: i64, max_cents: i64 },

    /// The coupon validator declined the code for this ticket.
    #[error("Coupon code not valid for this ticket: {code}")]
    CouponRejected { code: String },

    /// Tendered amount does not equal the order total. The attempt is
    /// aborted and its draft deleted.
    #[error("Payment amount {actual_cents} does not match order total {expected_cents}")]
    PaymentMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// Store write failure. The transaction rolled back; no partial
    /// rows exist and the live cart is untouched.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] DbError),

    /// An external collaborator (catalog, ledger, coupons) failed.
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl CheckoutError {
    /// The broad category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckoutError::Validation(_)
            | CheckoutError::EmptyCart
            | CheckoutError::ZeroTotal
            | CheckoutError::InvalidAmount { .. }
            | CheckoutError::CouponRejected { .. } => ErrorKind::Validation,
            CheckoutError::CheckoutInProgress { .. }
            | CheckoutError::StaleToken { .. }
            | CheckoutError::CartNotEmpty
            | CheckoutError::ProductNotFound { .. }
            | CheckoutError::OrderNotFound { .. }
            | CheckoutError::NotRefundable { .. } => ErrorKind::State,
            CheckoutError::Persistence(_) => ErrorKind::Persistence,
            CheckoutError::PaymentMismatch { .. } => ErrorKind::Integrity,
            CheckoutError::Collaborator(_) => ErrorKind::Collaborator,
        }
    }

    /// True when the caller can safely retry the same operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Persistence | ErrorKind::Collaborator
        )
    }
}

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(CheckoutError::EmptyCart.kind(), ErrorKind::Validation);
        assert_eq!(
            CheckoutError::CartNotEmpty.kind(),
            ErrorKind::State
        );
        assert_eq!(
            CheckoutError::PaymentMismatch {
                expected_cents: 1750,
                actual_cents: 1000
            }
            .kind(),
            ErrorKind::Integrity
        );
    }

    #[test]
    fn test_retryable() {
        assert!(CheckoutError::Persistence(DbError::PoolExhausted).is_retryable());
        assert!(!CheckoutError::EmptyCart.is_retryable());
        assert!(!CheckoutError::StaleToken {
            order_id: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_core_error_maps_to_validation() {
        let err: CheckoutError = CoreError::EmptyCart.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
