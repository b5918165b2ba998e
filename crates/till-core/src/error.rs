//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Cart / hold-store rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-checkout errors (separate crate)                                 │
//! │  └── CheckoutError    - Lifecycle state machine failures               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → CheckoutError → caller/UI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (handle, quantity, limit)
//! 3. Errors are enum variants, never String
//! 4. Every error is rejected before any state is mutated

use thiserror::Error;

use crate::hold::HoldHandle;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and hold-store rule violations.
///
/// All of these are rejected with no side effects: the cart the caller
/// holds is exactly as it was before the failing call.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The operation needs at least one line on the ticket.
    ///
    /// ## When This Occurs
    /// - Applying a discount or loyalty redemption to an empty cart
    /// - Holding an empty cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded the maximum number of distinct lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A line quantity would exceed the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A held ticket handle no longer exists.
    ///
    /// ## When This Occurs
    /// - The handle was already resumed (resume removes atomically)
    /// - The handle was discarded
    #[error("Held order {handle} not found")]
    HoldNotFound { handle: HoldHandle },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements. Used for
/// early rejection before any business logic runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuantityTooLarge {
            requested: 1200,
            max: 999,
        };
        assert_eq!(
            err.to_string(),
            "Quantity 1200 exceeds maximum allowed (999)"
        );
        assert_eq!(CoreError::EmptyCart.to_string(), "Cart is empty");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
