//! # Validation Module
//!
//! Business rule validation for Till POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                           │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  └── Rejected BEFORE any cart or database state changes                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE constraints                                     │
//! │  └── Foreign keys, status guards in WHERE clauses                      │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product name carried onto a cart line.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// Zero is allowed (comped items); negative is not.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a payment amount in cents. Must be strictly positive;
/// refund rows get their negative sign from the refund processor, not
/// from the caller.
pub fn validate_payment_amount(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a refund amount against the order total.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed the order's total
pub fn validate_refund_amount(cents: i64, order_total_cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "refund amount".to_string(),
        });
    }

    if cents > order_total_cents {
        return Err(ValidationError::OutOfRange {
            field: "refund amount".to_string(),
            min: 1,
            max: order_total_cents,
        });
    }

    Ok(())
}

/// Validates a loyalty point count for redemption.
pub fn validate_points(points: i64) -> ValidationResult<()> {
    if points <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "points".to_string(),
        });
    }

    Ok(())
}

/// Validates a basis-point share (0% to 100%).
///
/// Used for both tax rates and percentage discounts.
pub fn validate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Double Burger").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(1099).is_ok());
        assert!(validate_price_cents(-100).is_err());
    }

    #[test]
    fn test_validate_refund_amount() {
        assert!(validate_refund_amount(1750, 1750).is_ok());
        assert!(validate_refund_amount(1, 1750).is_ok());

        assert!(validate_refund_amount(0, 1750).is_err());
        assert!(validate_refund_amount(-500, 1750).is_err());
        assert!(validate_refund_amount(1751, 1750).is_err());
    }

    #[test]
    fn test_validate_points() {
        assert!(validate_points(500).is_ok());
        assert!(validate_points(0).is_err());
        assert!(validate_points(-10).is_err());
    }

    #[test]
    fn test_validate_bps() {
        assert!(validate_bps("discount", 0).is_ok());
        assert!(validate_bps("discount", 2000).is_ok());
        assert!(validate_bps("discount", 10000).is_ok());
        assert!(validate_bps("discount", 10001).is_err());
    }
}
