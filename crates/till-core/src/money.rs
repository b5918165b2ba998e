//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A ticket priced that way slowly drifts away from what the drawer      │
//! │  actually holds.                                                        │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every subtotal, tax, discount and payment is an i64 cent count.     │
//! │    Rounding happens exactly once per computed amount, half up.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price * 2;                // $21.98
//!
//! // NEVER construct Money from a float - no such constructor exists.
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds are negative payment amounts
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serde derives**: serialized as a bare integer on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion as an absolute value (0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    /// Clamps a negative amount up to zero.
    ///
    /// Used for the final ticket total: adjustments can never push a
    /// ticket below free.
    #[inline]
    pub const fn clamp_non_negative(self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            self
        }
    }

    /// Calculates tax on this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math on an i128 intermediate: `(cents * bps + 5000) / 10000`.
    /// The +5000 term is the half-up rounding bias (5000/10000 = 0.5).
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(2500); // $25.00
    /// let tax = subtotal.tax(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.cents(), 250); // $2.50
    /// ```
    pub fn tax(&self, rate: TaxRate) -> Money {
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Returns the given percentage share of this amount, rounding half up.
    ///
    /// ## Arguments
    /// * `bps` - Share in basis points (2000 = 20%)
    ///
    /// Used for percentage discounts: the result is the discount *amount*,
    /// not the discounted price.
    ///
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(2500);
    /// assert_eq!(subtotal.percent(2000).cents(), 500); // 20% of $25.00
    /// ```
    pub fn percent(&self, bps: u32) -> Money {
        let share = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money::from_cents(share as i64)
    }

    /// Multiplies a unit price by a line quantity.
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Human-readable format for logs and tests.
///
/// UI display formatting (localization, currency symbol) is the
/// frontend's job, not this type's.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Negation, for turning a charge into a refund amount.
impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-1750)), "-$17.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);
    }

    #[test]
    fn test_sum() {
        let total: Money = [1000, 500, 250]
            .into_iter()
            .map(Money::from_cents)
            .sum();
        assert_eq!(total.cents(), 1750);
    }

    #[test]
    fn test_tax_exact() {
        // $25.00 at 10% = $2.50, no rounding needed
        let tax = Money::from_cents(2500).tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 250);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // $10.00 at 8.25% = $0.825 → $0.83
        let tax = Money::from_cents(1000).tax(TaxRate::from_bps(825));
        assert_eq!(tax.cents(), 83);

        // $0.05 at 10% = $0.005 → $0.01
        let tax = Money::from_cents(5).tax(TaxRate::from_bps(1000));
        assert_eq!(tax.cents(), 1);
    }

    #[test]
    fn test_percent() {
        let subtotal = Money::from_cents(2500);
        assert_eq!(subtotal.percent(2000).cents(), 500); // 20%
        assert_eq!(subtotal.percent(10000).cents(), 2500); // 100%
        assert_eq!(subtotal.percent(0).cents(), 0);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-100).clamp_non_negative().cents(), 0);
        assert_eq!(Money::from_cents(100).clamp_non_negative().cents(), 100);
    }

    #[test]
    fn test_times() {
        let unit_price = Money::from_cents(299);
        assert_eq!(unit_price.times(3).cents(), 897);
    }
}
