//! # Pricing Engine
//!
//! Pure totals computation for a ticket. No I/O, no state: the same cart
//! snapshot always produces the same totals.
//!
//! ## Adjustment Stacking Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      How a Total Is Built                               │
//! │                                                                         │
//! │  subtotal  = Σ (unit_price × quantity)                                 │
//! │  tax       = subtotal × rate          (half-up, on the FULL subtotal) │
//! │  discount  = resolved spec, clamped to [0, subtotal]                   │
//! │  loyalty   = point value, clamped to subtotal + tax - discount         │
//! │                                                                         │
//! │  total     = max(0, subtotal + tax - discount - loyalty)               │
//! │                                                                         │
//! │  Example: Burger $10.00 × 2 + Fries $5.00                              │
//! │    subtotal $25.00, tax $2.50                                          │
//! │    20% discount → $5.00                                                │
//! │    500 pts @ 100/$ → $5.00                                             │
//! │    total = 25.00 + 2.50 - 5.00 - 5.00 = $17.50                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tax applies to the undiscounted subtotal. The original registers
//! computed tax and discounts in independent dialogs without a single
//! enforced sequence; this engine fixes one order and sticks to it.

use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, DiscountKind, DiscountSpec, LoyaltyRedemption};
use crate::money::Money;
use crate::types::TaxRate;

// =============================================================================
// Totals
// =============================================================================

/// The computed totals for a cart snapshot.
///
/// Recomputed on every cart mutation, so a displayed total is never stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub loyalty: Money,
    pub total: Money,
}

impl Totals {
    /// All-zero totals, the result for an empty cart.
    pub fn zero() -> Self {
        Totals::default()
    }
}

// =============================================================================
// Pricing Functions
// =============================================================================

/// Resolves a discount spec against a subtotal.
///
/// Percentage specs are computed on the subtotal; fixed specs are taken
/// at face value. Either way the result is clamped to `[0, subtotal]`;
/// a discount can never exceed what is being discounted.
pub fn resolve_discount(spec: &DiscountSpec, subtotal: Money) -> Money {
    let raw = match spec.kind() {
        // Constructors keep percentage specs within 0..=10000 bps,
        // so the cast cannot wrap.
        DiscountKind::Percentage => subtotal.percent(spec.raw_value() as u32),
        DiscountKind::Fixed => Money::from_cents(spec.raw_value()),
    };
    raw.clamp_non_negative().min(subtotal)
}

/// Clamps a loyalty redemption to the amount the ticket can still absorb.
///
/// `cap` is `subtotal + tax - discount`. When the requested amount exceeds
/// the cap, the granted amount drops to the cap and the points actually
/// redeemed are scaled down proportionally (floor), so the customer is
/// never charged more points than the discount they received.
///
/// Returns `(points_redeemed, amount_granted)`.
pub fn clamp_loyalty(redemption: &LoyaltyRedemption, cap: Money) -> (i64, Money) {
    let requested = Money::from_cents(redemption.amount_cents);
    let cap = cap.clamp_non_negative();

    if requested <= cap {
        return (redemption.points, requested);
    }

    if requested.is_zero() || redemption.points == 0 {
        return (0, Money::zero());
    }

    // Scale points by granted/requested, rounding down.
    let points = (redemption.points as i128 * cap.cents() as i128
        / requested.cents() as i128) as i64;
    (points, cap)
}

/// Computes the full totals for a cart snapshot.
///
/// This is the single authority for ticket math; the cart calls it after
/// every mutation and callers read the cached result.
pub fn compute_totals<'a, I>(
    lines: I,
    discount: Option<&DiscountSpec>,
    loyalty: Option<&LoyaltyRedemption>,
    tax_rate: TaxRate,
) -> Totals
where
    I: IntoIterator<Item = &'a CartLine>,
{
    let subtotal: Money = lines.into_iter().map(|line| line.total()).sum();

    // Empty cart short-circuits to all zeros. Discount/loyalty cannot be
    // set on an empty cart, so nothing is silently dropped here.
    if subtotal.is_zero() {
        return Totals::zero();
    }

    let tax = subtotal.tax(tax_rate);

    let discount_amount = discount
        .map(|spec| resolve_discount(spec, subtotal))
        .unwrap_or_else(Money::zero);

    let loyalty_amount = loyalty
        .map(|r| clamp_loyalty(r, subtotal + tax - discount_amount).1)
        .unwrap_or_else(Money::zero);

    let total = (subtotal + tax - discount_amount - loyalty_amount).clamp_non_negative();

    Totals {
        subtotal,
        tax,
        discount: discount_amount,
        loyalty: loyalty_amount,
        total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LoyaltyRedemption;

    fn line(product_id: &str, price_cents: i64, qty: i64) -> CartLine {
        CartLine::new(product_id, &format!("Item {product_id}"), Money::from_cents(price_cents), qty)
    }

    /// Scenario A: Burger $10.00 × 2 + Fries $5.00, 10% tax.
    #[test]
    fn test_two_line_ticket() {
        let lines = [line("burger", 1000, 2), line("fries", 500, 1)];
        let totals = compute_totals(&lines, None, None, TaxRate::from_bps(1000));

        assert_eq!(totals.subtotal.cents(), 2500);
        assert_eq!(totals.tax.cents(), 250);
        assert_eq!(totals.total.cents(), 2750);
    }

    /// Scenario B: 20% discount on the $25.00 ticket.
    #[test]
    fn test_percentage_discount() {
        let lines = [line("burger", 1000, 2), line("fries", 500, 1)];
        let discount = DiscountSpec::percentage(2000).unwrap();
        let totals = compute_totals(&lines, Some(&discount), None, TaxRate::from_bps(1000));

        assert_eq!(totals.discount.cents(), 500);
        assert_eq!(totals.total.cents(), 2250);
    }

    /// Scenario C: 500 points at 100 pts/$1 on top of scenario B.
    #[test]
    fn test_loyalty_on_discounted_ticket() {
        let lines = [line("burger", 1000, 2), line("fries", 500, 1)];
        let discount = DiscountSpec::percentage(2000).unwrap();
        let loyalty = LoyaltyRedemption::from_points(500, 100);
        let totals = compute_totals(
            &lines,
            Some(&discount),
            Some(&loyalty),
            TaxRate::from_bps(1000),
        );

        assert_eq!(totals.loyalty.cents(), 500);
        assert_eq!(totals.total.cents(), 1750);
    }

    #[test]
    fn test_empty_cart_all_zero() {
        let totals = compute_totals(&[], None, None, TaxRate::from_bps(1000));
        assert_eq!(totals, Totals::zero());
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let lines = [line("gum", 150, 1)];
        let discount = DiscountSpec::fixed(Money::from_cents(500)).unwrap();
        let totals = compute_totals(&lines, Some(&discount), None, TaxRate::from_bps(1000));

        assert_eq!(totals.discount.cents(), 150);
        // 150 + 15 tax - 150 discount
        assert_eq!(totals.total.cents(), 15);
    }

    #[test]
    fn test_hundred_percent_discount() {
        let lines = [line("burger", 1000, 1)];
        let discount = DiscountSpec::percentage(10000).unwrap();
        let totals = compute_totals(&lines, Some(&discount), None, TaxRate::from_bps(1000));

        assert_eq!(totals.discount.cents(), 1000);
        // Tax is still owed on the undiscounted subtotal.
        assert_eq!(totals.total.cents(), 100);
    }

    #[test]
    fn test_loyalty_clamped_to_remaining_balance() {
        // $1.50 ticket, $0.15 tax, no discount. 1000 points would be
        // worth $10.00 but only $1.65 of ticket remains.
        let lines = [line("gum", 150, 1)];
        let loyalty = LoyaltyRedemption::from_points(1000, 100);
        let totals = compute_totals(&lines, None, Some(&loyalty), TaxRate::from_bps(1000));

        assert_eq!(totals.loyalty.cents(), 165);
        assert_eq!(totals.total.cents(), 0);
    }

    #[test]
    fn test_clamp_loyalty_scales_points_down() {
        let redemption = LoyaltyRedemption::from_points(1000, 100); // $10.00
        let (points, granted) = clamp_loyalty(&redemption, Money::from_cents(165));

        assert_eq!(granted.cents(), 165);
        // 1000 × 165/1000 = 165 points actually redeemed
        assert_eq!(points, 165);
    }

    #[test]
    fn test_clamp_loyalty_no_clamp_needed() {
        let redemption = LoyaltyRedemption::from_points(500, 100); // $5.00
        let (points, granted) = clamp_loyalty(&redemption, Money::from_cents(2250));

        assert_eq!(points, 500);
        assert_eq!(granted.cents(), 500);
    }

    #[test]
    fn test_zero_rate_falls_back_to_default() {
        // A loyalty program misconfigured with rate <= 0 must not grant
        // unbounded discounts; it behaves as 100 pts/$1.
        let redemption = LoyaltyRedemption::from_points(500, 0);
        assert_eq!(redemption.amount_cents, 500);
    }

    #[test]
    fn test_total_never_negative() {
        let lines = [line("gum", 100, 1)];
        let discount = DiscountSpec::fixed(Money::from_cents(100)).unwrap();
        let loyalty = LoyaltyRedemption::from_points(5000, 100);
        let totals = compute_totals(
            &lines,
            Some(&discount),
            Some(&loyalty),
            TaxRate::from_bps(1000),
        );

        assert!(totals.total.cents() >= 0);
        // Adjustments never exceed subtotal + tax.
        assert!(totals.discount + totals.loyalty <= totals.subtotal + totals.tax);
    }
}
