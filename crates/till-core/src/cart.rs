//! # Cart Module
//!
//! The live ticket: a mutable collection of lines plus at most one
//! discount and one loyalty redemption.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cart Operations                                   │
//! │                                                                         │
//! │  UI Action               Cart Operation          State Change           │
//! │  ─────────               ──────────────          ────────────           │
//! │  Tap product ──────────► add_line() ───────────► merge or insert line  │
//! │  Change quantity ──────► set_quantity() ───────► line.quantity = n     │
//! │  Tap remove ───────────► remove_line() ────────► line deleted          │
//! │  Tap clear ────────────► clear() ──────────────► everything reset      │
//! │  Apply discount ───────► set_discount() ───────► replaces previous     │
//! │  Redeem points ────────► set_loyalty_redemption()                      │
//! │  Hold / Checkout ──────► snapshot() ───────────► deep copy handed off  │
//! │                                                                         │
//! │  EVERY mutation recomputes totals through the pricing engine.           │
//! │  A displayed total is never stale.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by product id (adding the same product merges quantity)
//! - Line quantity is always >= 1
//! - `totals.subtotal == Σ line totals` after every mutation
//! - `discount + loyalty <= subtotal + tax`; `total >= 0`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::{self, Totals};
use crate::types::TaxRate;
use crate::validation::{validate_price_cents, validate_product_name, validate_quantity};
use crate::{DEFAULT_POINTS_PER_DOLLAR, MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// One line on the ticket.
///
/// The name and unit price are frozen copies of catalog data at the
/// moment the line was added. A catalog price change mid-ticket never
/// retroactively reprices a line that is already rung up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,

    /// Product name at time of adding (frozen).
    pub name: String,

    /// Unit price at time of adding (frozen).
    pub unit_price: Money,

    /// Quantity on the ticket, always >= 1.
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: &str, name: &str, unit_price: Money, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.to_string(),
            name: name.to_string(),
            unit_price,
            quantity,
        }
    }

    /// Line total: unit price × quantity.
    #[inline]
    pub fn total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

// =============================================================================
// Discount Spec
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `raw_value` is a share of the subtotal in basis points.
    Percentage,
    /// `raw_value` is an absolute amount in cents.
    Fixed,
}

/// A discount applied to the whole ticket.
///
/// Only one spec is active at a time; applying a new one replaces the
/// old. `resolved_cents` is refreshed by the pricing engine on every
/// cart mutation and is always clamped to `[0, subtotal]`.
/// Fields are private so a spec can only exist via the validated
/// constructors; a percentage outside 0..=10000 bps is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountSpec {
    kind: DiscountKind,
    /// Basis points for percentage, cents for fixed.
    raw_value: i64,
    /// The clamped amount the ticket currently receives.
    resolved_cents: i64,
}

impl DiscountSpec {
    /// A percentage discount. `bps` must be within 0..=10000 (0%..100%).
    pub fn percentage(bps: u32) -> CoreResult<Self> {
        crate::validation::validate_bps("discount", bps)?;
        Ok(DiscountSpec {
            kind: DiscountKind::Percentage,
            raw_value: bps as i64,
            resolved_cents: 0,
        })
    }

    /// A fixed-amount discount.
    pub fn fixed(amount: Money) -> CoreResult<Self> {
        validate_price_cents(amount.cents())?;
        Ok(DiscountSpec {
            kind: DiscountKind::Fixed,
            raw_value: amount.cents(),
            resolved_cents: 0,
        })
    }

    /// How the raw value is interpreted.
    #[inline]
    pub fn kind(&self) -> DiscountKind {
        self.kind
    }

    /// Basis points for percentage specs, cents for fixed specs.
    #[inline]
    pub fn raw_value(&self) -> i64 {
        self.raw_value
    }

    /// The amount this spec currently grants.
    #[inline]
    pub fn resolved(&self) -> Money {
        Money::from_cents(self.resolved_cents)
    }
}

// =============================================================================
// Loyalty Redemption
// =============================================================================

/// Points redeemed against the ticket.
///
/// Holds the points and the discount amount those points produce.
/// When the ticket cannot absorb the full amount, the pricing engine
/// scales both fields down together so the customer never pays more
/// points than the discount they actually received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyRedemption {
    pub points: i64,
    pub amount_cents: i64,
}

impl LoyaltyRedemption {
    /// Builds a redemption from a point count and an exchange rate
    /// (points per $1 of discount).
    ///
    /// A rate of zero or less falls back to
    /// [`DEFAULT_POINTS_PER_DOLLAR`] rather than granting unbounded
    /// discounts; the original store data contained such programs.
    pub fn from_points(points: i64, points_per_dollar: i64) -> Self {
        let rate = if points_per_dollar <= 0 {
            DEFAULT_POINTS_PER_DOLLAR
        } else {
            points_per_dollar
        };
        LoyaltyRedemption {
            points,
            amount_cents: points * 100 / rate,
        }
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The ticket currently being built.
///
/// Owned by exactly one till session; handed to the hold store or the
/// checkout coordinator only as a [`Cart::snapshot`] deep copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines keyed by product id. Insertion order is irrelevant;
    /// the map guarantees uniqueness per product.
    lines: BTreeMap<String, CartLine>,

    discount: Option<DiscountSpec>,

    loyalty: Option<LoyaltyRedemption>,

    tax_rate: TaxRate,

    /// Cached result of the last pricing run. Refreshed on every
    /// mutation, so reads are free and never stale.
    totals: Totals,
}

impl Cart {
    /// Creates an empty cart with the store's default tax rate.
    pub fn new() -> Self {
        Cart::with_tax_rate(TaxRate::default())
    }

    /// Creates an empty cart with an explicit tax rate.
    pub fn with_tax_rate(tax_rate: TaxRate) -> Self {
        Cart {
            lines: BTreeMap::new(),
            discount: None,
            loyalty: None,
            tax_rate,
            totals: Totals::zero(),
        }
    }

    // -------------------------------------------------------------------------
    // Line mutations
    // -------------------------------------------------------------------------

    /// Adds a product to the ticket, or merges quantity if the product
    /// is already on it.
    ///
    /// Rejects non-positive quantities, negative prices, empty names,
    /// and quantities or cart sizes beyond the configured limits.
    pub fn add_line(
        &mut self,
        product_id: &str,
        name: &str,
        unit_price: Money,
        quantity: i64,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price_cents(unit_price.cents())?;
        validate_product_name(name)?;

        if let Some(line) = self.lines.get_mut(product_id) {
            let merged = line.quantity + quantity;
            if merged > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = merged;
        } else {
            if self.lines.len() >= MAX_CART_LINES {
                return Err(CoreError::CartTooLarge {
                    max: MAX_CART_LINES,
                });
            }
            self.lines.insert(
                product_id.to_string(),
                CartLine::new(product_id, name, unit_price, quantity),
            );
        }

        self.recompute();
        Ok(())
    }

    /// Removes a line. A missing product id is a no-op, not an error:
    /// the operator's intent (line gone) is already satisfied.
    pub fn remove_line(&mut self, product_id: &str) {
        if self.lines.remove(product_id).is_some() {
            self.recompute();
        }
    }

    /// Sets a line's quantity directly. Zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            self.remove_line(product_id);
            return Ok(());
        }
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.get_mut(product_id) {
            line.quantity = quantity;
            self.recompute();
        }
        Ok(())
    }

    /// Empties the ticket: lines, discount and loyalty redemption.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = None;
        self.loyalty = None;
        self.totals = Totals::zero();
    }

    // -------------------------------------------------------------------------
    // Adjustments
    // -------------------------------------------------------------------------

    /// Applies a discount, replacing any previous one.
    ///
    /// Rejected on an empty cart: there is nothing to discount, and the
    /// original registers let a stale discount leak into the next ticket
    /// this way.
    pub fn set_discount(&mut self, spec: DiscountSpec) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        self.discount = Some(spec);
        self.recompute();
        Ok(())
    }

    pub fn clear_discount(&mut self) {
        if self.discount.take().is_some() {
            self.recompute();
        }
    }

    /// Applies a loyalty redemption, replacing any previous one.
    /// Rejected on an empty cart.
    ///
    /// This only previews the redemption; no points are debited until
    /// the payment is confirmed.
    pub fn set_loyalty_redemption(&mut self, redemption: LoyaltyRedemption) -> CoreResult<()> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        crate::validation::validate_points(redemption.points)?;
        self.loyalty = Some(redemption);
        self.recompute();
        Ok(())
    }

    pub fn clear_loyalty_redemption(&mut self) {
        if self.loyalty.take().is_some() {
            self.recompute();
        }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// An immutable deep copy for hand-off to the hold store or the
    /// checkout coordinator. Mutating the live cart afterwards does not
    /// touch the snapshot.
    pub fn snapshot(&self) -> Cart {
        self.clone()
    }

    /// The current totals. Always consistent with the lines and
    /// adjustments; recomputed on every mutation.
    #[inline]
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.get(product_id)
    }

    pub fn discount(&self) -> Option<&DiscountSpec> {
        self.discount.as_ref()
    }

    pub fn loyalty(&self) -> Option<&LoyaltyRedemption> {
        self.loyalty.as_ref()
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    // -------------------------------------------------------------------------
    // Internal
    // -------------------------------------------------------------------------

    /// Re-runs the pricing engine and writes the resolved adjustment
    /// amounts back into the specs, so displayed adjustments always
    /// match what the total actually used.
    fn recompute(&mut self) {
        let subtotal: Money = self.lines.values().map(|l| l.total()).sum();

        if let Some(spec) = self.discount.as_mut() {
            spec.resolved_cents = pricing::resolve_discount(spec, subtotal).cents();
        }

        if let Some(redemption) = self.loyalty.as_mut() {
            let tax = subtotal.tax(self.tax_rate);
            let discount = self
                .discount
                .map(|d| d.resolved())
                .unwrap_or_else(Money::zero);
            let (points, granted) = pricing::clamp_loyalty(redemption, subtotal + tax - discount);
            redemption.points = points;
            redemption.amount_cents = granted.cents();
        }

        self.totals = pricing::compute_totals(
            self.lines.values(),
            self.discount.as_ref(),
            self.loyalty.as_ref(),
            self.tax_rate,
        );
    }
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn burger_fries_cart() -> Cart {
        let mut cart = Cart::new(); // 10% default tax
        cart.add_line("burger", "Burger", Money::from_cents(1000), 2)
            .unwrap();
        cart.add_line("fries", "Fries", Money::from_cents(500), 1)
            .unwrap();
        cart
    }

    #[test]
    fn test_add_line_merges_quantity() {
        let mut cart = Cart::new();
        cart.add_line("p1", "Cola", Money::from_cents(250), 2).unwrap();
        cart.add_line("p1", "Cola", Money::from_cents(250), 3).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.line("p1").unwrap().quantity, 5);
        assert_eq!(cart.totals().subtotal.cents(), 1250);
    }

    #[test]
    fn test_add_line_rejects_bad_input() {
        let mut cart = Cart::new();
        assert!(cart.add_line("p1", "Cola", Money::from_cents(250), 0).is_err());
        assert!(cart.add_line("p1", "Cola", Money::from_cents(-5), 1).is_err());
        assert!(cart.add_line("p1", "", Money::from_cents(250), 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_merge_respects_quantity_cap() {
        let mut cart = Cart::new();
        cart.add_line("p1", "Cola", Money::from_cents(250), 999).unwrap();
        let err = cart.add_line("p1", "Cola", Money::from_cents(250), 1);
        assert!(matches!(err, Err(CoreError::QuantityTooLarge { .. })));
        // Failed merge leaves the line untouched.
        assert_eq!(cart.line("p1").unwrap().quantity, 999);
    }

    #[test]
    fn test_remove_line_absent_is_noop() {
        let mut cart = burger_fries_cart();
        cart.remove_line("no-such-product");
        assert_eq!(cart.line_count(), 2);

        cart.remove_line("fries");
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.totals().subtotal.cents(), 2000);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = burger_fries_cart();
        cart.set_quantity("burger", 0).unwrap();
        assert!(cart.line("burger").is_none());
    }

    #[test]
    fn test_subtotal_tracks_every_mutation() {
        let mut cart = Cart::new();
        cart.add_line("a", "A", Money::from_cents(199), 3).unwrap();
        assert_eq!(cart.totals().subtotal.cents(), 597);

        cart.add_line("b", "B", Money::from_cents(250), 1).unwrap();
        assert_eq!(cart.totals().subtotal.cents(), 847);

        cart.set_quantity("a", 1).unwrap();
        assert_eq!(cart.totals().subtotal.cents(), 449);

        cart.remove_line("b");
        assert_eq!(cart.totals().subtotal.cents(), 199);
    }

    #[test]
    fn test_discount_spec_only_holds_validated_values() {
        // Out-of-range basis points cannot produce a spec at all
        assert!(DiscountSpec::percentage(10001).is_err());
        assert!(DiscountSpec::fixed(Money::from_cents(-1)).is_err());

        let spec = DiscountSpec::percentage(2000).unwrap();
        assert_eq!(spec.kind(), DiscountKind::Percentage);
        assert_eq!(spec.raw_value(), 2000);
        assert_eq!(spec.resolved().cents(), 0);
    }

    #[test]
    fn test_discount_on_empty_cart_rejected() {
        let mut cart = Cart::new();
        let spec = DiscountSpec::percentage(2000).unwrap();
        assert_eq!(cart.set_discount(spec), Err(CoreError::EmptyCart));

        let redemption = LoyaltyRedemption::from_points(100, 100);
        assert_eq!(
            cart.set_loyalty_redemption(redemption),
            Err(CoreError::EmptyCart)
        );
    }

    #[test]
    fn test_discount_replaces_previous() {
        let mut cart = burger_fries_cart();
        cart.set_discount(DiscountSpec::percentage(2000).unwrap()).unwrap();
        assert_eq!(cart.totals().discount.cents(), 500);

        cart.set_discount(DiscountSpec::fixed(Money::from_cents(300)).unwrap())
            .unwrap();
        assert_eq!(cart.totals().discount.cents(), 300);
        assert_eq!(cart.totals().total.cents(), 2450);
    }

    #[test]
    fn test_discount_reresolved_after_line_change() {
        let mut cart = burger_fries_cart();
        cart.set_discount(DiscountSpec::percentage(2000).unwrap()).unwrap();
        assert_eq!(cart.discount().unwrap().resolved().cents(), 500);

        // Removing fries drops the subtotal to $20.00; 20% follows it.
        cart.remove_line("fries");
        assert_eq!(cart.discount().unwrap().resolved().cents(), 400);
        assert_eq!(cart.totals().total.cents(), 1800);
    }

    #[test]
    fn test_full_scenario_totals() {
        // Scenarios A, B, C end-to-end through the cart.
        let mut cart = burger_fries_cart();
        assert_eq!(cart.totals().total.cents(), 2750);

        cart.set_discount(DiscountSpec::percentage(2000).unwrap()).unwrap();
        assert_eq!(cart.totals().total.cents(), 2250);

        cart.set_loyalty_redemption(LoyaltyRedemption::from_points(500, 100))
            .unwrap();
        assert_eq!(cart.totals().loyalty.cents(), 500);
        assert_eq!(cart.totals().total.cents(), 1750);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cart = burger_fries_cart();
        cart.set_discount(DiscountSpec::percentage(1000).unwrap()).unwrap();
        cart.clear();

        assert!(cart.is_empty());
        assert!(cart.discount().is_none());
        assert!(cart.loyalty().is_none());
        assert_eq!(*cart.totals(), Totals::zero());
    }

    #[test]
    fn test_snapshot_is_deep_copy() {
        let mut cart = burger_fries_cart();
        let snap = cart.snapshot();

        cart.add_line("shake", "Shake", Money::from_cents(450), 1).unwrap();
        cart.set_quantity("burger", 9).unwrap();

        assert_eq!(snap.line_count(), 2);
        assert_eq!(snap.line("burger").unwrap().quantity, 2);
        assert_eq!(snap.totals().subtotal.cents(), 2500);
    }
}
