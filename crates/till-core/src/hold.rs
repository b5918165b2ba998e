//! # Hold Store
//!
//! Suspended tickets. An operator can park the live cart (customer
//! forgot their wallet, a rush order cuts in line) and bring it back
//! later, exactly as it was.
//!
//! ## Hold / Resume Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Hold Store Flow                                   │
//! │                                                                         │
//! │  live Cart ──► hold() ──────► HeldOrder { snapshot, held_at }          │
//! │                  │             stored under a fresh HoldHandle          │
//! │                  ▼                                                      │
//! │  (caller clears the live cart - the store does not own that decision)  │
//! │                                                                         │
//! │  list() ──► oldest-first view of held tickets for the pick dialog      │
//! │                                                                         │
//! │  resume(handle) ──► removes the snapshot and returns it as the          │
//! │                     new live Cart. The handle is gone: a second         │
//! │                     resume of the same handle fails.                    │
//! │                                                                         │
//! │  discard(handle) ──► removes without returning; no-op if absent         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handles are monotonically issued and never reused, so no two holds
//! can ever collide on the same handle.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};

// =============================================================================
// Hold Handle
// =============================================================================

/// Opaque reference to a held ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoldHandle(u64);

impl fmt::Display for HoldHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Held Order
// =============================================================================

/// A suspended ticket: a deep copy of the cart, frozen at hold time.
///
/// Immutable once created; the only way it changes is removal, via
/// resume or discard.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrder {
    cart: Cart,
    held_at: DateTime<Utc>,
}

impl HeldOrder {
    /// The frozen ticket, for display in the resume dialog.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn held_at(&self) -> DateTime<Utc> {
        self.held_at
    }
}

// =============================================================================
// Hold Store
// =============================================================================

/// The list of suspended tickets for one till session.
#[derive(Debug, Default)]
pub struct HoldStore {
    /// Next handle to issue. Monotonic, never reused.
    next_handle: u64,

    /// Held tickets in hold order. Since handles are issued
    /// monotonically with the clock, this is also held_at ascending.
    held: Vec<(HoldHandle, HeldOrder)>,
}

impl HoldStore {
    pub fn new() -> Self {
        HoldStore::default()
    }

    /// Suspends a snapshot of the given cart and returns its handle.
    ///
    /// Holding an empty cart is rejected: there would be nothing to
    /// resume. The caller still owns the live cart and is responsible
    /// for clearing it.
    pub fn hold(&mut self, cart: &Cart) -> CoreResult<HoldHandle> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let handle = HoldHandle(self.next_handle);
        self.next_handle += 1;
        self.held.push((
            handle,
            HeldOrder {
                cart: cart.snapshot(),
                held_at: Utc::now(),
            },
        ));
        Ok(handle)
    }

    /// A restartable, oldest-first view of the held tickets.
    pub fn list(&self) -> impl Iterator<Item = (HoldHandle, &HeldOrder)> {
        self.held.iter().map(|(handle, order)| (*handle, order))
    }

    /// Removes a held ticket and returns its cart as the new live cart.
    ///
    /// Removal is atomic with the lookup: once this returns `Ok`, the
    /// handle is gone and a second resume of it fails with
    /// [`CoreError::HoldNotFound`].
    pub fn resume(&mut self, handle: HoldHandle) -> CoreResult<Cart> {
        match self.held.iter().position(|(h, _)| *h == handle) {
            Some(index) => Ok(self.held.remove(index).1.cart),
            None => Err(CoreError::HoldNotFound { handle }),
        }
    }

    /// Removes a held ticket without returning it. No-op if the handle
    /// is already gone.
    pub fn discard(&mut self, handle: HoldHandle) {
        self.held.retain(|(h, _)| *h != handle);
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn sample_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add_line("burger", "Burger", Money::from_cents(1000), 2)
            .unwrap();
        cart.add_line("fries", "Fries", Money::from_cents(500), 1)
            .unwrap();
        cart
    }

    #[test]
    fn test_hold_then_resume_roundtrips() {
        let mut store = HoldStore::new();
        let cart = sample_cart();

        let handle = store.hold(&cart).unwrap();
        let resumed = store.resume(handle).unwrap();

        assert_eq!(resumed, cart);
        assert!(store.is_empty());
    }

    #[test]
    fn test_hold_empty_cart_rejected() {
        let mut store = HoldStore::new();
        assert_eq!(store.hold(&Cart::new()), Err(CoreError::EmptyCart));
    }

    #[test]
    fn test_snapshot_isolated_from_live_cart() {
        let mut store = HoldStore::new();
        let mut cart = sample_cart();

        let handle = store.hold(&cart).unwrap();
        cart.clear();

        let resumed = store.resume(handle).unwrap();
        assert_eq!(resumed.line_count(), 2);
        assert_eq!(resumed.totals().subtotal.cents(), 2500);
    }

    #[test]
    fn test_resume_twice_fails() {
        let mut store = HoldStore::new();
        let handle = store.hold(&sample_cart()).unwrap();

        store.resume(handle).unwrap();
        assert_eq!(
            store.resume(handle),
            Err(CoreError::HoldNotFound { handle })
        );
    }

    #[test]
    fn test_discard_absent_is_noop() {
        let mut store = HoldStore::new();
        let handle = store.hold(&sample_cart()).unwrap();

        store.discard(handle);
        assert!(store.is_empty());
        store.discard(handle); // already gone
        assert!(store.is_empty());
    }

    #[test]
    fn test_handles_monotonic_and_never_reused() {
        let mut store = HoldStore::new();
        let h1 = store.hold(&sample_cart()).unwrap();
        let h2 = store.hold(&sample_cart()).unwrap();
        assert_ne!(h1, h2);

        store.resume(h1).unwrap();
        let h3 = store.hold(&sample_cart()).unwrap();
        assert_ne!(h3, h1);
        assert_ne!(h3, h2);
        assert!(h3 > h2);
    }

    #[test]
    fn test_list_is_oldest_first_and_restartable() {
        let mut store = HoldStore::new();
        let h1 = store.hold(&sample_cart()).unwrap();
        let h2 = store.hold(&sample_cart()).unwrap();

        let order: Vec<HoldHandle> = store.list().map(|(h, _)| h).collect();
        assert_eq!(order, vec![h1, h2]);

        // A fresh iterator starts over from the oldest entry.
        let again: Vec<HoldHandle> = store.list().map(|(h, _)| h).collect();
        assert_eq!(again, order);

        let mut held_ats = store.list().map(|(_, o)| o.held_at());
        let first = held_ats.next().unwrap();
        let second = held_ats.next().unwrap();
        assert!(first <= second);
    }
}
