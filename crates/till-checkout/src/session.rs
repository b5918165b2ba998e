//! # Till Session
//!
//! The facade one operator's UI talks to.
//!
//! ## Session Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  TillSession (one per operator)                                         │
//! │  ├── Cart            the one live ticket                               │
//! │  ├── HoldStore       suspended tickets, in memory                      │
//! │  ├── CheckoutCoordinator ──▶ OrderRepository (the only order writer)   │
//! │  ├── RefundProcessor     ──▶ OrderRepository                           │
//! │  └── collaborators: ProductCatalog, LoyaltyLedger, CouponValidator     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One live cart at a time; a held ticket can only be resumed onto an
//! empty cart. The session stages the checkout token internally so the
//! UI flow is plain `begin_checkout` / `confirm_payment` /
//! `abort_checkout` calls.

use std::sync::Arc;

use tracing::debug;

use till_core::{
    Cart, DiscountSpec, HeldOrder, HoldHandle, HoldStore, LoyaltyRedemption, Money, TaxRate,
    Totals, ValidationError, DEFAULT_POINTS_PER_DOLLAR,
};
use till_db::Database;

use crate::collaborators::{CouponValidator, LoyaltyLedger, ProductCatalog};
use crate::coordinator::{CheckoutContext, CheckoutCoordinator, CheckoutToken, PaymentDetails};
use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{EventBus, OrderEvent};
use crate::refund::RefundProcessor;

/// One operator's till: the live cart, the hold rail, and the
/// transaction machinery behind them.
pub struct TillSession {
    cart: Cart,
    holds: HoldStore,

    coordinator: CheckoutCoordinator,
    refunds: RefundProcessor,
    pending: Option<CheckoutToken>,

    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn LoyaltyLedger>,
    coupons: Arc<dyn CouponValidator>,

    events: EventBus,

    staff_id: String,
    customer_id: Option<String>,
    table_number: Option<String>,

    /// Loyalty exchange rate (points per $1 of discount).
    points_per_dollar: i64,
}

impl TillSession {
    /// Opens a session for one operator against a database.
    pub fn new(
        db: &Database,
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn LoyaltyLedger>,
        coupons: Arc<dyn CouponValidator>,
        staff_id: impl Into<String>,
    ) -> Self {
        Self::with_tax_rate(db, catalog, ledger, coupons, staff_id, TaxRate::default())
    }

    /// Opens a session with an explicit tax rate.
    pub fn with_tax_rate(
        db: &Database,
        catalog: Arc<dyn ProductCatalog>,
        ledger: Arc<dyn LoyaltyLedger>,
        coupons: Arc<dyn CouponValidator>,
        staff_id: impl Into<String>,
        tax_rate: TaxRate,
    ) -> Self {
        let events = EventBus::new();
        let repo = db.orders();

        TillSession {
            cart: Cart::with_tax_rate(tax_rate),
            holds: HoldStore::new(),
            coordinator: CheckoutCoordinator::new(
                repo.clone(),
                Arc::clone(&ledger),
                events.clone(),
            ),
            refunds: RefundProcessor::new(repo, events.clone()),
            pending: None,
            catalog,
            ledger,
            coupons,
            events,
            staff_id: staff_id.into(),
            customer_id: None,
            table_number: None,
            points_per_dollar: DEFAULT_POINTS_PER_DOLLAR,
        }
    }

    /// Overrides the loyalty exchange rate. Zero or negative falls
    /// back to the default at redemption time.
    pub fn set_points_per_dollar(&mut self, rate: i64) {
        self.points_per_dollar = rate;
    }

    // =========================================================================
    // Ticket context
    // =========================================================================

    /// Attaches a customer to the ticket (enables loyalty redemption).
    pub fn set_customer(&mut self, customer_id: Option<String>) {
        self.customer_id = customer_id;
    }

    /// Sets the table number printed on the ticket.
    pub fn set_table(&mut self, table_number: Option<String>) {
        self.table_number = table_number;
    }

    /// Subscribes to committed/refunded order events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<OrderEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Cart operations
    // =========================================================================

    /// Rings a product up. The catalog name and price are frozen into
    /// the line at this moment.
    pub async fn add_product(&mut self, product_id: &str, quantity: i64) -> CheckoutResult<()> {
        let product = self
            .catalog
            .product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound {
                product_id: product_id.to_string(),
            })?;

        self.cart.add_line(
            product_id,
            &product.name,
            Money::from_cents(product.unit_price_cents),
            quantity,
        )?;

        debug!(
            product_id = %product_id,
            quantity = quantity,
            total_cents = self.cart.totals().total.cents(),
            "Product added"
        );

        Ok(())
    }

    /// Removes a line entirely. No-op if the product is not on the
    /// ticket.
    pub fn remove_product(&mut self, product_id: &str) {
        self.cart.remove_line(product_id);
    }

    /// Sets a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CheckoutResult<()> {
        self.cart.set_quantity(product_id, quantity)?;
        Ok(())
    }

    /// Empties the ticket, discount and redemption included.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    // =========================================================================
    // Discounts & loyalty
    // =========================================================================

    /// Applies a percentage discount (basis points, 0..=10000) to the
    /// ticket.
    pub fn apply_percentage_discount(&mut self, bps: u32) -> CheckoutResult<()> {
        self.cart.set_discount(DiscountSpec::percentage(bps)?)?;
        Ok(())
    }

    /// Validates a coupon code and applies its discount as a fixed
    /// amount.
    pub async fn apply_coupon(&mut self, code: &str) -> CheckoutResult<Money> {
        let subtotal = self.cart.totals().subtotal;
        let discount_cents = self
            .coupons
            .validate(code, subtotal.cents())
            .await?
            .ok_or_else(|| CheckoutError::CouponRejected {
                code: code.to_string(),
            })?;

        let amount = Money::from_cents(discount_cents);
        self.cart.set_discount(DiscountSpec::fixed(amount)?)?;

        debug!(code = %code, discount_cents = discount_cents, "Coupon applied");

        Ok(amount)
    }

    /// Removes any discount from the ticket.
    pub fn clear_discount(&mut self) {
        self.cart.clear_discount();
    }

    /// Computes what redeeming `points` would be worth, checking the
    /// customer's balance. Reads the ledger, never debits it.
    pub async fn preview_loyalty_redemption(
        &self,
        points: i64,
    ) -> CheckoutResult<LoyaltyRedemption> {
        let customer_id = self.require_customer()?;
        let available = self.ledger.available_points(customer_id).await?;

        if points <= 0 || points > available {
            return Err(CheckoutError::Validation(
                ValidationError::OutOfRange {
                    field: "points".to_string(),
                    min: 1,
                    max: available,
                }
                .into(),
            ));
        }

        Ok(LoyaltyRedemption::from_points(points, self.points_per_dollar))
    }

    /// Stages a loyalty redemption on the ticket. The point debit
    /// happens only when the checkout commits.
    pub async fn redeem_loyalty_points(&mut self, points: i64) -> CheckoutResult<()> {
        let redemption = self.preview_loyalty_redemption(points).await?;
        self.cart.set_loyalty_redemption(redemption)?;
        Ok(())
    }

    /// Removes any staged redemption from the ticket.
    pub fn clear_loyalty_redemption(&mut self) {
        self.cart.clear_loyalty_redemption();
    }

    // =========================================================================
    // Hold & resume
    // =========================================================================

    /// Suspends the live ticket onto the hold rail and starts a fresh
    /// empty cart.
    pub fn hold_order(&mut self) -> CheckoutResult<HoldHandle> {
        let handle = self.holds.hold(&self.cart)?;
        self.cart.clear();
        debug!(handle = %handle, "Ticket held");
        Ok(handle)
    }

    /// Brings a held ticket back as the live cart. Only an empty live
    /// cart can be replaced; holding or clearing first is on the
    /// operator.
    pub fn resume_order(&mut self, handle: HoldHandle) -> CheckoutResult<()> {
        if !self.cart.is_empty() {
            return Err(CheckoutError::CartNotEmpty);
        }
        self.cart = self.holds.resume(handle)?;
        debug!(handle = %handle, "Ticket resumed");
        Ok(())
    }

    /// Held tickets, oldest first.
    pub fn held_orders(&self) -> impl Iterator<Item = (HoldHandle, &HeldOrder)> {
        self.holds.list()
    }

    /// Drops a held ticket permanently.
    pub fn discard_held(&mut self, handle: HoldHandle) {
        self.holds.discard(handle);
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Opens a checkout attempt on the live cart. Returns the draft
    /// order id; the token is staged internally until
    /// [`confirm_payment`] or [`abort_checkout`].
    ///
    /// [`confirm_payment`]: TillSession::confirm_payment
    /// [`abort_checkout`]: TillSession::abort_checkout
    pub async fn begin_checkout(&mut self) -> CheckoutResult<String> {
        let ctx = CheckoutContext {
            staff_id: self.staff_id.clone(),
            customer_id: self.customer_id.clone(),
            table_number: self.table_number.clone(),
        };

        let token = self.coordinator.begin_checkout(&self.cart, &ctx).await?;
        let order_id = token.order_id().to_string();
        self.pending = Some(token);
        Ok(order_id)
    }

    /// The amount the staged attempt expects, if one is open.
    pub fn amount_due(&self) -> Option<Money> {
        self.pending
            .as_ref()
            .map(|t| Money::from_cents(t.total_cents()))
    }

    /// Commits the staged attempt. On success the live cart is empty
    /// and the finalized order id is returned.
    ///
    /// The token stays staged while the coordinator still has the
    /// attempt open, so a retryable failure can be followed by
    /// [`abort_checkout`] or another confirm.
    ///
    /// [`abort_checkout`]: TillSession::abort_checkout
    pub async fn confirm_payment(&mut self, details: PaymentDetails) -> CheckoutResult<String> {
        // Field borrows: the token borrows `pending` while the
        // coordinator takes the cart mutably
        let token = self.pending.as_ref().ok_or_else(|| CheckoutError::StaleToken {
            order_id: "none".to_string(),
        })?;
        let result = self
            .coordinator
            .confirm_payment(token, details, &mut self.cart)
            .await;
        self.resync_pending().await;
        result
    }

    /// Abandons the staged attempt; the live cart is untouched. If the
    /// draft delete fails, the token stays staged and the call can be
    /// retried.
    pub async fn abort_checkout(&mut self) -> CheckoutResult<()> {
        let token = self.pending_token()?;
        let result = self.coordinator.abort_checkout(token).await;
        self.resync_pending().await;
        result
    }

    // =========================================================================
    // Refunds
    // =========================================================================

    /// Refunds part or all of a completed order.
    pub async fn refund(
        &self,
        order_id: &str,
        amount_cents: i64,
        reason: Option<String>,
    ) -> CheckoutResult<()> {
        self.refunds.refund(order_id, amount_cents, reason).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The live cart, read-only.
    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Current ticket totals.
    pub fn totals(&self) -> &Totals {
        self.cart.totals()
    }

    fn require_customer(&self) -> CheckoutResult<&str> {
        self.customer_id
            .as_deref()
            .ok_or_else(|| {
                CheckoutError::Validation(
                    ValidationError::Required {
                        field: "customer_id".to_string(),
                    }
                    .into(),
                )
            })
    }

    fn pending_token(&self) -> CheckoutResult<&CheckoutToken> {
        self.pending.as_ref().ok_or_else(|| CheckoutError::StaleToken {
            order_id: "none".to_string(),
        })
    }

    /// Drops the staged token once the coordinator reports the attempt
    /// ended. The in-flight slot is the source of truth: a confirm or
    /// abort that left it occupied left the token usable too.
    async fn resync_pending(&mut self) {
        if !self.coordinator.is_in_flight().await {
            self.pending = None;
        }
    }
}
