//! # Checkout Transaction Coordinator
//!
//! Turns a finalized cart into durable order rows, atomically.
//!
//! ## Checkout State Machine (per attempt)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Idle ──begin_checkout──▶ DraftCreated ───▶ AwaitingPayment           │
//! │                             (order row          │         │            │
//! │                              status=pending     │         │            │
//! │                              + item rows,       ▼         ▼            │
//! │                              one write unit)  Committed  Aborted       │
//! │                                               (payment   (draft and    │
//! │                                                row +      items        │
//! │                                                status     deleted)     │
//! │                                                flip)                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One attempt in flight at a time: `begin_checkout` rejects while a
//! token is still awaiting payment. The in-flight slot is a mutex held
//! across the draft write, so two begins racing cannot both create
//! drafts.
//!
//! ## Guarantees
//! - A completed order has exactly one completed payment equal to its
//!   total.
//! - No draft survives past the end of an attempt, success or abort.
//! - A store failure mid-commit rolls back entirely; the live cart is
//!   preserved for retry.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use till_core::validation;
use till_core::{Cart, CoreError, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus};
use till_db::{DbError, OrderRepository};

use crate::collaborators::LoyaltyLedger;
use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{EventBus, OrderEvent};

// =============================================================================
// Inputs
// =============================================================================

/// Who is ringing the sale up, and for whom.
#[derive(Debug, Clone, Default)]
pub struct CheckoutContext {
    pub staff_id: String,
    pub customer_id: Option<String>,
    pub table_number: Option<String>,
}

/// The operator-confirmed payment.
#[derive(Debug, Clone)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub note: Option<String>,
}

impl PaymentDetails {
    pub fn new(method: PaymentMethod, amount_cents: i64) -> Self {
        PaymentDetails {
            method,
            amount_cents,
            note: None,
        }
    }
}

// =============================================================================
// Token
// =============================================================================

/// Loyalty debit staged at `begin_checkout`, executed at
/// `confirm_payment`.
#[derive(Debug, Clone)]
struct PendingDebit {
    customer_id: String,
    points: i64,
}

/// Handle to an in-flight checkout attempt.
///
/// Resolved by `confirm_payment` or `abort_checkout`; a token whose
/// attempt has ended is stale and rejected. The caller keeps the token
/// when a resolution fails retryably, so cleanup can be re-driven.
#[derive(Debug)]
pub struct CheckoutToken {
    order_id: String,
    total_cents: i64,
    loyalty_debit: Option<PendingDebit>,

    /// Line snapshots exactly as persisted at `begin_checkout`.
    /// Carried here so the commit event never needs a post-commit
    /// store read.
    items: Vec<OrderItem>,
}

impl CheckoutToken {
    /// The draft order this token references.
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// The exact amount `confirm_payment` must be handed.
    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }
}

// =============================================================================
// Coordinator
// =============================================================================

/// The single writer of orders, order items, and payments.
pub struct CheckoutCoordinator {
    repo: OrderRepository,
    ledger: Arc<dyn LoyaltyLedger>,
    events: EventBus,

    /// Order id of the attempt currently awaiting payment, if any.
    /// Held across the draft write so concurrent begins serialize.
    in_flight: Mutex<Option<String>>,
}

impl CheckoutCoordinator {
    pub fn new(repo: OrderRepository, ledger: Arc<dyn LoyaltyLedger>, events: EventBus) -> Self {
        CheckoutCoordinator {
            repo,
            ledger,
            events,
            in_flight: Mutex::new(None),
        }
    }

    /// Snapshots the cart into a draft order and opens a checkout
    /// attempt.
    ///
    /// ## What This Does (single transaction)
    /// 1. Rejects empty carts, zero totals, and a second attempt while
    ///    one is awaiting payment
    /// 2. Writes the pending order row and every item row in one unit
    /// 3. Stages the loyalty debit (executed only on confirm)
    ///
    /// Returns a token that must be resolved by [`confirm_payment`]
    /// or [`abort_checkout`].
    ///
    /// [`confirm_payment`]: CheckoutCoordinator::confirm_payment
    /// [`abort_checkout`]: CheckoutCoordinator::abort_checkout
    pub async fn begin_checkout(
        &self,
        cart: &Cart,
        ctx: &CheckoutContext,
    ) -> CheckoutResult<CheckoutToken> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let totals = *cart.totals();
        if totals.total.cents() <= 0 {
            return Err(CheckoutError::ZeroTotal);
        }

        let mut in_flight = self.in_flight.lock().await;
        if let Some(existing) = in_flight.as_ref() {
            return Err(CheckoutError::CheckoutInProgress {
                order_id: existing.clone(),
            });
        }

        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let order = Order {
            id: order_id.clone(),
            status: OrderStatus::Pending,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            loyalty_cents: totals.loyalty.cents(),
            total_cents: totals.total.cents(),
            staff_id: ctx.staff_id.clone(),
            customer_id: ctx.customer_id.clone(),
            table_number: ctx.table_number.clone(),
            payment_method: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        let items: Vec<OrderItem> = cart
            .lines()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: line.name.clone(),
                unit_price_cents: line.unit_price.cents(),
                quantity: line.quantity,
                total_cents: line.total().cents(),
                created_at: now,
            })
            .collect();

        // Draft write fails => slot stays empty, nothing persisted
        self.repo.create_draft(&order, &items).await?;
        *in_flight = Some(order_id.clone());

        let loyalty_debit = match (cart.loyalty(), ctx.customer_id.as_ref()) {
            (Some(redemption), Some(customer_id)) if redemption.points > 0 => {
                Some(PendingDebit {
                    customer_id: customer_id.clone(),
                    points: redemption.points,
                })
            }
            _ => None,
        };

        info!(
            order_id = %order_id,
            total_cents = totals.total.cents(),
            item_count = items.len(),
            "Checkout attempt opened"
        );

        Ok(CheckoutToken {
            order_id,
            total_cents: totals.total.cents(),
            loyalty_debit,
            items,
        })
    }

    /// Commits the attempt: payment row and status flip become durable
    /// together, the live cart is cleared, and a `Committed` event is
    /// emitted. Returns the finalized order id.
    ///
    /// A payment amount that does not equal the order total aborts the
    /// attempt (draft deleted) and reports [`CheckoutError::PaymentMismatch`].
    ///
    /// On a failed teardown (mismatch or persistence path where the
    /// draft delete itself fails) the attempt stays open: the caller
    /// keeps the token and drives [`abort_checkout`] to retry the
    /// cleanup.
    ///
    /// [`abort_checkout`]: CheckoutCoordinator::abort_checkout
    pub async fn confirm_payment(
        &self,
        token: &CheckoutToken,
        details: PaymentDetails,
        cart: &mut Cart,
    ) -> CheckoutResult<String> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_deref() != Some(token.order_id.as_str()) {
            return Err(CheckoutError::StaleToken {
                order_id: token.order_id.clone(),
            });
        }

        // Rejected before any write; the attempt stays open for a
        // corrected tender
        validation::validate_payment_amount(details.amount_cents)
            .map_err(CoreError::from)?;

        if details.amount_cents != token.total_cents {
            debug!(
                order_id = %token.order_id,
                expected = token.total_cents,
                actual = details.amount_cents,
                "Payment amount mismatch, aborting attempt"
            );
            self.teardown_draft(&mut *in_flight, &token.order_id).await;
            return Err(CheckoutError::PaymentMismatch {
                expected_cents: token.total_cents,
                actual_cents: details.amount_cents,
            });
        }

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: token.order_id.clone(),
            method: details.method,
            status: PaymentStatus::Completed,
            amount_cents: token.total_cents,
            note: details.note,
            created_at: Utc::now(),
        };

        if let Err(e) = self.repo.commit_payment(&token.order_id, &payment).await {
            // Transaction rolled back: the draft cannot linger, but the
            // live cart is untouched so the operator can retry
            self.teardown_draft(&mut *in_flight, &token.order_id).await;
            return Err(e.into());
        }

        // The order is durable. A ledger failure past this point must
        // not un-commit it; it is logged for manual reconciliation.
        if let Some(debit) = &token.loyalty_debit {
            if let Err(e) = self
                .ledger
                .debit_points(&debit.customer_id, debit.points)
                .await
            {
                warn!(
                    order_id = %token.order_id,
                    customer_id = %debit.customer_id,
                    points = debit.points,
                    error = %e,
                    "Loyalty debit failed after commit"
                );
            }
        }

        cart.clear();
        *in_flight = None;

        info!(
            order_id = %token.order_id,
            amount_cents = token.total_cents,
            method = ?details.method,
            "Checkout committed"
        );

        self.events.emit(OrderEvent::Committed {
            order_id: token.order_id.clone(),
            total_cents: token.total_cents,
            items: token.items.clone(),
        });

        Ok(token.order_id.clone())
    }

    /// Abandons the attempt: the draft order and its items are deleted
    /// and the in-flight slot released. The live cart is left exactly
    /// as it was, so the operator can retry or keep editing.
    ///
    /// If the delete itself fails, the slot stays occupied and the
    /// token stays valid, so the same call can be retried until the
    /// draft is gone.
    pub async fn abort_checkout(&self, token: &CheckoutToken) -> CheckoutResult<()> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.as_deref() != Some(token.order_id.as_str()) {
            return Err(CheckoutError::StaleToken {
                order_id: token.order_id.clone(),
            });
        }

        match self.repo.delete_draft(&token.order_id).await {
            Ok(()) => {
                *in_flight = None;
                info!(order_id = %token.order_id, "Checkout aborted");
                Ok(())
            }
            // Draft already gone: the goal state is reached
            Err(DbError::StaleStatus { .. }) => {
                *in_flight = None;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True while an attempt is awaiting payment.
    pub async fn is_in_flight(&self) -> bool {
        self.in_flight.lock().await.is_some()
    }

    /// Draft removal on a failure path. Releases the in-flight slot
    /// only once the draft is actually gone; otherwise the attempt
    /// stays open so an `abort_checkout` retry can finish the job.
    async fn teardown_draft(&self, in_flight: &mut Option<String>, order_id: &str) {
        match self.repo.delete_draft(order_id).await {
            Ok(()) | Err(DbError::StaleStatus { .. }) => *in_flight = None,
            Err(e) => warn!(
                order_id = %order_id,
                error = %e,
                "Draft cleanup failed, attempt stays open for an abort retry"
            ),
        }
    }
}
