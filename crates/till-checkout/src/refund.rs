//! # Refund Processor
//!
//! Reverses a completed order's payment, independent of the live cart.
//!
//! A refund never edits the original payment: it appends a new payment
//! row with a negative amount and status `refunded`, and flips the
//! order status. The payment ledger stays append-only, so
//! `SUM(amount_cents)` over an order is always its net paid amount.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use till_core::validation;
use till_core::{OrderStatus, Payment, PaymentMethod, PaymentStatus};
use till_db::{DbError, OrderRepository};

use crate::error::{CheckoutError, CheckoutResult};
use crate::events::{EventBus, OrderEvent};

/// Processes refunds against completed orders.
#[derive(Clone)]
pub struct RefundProcessor {
    repo: OrderRepository,
    events: EventBus,
}

impl RefundProcessor {
    pub fn new(repo: OrderRepository, events: EventBus) -> Self {
        RefundProcessor { repo, events }
    }

    /// Refunds `amount_cents` of a completed order.
    ///
    /// ## Rules
    /// - The order must exist and be `completed`; anything else
    ///   (pending, cancelled, already refunded) is
    ///   [`CheckoutError::NotRefundable`]
    /// - `0 < amount_cents <= order.total_cents`
    ///
    /// The negative payment row and the status flip are one write
    /// unit; the status guard in the store makes a concurrent double
    /// refund lose cleanly.
    pub async fn refund(
        &self,
        order_id: &str,
        amount_cents: i64,
        reason: Option<String>,
    ) -> CheckoutResult<()> {
        let order = self
            .repo
            .get_order(order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;

        if order.status != OrderStatus::Completed {
            return Err(CheckoutError::NotRefundable {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        validation::validate_refund_amount(amount_cents, order.total_cents).map_err(|_| {
            CheckoutError::InvalidAmount {
                amount_cents,
                max_cents: order.total_cents,
            }
        })?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            method: order.payment_method.unwrap_or(PaymentMethod::Cash),
            status: PaymentStatus::Refunded,
            amount_cents: -amount_cents,
            note: reason,
            created_at: Utc::now(),
        };

        match self.repo.record_refund(order_id, &payment).await {
            Ok(()) => {}
            // Lost a race with another refund of the same order
            Err(DbError::StaleStatus { .. }) => {
                return Err(CheckoutError::NotRefundable {
                    order_id: order_id.to_string(),
                    status: OrderStatus::Refunded,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            order_id = %order_id,
            amount_cents = amount_cents,
            "Order refunded"
        );

        self.events.emit(OrderEvent::Refunded {
            order_id: order_id.to_string(),
            amount_cents,
        });

        Ok(())
    }
}
