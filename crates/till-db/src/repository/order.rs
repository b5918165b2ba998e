//! # Order Repository
//!
//! Database operations for orders, line items, and payments.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create_draft() → Order { status: Pending } + all items,        │
//! │         one transaction                                                │
//! │                                                                         │
//! │  2a. COMMIT                                                            │
//! │      └── commit_payment() → status becomes Completed AND the payment   │
//! │          row is inserted, one transaction, guarded on status=pending   │
//! │                                                                         │
//! │  2b. ABORT                                                             │
//! │      └── delete_draft() → order and items removed, guarded on          │
//! │          status=pending                                                │
//! │                                                                         │
//! │  3. (OPTIONAL) REFUND                                                  │
//! │     └── record_refund() → status becomes Refunded AND a negative        │
//! │         payment row is appended, guarded on status=completed           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status guards live in the SQL (`WHERE status = ?`): a transition that
//! matches zero rows rolls back and surfaces as [`DbError::StaleStatus`],
//! so two coordinators racing on the same order cannot both win.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Order, OrderItem, OrderStatus, Payment};

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Atomic write units
    // =========================================================================

    /// Inserts a pending order together with all of its line items.
    ///
    /// Runs in a single transaction: either the order and every item
    /// exist afterwards, or nothing does.
    pub async fn create_draft(&self, order: &Order, items: &[OrderItem]) -> DbResult<()> {
        debug!(
            id = %order.id,
            item_count = items.len(),
            total_cents = order.total_cents,
            "Creating draft order"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, status,
                subtotal_cents, tax_cents, discount_cents, loyalty_cents, total_cents,
                staff_id, customer_id, table_number, payment_method,
                created_at, updated_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&order.id)
        .bind(order.status)
        .bind(order.subtotal_cents)
        .bind(order.tax_cents)
        .bind(order.discount_cents)
        .bind(order.loyalty_cents)
        .bind(order.total_cents)
        .bind(&order.staff_id)
        .bind(&order.customer_id)
        .bind(&order.table_number)
        .bind(order.payment_method)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.completed_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, name_snapshot,
                    unit_price_cents, quantity, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.unit_price_cents)
            .bind(item.quantity)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Deletes a pending order and its items.
    ///
    /// Only drafts may be deleted. A completed, cancelled, or refunded
    /// order no longer matches the status guard and the call fails with
    /// [`DbError::StaleStatus`], leaving the row untouched.
    pub async fn delete_draft(&self, order_id: &str) -> DbResult<()> {
        debug!(id = %order_id, "Deleting draft order");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'pending'")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            // rollback restores the items we deleted above
            tx.rollback().await?;
            return Err(DbError::stale_status("Order", order_id, "pending"));
        }

        tx.commit().await?;

        Ok(())
    }

    /// Deletes every pending order and its items, returning how many
    /// orders were removed.
    ///
    /// Run at startup: a pending row at open time is an attempt the
    /// previous process never resolved, and nothing references it
    /// anymore.
    pub async fn purge_drafts(&self) -> DbResult<u64> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM order_items WHERE order_id IN \
             (SELECT id FROM orders WHERE status = 'pending')",
        )
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM orders WHERE status = 'pending'")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected())
    }

    /// Completes a pending order and records its payment.
    ///
    /// ## What This Does (single transaction)
    /// 1. UPDATE the order: status → completed, payment method and
    ///    completion timestamp set, guarded on `status = 'pending'`
    /// 2. INSERT the payment row
    ///
    /// If the guard matches zero rows (already committed, already
    /// aborted, never created) nothing is written.
    pub async fn commit_payment(&self, order_id: &str, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %order_id,
            amount_cents = payment.amount_cents,
            method = ?payment.method,
            "Committing payment"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'completed',
                payment_method = ?2,
                completed_at = ?3,
                updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(payment.method)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale_status("Order", order_id, "pending"));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, method, status, amount_cents, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.amount_cents)
        .bind(&payment.note)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Marks a completed order refunded and appends the refund payment.
    ///
    /// The payment ledger is append-only: the refund is a new row with a
    /// negative amount and status `refunded`, never a mutation of the
    /// original payment. Guarded on `status = 'completed'` so an order
    /// cannot be refunded twice.
    pub async fn record_refund(&self, order_id: &str, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %order_id,
            amount_cents = payment.amount_cents,
            "Recording refund"
        );

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'refunded',
                updated_at = ?2
            WHERE id = ?1 AND status = 'completed'
            "#,
        )
        .bind(order_id)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::stale_status("Order", order_id, "completed"));
        }

        sqlx::query(
            r#"
            INSERT INTO payments (id, order_id, method, status, amount_cents, note, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(payment.method)
        .bind(payment.status)
        .bind(payment.amount_cents)
        .bind(&payment.note)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an order by ID.
    pub async fn get_order(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, status,
                   subtotal_cents, tax_cents, discount_cents, loyalty_cents, total_cents,
                   staff_id, customer_id, table_number, payment_method,
                   created_at, updated_at, completed_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by ID, failing if it does not exist.
    pub async fn require_order(&self, id: &str) -> DbResult<Order> {
        self.get_order(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Gets all line items for an order, in insertion order.
    pub async fn get_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, name_snapshot,
                   unit_price_cents, quantity, total_cents, created_at
            FROM order_items
            WHERE order_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the full payment ledger for an order, oldest first.
    pub async fn get_payments(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, order_id, method, status, amount_cents, note, created_at
            FROM payments
            WHERE order_id = ?1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Net amount paid on an order: completed payments minus refunds.
    ///
    /// Refund rows carry negative amounts, so a plain SUM is the net.
    pub async fn total_paid(&self, order_id: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(amount_cents) FROM payments WHERE order_id = ?1",
        )
        .bind(order_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// Lists orders with a given status, newest first.
    pub async fn list_by_status(
        &self,
        status: OrderStatus,
        limit: i64,
    ) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, status,
                   subtotal_cents, tax_cents, discount_cents, loyalty_cents, total_cents,
                   staff_id, customer_id, table_number, payment_method,
                   created_at, updated_at, completed_at
            FROM orders
            WHERE status = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(status)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use till_core::{PaymentMethod, PaymentStatus};
    use uuid::Uuid;

    fn sample_order(id: &str, total_cents: i64) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            status: OrderStatus::Pending,
            subtotal_cents: total_cents,
            tax_cents: 0,
            discount_cents: 0,
            loyalty_cents: 0,
            total_cents,
            staff_id: "staff-1".to_string(),
            customer_id: None,
            table_number: Some("4".to_string()),
            payment_method: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn sample_item(order_id: &str, cents: i64, qty: i64) -> OrderItem {
        OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: Uuid::new_v4().to_string(),
            name_snapshot: "Flat White".to_string(),
            unit_price_cents: cents,
            quantity: qty,
            total_cents: cents * qty,
            created_at: Utc::now(),
        }
    }

    fn sample_payment(order_id: &str, amount_cents: i64, status: PaymentStatus) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            method: PaymentMethod::Card,
            status,
            amount_cents,
            note: None,
            created_at: Utc::now(),
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_draft_roundtrip() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-1", 900);
        let items = vec![sample_item("ord-1", 450, 2)];
        repo.create_draft(&order, &items).await.unwrap();

        let loaded = repo.require_order("ord-1").await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Pending);
        assert_eq!(loaded.total_cents, 900);
        assert_eq!(loaded.table_number.as_deref(), Some("4"));

        let loaded_items = repo.get_items("ord-1").await.unwrap();
        assert_eq!(loaded_items.len(), 1);
        assert_eq!(loaded_items[0].quantity, 2);
        assert_eq!(loaded_items[0].name_snapshot, "Flat White");
    }

    #[tokio::test]
    async fn test_delete_draft_removes_order_and_items() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-2", 450);
        repo.create_draft(&order, &[sample_item("ord-2", 450, 1)])
            .await
            .unwrap();

        repo.delete_draft("ord-2").await.unwrap();

        assert!(repo.get_order("ord-2").await.unwrap().is_none());
        assert!(repo.get_items("ord-2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_purge_drafts_removes_only_pending_orders() {
        let db = test_db().await;
        let repo = db.orders();

        repo.create_draft(&sample_order("ord-keep", 1200), &[sample_item("ord-keep", 600, 2)])
            .await
            .unwrap();
        repo.commit_payment(
            "ord-keep",
            &sample_payment("ord-keep", 1200, PaymentStatus::Completed),
        )
        .await
        .unwrap();

        repo.create_draft(&sample_order("ord-stale", 450), &[sample_item("ord-stale", 450, 1)])
            .await
            .unwrap();

        let purged = repo.purge_drafts().await.unwrap();
        assert_eq!(purged, 1);

        assert!(repo.get_order("ord-stale").await.unwrap().is_none());
        assert!(repo.get_items("ord-stale").await.unwrap().is_empty());

        let kept = repo.require_order("ord-keep").await.unwrap();
        assert_eq!(kept.status, OrderStatus::Completed);
        assert_eq!(repo.get_items("ord-keep").await.unwrap().len(), 1);

        // Nothing pending left
        assert_eq!(repo.purge_drafts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_draft_missing_is_stale() {
        let db = test_db().await;
        let repo = db.orders();

        let err = repo.delete_draft("nope").await.unwrap_err();
        assert!(matches!(err, DbError::StaleStatus { .. }));
    }

    #[tokio::test]
    async fn test_commit_payment_completes_order() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-3", 2750);
        repo.create_draft(&order, &[sample_item("ord-3", 2750, 1)])
            .await
            .unwrap();

        let payment = sample_payment("ord-3", 2750, PaymentStatus::Completed);
        repo.commit_payment("ord-3", &payment).await.unwrap();

        let loaded = repo.require_order("ord-3").await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Completed);
        assert_eq!(loaded.payment_method, Some(PaymentMethod::Card));
        assert!(loaded.completed_at.is_some());

        assert_eq!(repo.total_paid("ord-3").await.unwrap(), 2750);
    }

    #[tokio::test]
    async fn test_commit_payment_twice_fails_once() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-4", 500);
        repo.create_draft(&order, &[]).await.unwrap();

        let first = sample_payment("ord-4", 500, PaymentStatus::Completed);
        repo.commit_payment("ord-4", &first).await.unwrap();

        let second = sample_payment("ord-4", 500, PaymentStatus::Completed);
        let err = repo.commit_payment("ord-4", &second).await.unwrap_err();
        assert!(matches!(err, DbError::StaleStatus { .. }));

        // the losing attempt must not have double-charged
        assert_eq!(repo.total_paid("ord-4").await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_delete_after_commit_fails() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-5", 500);
        repo.create_draft(&order, &[sample_item("ord-5", 500, 1)])
            .await
            .unwrap();
        repo.commit_payment("ord-5", &sample_payment("ord-5", 500, PaymentStatus::Completed))
            .await
            .unwrap();

        let err = repo.delete_draft("ord-5").await.unwrap_err();
        assert!(matches!(err, DbError::StaleStatus { .. }));

        // rollback kept the items
        assert_eq!(repo.get_items("ord-5").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_refund_appends_negative_payment() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-6", 1750);
        repo.create_draft(&order, &[]).await.unwrap();
        repo.commit_payment("ord-6", &sample_payment("ord-6", 1750, PaymentStatus::Completed))
            .await
            .unwrap();

        let refund = sample_payment("ord-6", -1750, PaymentStatus::Refunded);
        repo.record_refund("ord-6", &refund).await.unwrap();

        let loaded = repo.require_order("ord-6").await.unwrap();
        assert_eq!(loaded.status, OrderStatus::Refunded);

        let payments = repo.get_payments("ord-6").await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[1].amount_cents, -1750);
        assert_eq!(payments[1].status, PaymentStatus::Refunded);

        assert_eq!(repo.total_paid("ord-6").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_refund_pending_order_fails() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-7", 500);
        repo.create_draft(&order, &[]).await.unwrap();

        let refund = sample_payment("ord-7", -500, PaymentStatus::Refunded);
        let err = repo.record_refund("ord-7", &refund).await.unwrap_err();
        assert!(matches!(err, DbError::StaleStatus { .. }));
    }

    #[tokio::test]
    async fn test_refund_twice_fails() {
        let db = test_db().await;
        let repo = db.orders();

        let order = sample_order("ord-8", 500);
        repo.create_draft(&order, &[]).await.unwrap();
        repo.commit_payment("ord-8", &sample_payment("ord-8", 500, PaymentStatus::Completed))
            .await
            .unwrap();
        repo.record_refund("ord-8", &sample_payment("ord-8", -500, PaymentStatus::Refunded))
            .await
            .unwrap();

        let err = repo
            .record_refund("ord-8", &sample_payment("ord-8", -500, PaymentStatus::Refunded))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::StaleStatus { .. }));
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let db = test_db().await;
        let repo = db.orders();

        repo.create_draft(&sample_order("ord-a", 100), &[]).await.unwrap();
        repo.create_draft(&sample_order("ord-b", 200), &[]).await.unwrap();
        repo.commit_payment("ord-b", &sample_payment("ord-b", 200, PaymentStatus::Completed))
            .await
            .unwrap();

        let pending = repo.list_by_status(OrderStatus::Pending, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "ord-a");

        let completed = repo
            .list_by_status(OrderStatus::Completed, 10)
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "ord-b");
    }
}
