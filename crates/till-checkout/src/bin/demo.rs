//! # Checkout Demo
//!
//! Runs a full scripted sale against an in-memory database: ring up,
//! discount, hold and resume, checkout, and a refund.
//!
//! ## Usage
//! ```bash
//! cargo run -p till-checkout --bin demo
//! RUST_LOG=debug cargo run -p till-checkout --bin demo
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use till_checkout::{
    CatalogProduct, CollaboratorResult, CouponValidator, LoyaltyLedger, PaymentDetails,
    ProductCatalog, TillSession,
};
use till_core::PaymentMethod;
use till_db::{Database, DbConfig};

// =============================================================================
// In-memory collaborators
// =============================================================================

struct DemoCatalog {
    products: HashMap<&'static str, (&'static str, i64)>,
}

impl DemoCatalog {
    fn new() -> Self {
        let mut products = HashMap::new();
        products.insert("flat-white", ("Flat White", 450));
        products.insert("croissant", ("Croissant", 380));
        products.insert("blt", ("BLT Sandwich", 950));
        DemoCatalog { products }
    }
}

#[async_trait]
impl ProductCatalog for DemoCatalog {
    async fn product(&self, product_id: &str) -> CollaboratorResult<Option<CatalogProduct>> {
        Ok(self.products.get(product_id).map(|(name, cents)| {
            CatalogProduct {
                name: name.to_string(),
                unit_price_cents: *cents,
            }
        }))
    }
}

struct DemoLedger;

#[async_trait]
impl LoyaltyLedger for DemoLedger {
    async fn available_points(&self, _customer_id: &str) -> CollaboratorResult<i64> {
        Ok(1200)
    }

    async fn debit_points(&self, customer_id: &str, points: i64) -> CollaboratorResult<()> {
        println!("  (ledger) debited {} points from {}", points, customer_id);
        Ok(())
    }
}

struct DemoCoupons;

#[async_trait]
impl CouponValidator for DemoCoupons {
    async fn validate(&self, code: &str, _subtotal_cents: i64) -> CollaboratorResult<Option<i64>> {
        Ok(match code {
            "WELCOME2" => Some(200),
            _ => None,
        })
    }
}

// =============================================================================
// Scripted sale
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("Till checkout demo");
    println!("==================");

    let db = Database::new(DbConfig::in_memory()).await?;
    let mut session = TillSession::new(
        &db,
        Arc::new(DemoCatalog::new()),
        Arc::new(DemoLedger),
        Arc::new(DemoCoupons),
        "staff-demo",
    );
    session.set_customer(Some("cust-42".to_string()));

    let mut events = session.subscribe();

    // Ring up a ticket
    session.add_product("flat-white", 2).await?;
    session.add_product("croissant", 1).await?;
    println!("Ticket:   {}", session.totals().total);

    // Suspend it, serve a walk-up, come back
    let handle = session.hold_order()?;
    println!("Held as   {}", handle);

    session.add_product("blt", 1).await?;
    let id = session.begin_checkout().await?;
    session
        .confirm_payment(PaymentDetails::new(
            PaymentMethod::Cash,
            session.totals().total.cents(),
        ))
        .await?;
    println!("Walk-up   order {} committed", id);

    session.resume_order(handle)?;
    println!("Resumed   {}", session.totals().total);

    // Coupon and loyalty on the resumed ticket
    let discount = session.apply_coupon("WELCOME2").await?;
    println!("Coupon    -{}", discount);
    session.redeem_loyalty_points(300).await?;
    println!("Loyalty   -{}", session.totals().loyalty);
    println!("To pay    {}", session.totals().total);

    // Checkout
    let due = session.totals().total.cents();
    let order_id = session.begin_checkout().await?;
    session
        .confirm_payment(PaymentDetails::new(PaymentMethod::Card, due))
        .await?;
    println!("Order     {} committed", order_id);

    // Refund it
    session
        .refund(&order_id, due, Some("changed their mind".to_string()))
        .await?;
    println!("Refunded  {}", order_id);

    // Drain the events we caused
    while let Ok(event) = events.try_recv() {
        println!("Event:    {}", serde_json::to_string(&event)?);
    }

    db.close().await;
    Ok(())
}
