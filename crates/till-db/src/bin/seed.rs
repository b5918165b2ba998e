//! # Seed Data Generator
//!
//! Populates the database with sample completed orders for development.
//!
//! ## Usage
//! ```bash
//! # Generate 50 orders (default)
//! cargo run -p till-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p till-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! ## Generated Orders
//! Each order gets 1-4 line items drawn from a small menu, a 10% tax,
//! and a committed payment, so receipt and refund screens have data to
//! work against immediately.

use chrono::Utc;
use std::env;
use till_core::{
    Money, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentStatus, TaxRate,
};
use till_db::{Database, DbConfig};
use uuid::Uuid;

/// Menu items as (name, unit price in cents)
const MENU: &[(&str, i64)] = &[
    ("Flat White", 450),
    ("Long Black", 400),
    ("Cappuccino", 475),
    ("Chai Latte", 500),
    ("Croissant", 380),
    ("Banana Bread", 550),
    ("BLT Sandwich", 950),
    ("Caesar Salad", 1250),
    ("Margherita Pizza", 1600),
    ("Soup of the Day", 850),
    ("Sparkling Water", 350),
    ("Orange Juice", 450),
];

const METHODS: &[PaymentMethod] = &[
    PaymentMethod::Cash,
    PaymentMethod::Card,
    PaymentMethod::Digital,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of orders to generate (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./till_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let repo = db.orders();

    let existing = repo
        .list_by_status(OrderStatus::Completed, 1)
        .await?
        .len();
    if existing > 0 {
        println!("⚠ Database already has completed orders");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating orders...");

    let tax_rate = TaxRate::default();
    let start = std::time::Instant::now();

    for n in 0..count {
        let order_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        // Deterministic pseudo-variety without pulling in a rand crate
        let item_count = 1 + (n * 7) % 4;
        let mut items = Vec::with_capacity(item_count);
        let mut subtotal = Money::zero();

        for k in 0..item_count {
            let (name, cents) = MENU[(n * 5 + k * 3) % MENU.len()];
            let quantity = 1 + ((n + k) % 3) as i64;
            let line_total = Money::from_cents(cents).times(quantity);
            subtotal = subtotal + line_total;

            items.push(OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                product_id: Uuid::new_v4().to_string(),
                name_snapshot: name.to_string(),
                unit_price_cents: cents,
                quantity,
                total_cents: line_total.cents(),
                created_at: now,
            });
        }

        let tax = subtotal.tax(tax_rate);
        let total = subtotal + tax;

        let order = Order {
            id: order_id.clone(),
            status: OrderStatus::Pending,
            subtotal_cents: subtotal.cents(),
            tax_cents: tax.cents(),
            discount_cents: 0,
            loyalty_cents: 0,
            total_cents: total.cents(),
            staff_id: "seed-staff".to_string(),
            customer_id: None,
            table_number: Some(format!("{}", 1 + n % 12)),
            payment_method: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };

        repo.create_draft(&order, &items).await?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.clone(),
            method: METHODS[n % METHODS.len()],
            status: PaymentStatus::Completed,
            amount_cents: total.cents(),
            note: None,
            created_at: now,
        };

        repo.commit_payment(&order_id, &payment).await?;
    }

    let elapsed = start.elapsed();

    println!();
    println!("✓ Generated {} completed orders in {:.2}s", count, elapsed.as_secs_f64());
    println!();
    println!("Done! Run the demo against {} to see them.", db_path);

    Ok(())
}
