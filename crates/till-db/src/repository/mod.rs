//! # Repository Module
//!
//! Data access for the order lifecycle engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutCoordinator / RefundProcessor                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  OrderRepository ← owns the SQL and the transaction boundaries         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool                                                             │
//! │                                                                         │
//! │  Callers never see a connection or a transaction; they see atomic      │
//! │  write units that either fully happen or fully don't.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod order;
