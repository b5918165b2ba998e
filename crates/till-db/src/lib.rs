//! # till-db: SQLite persistence for the order lifecycle engine
//!
//! Connection pool, embedded migrations and the order repository.
//!
//! ## Atomicity Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every write unit exposed by OrderRepository is ONE transaction:        │
//! │                                                                         │
//! │    create_draft    order + all items            all or nothing          │
//! │    delete_draft    items + pending order        all or nothing          │
//! │    commit_payment  payment + status flip        all or nothing          │
//! │    record_refund   refund row + status flip     all or nothing          │
//! │                                                                         │
//! │  There is no partially-committed order state reachable through this    │
//! │  crate's API.                                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::order::OrderRepository;
