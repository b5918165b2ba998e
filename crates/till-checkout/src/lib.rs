//! # Till Checkout
//!
//! The order lifecycle engine: checkout transactions, refunds, and the
//! till session facade.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         till-checkout                                   │
//! │                                                                         │
//! │  UI events ──▶ TillSession                                              │
//! │                 ├── Cart mutations (till-core, totals on every change) │
//! │                 ├── Hold / resume (till-core HoldStore)                │
//! │                 ├── CheckoutCoordinator                                │
//! │                 │     begin ──▶ draft order + items  (one write unit)  │
//! │                 │     confirm ─▶ payment + status flip (one write unit)│
//! │                 │     abort ──▶ draft deleted                          │
//! │                 ├── RefundProcessor ──▶ negative payment + status flip │
//! │                 └── EventBus ──▶ Committed / Refunded broadcasts       │
//! │                                                                         │
//! │  Collaborators (traits only): ProductCatalog, LoyaltyLedger,           │
//! │  CouponValidator                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Semantics
//! Money is never lost, double-charged, or left half-committed: every
//! multi-row write is one transaction in till-db, status transitions
//! are guarded in SQL, and every error is local to one ticket.

pub mod collaborators;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod refund;
pub mod session;

pub use collaborators::{
    CatalogProduct, CollaboratorError, CollaboratorResult, CouponValidator, LoyaltyLedger,
    ProductCatalog,
};
pub use coordinator::{CheckoutContext, CheckoutCoordinator, CheckoutToken, PaymentDetails};
pub use error::{CheckoutError, CheckoutResult, ErrorKind};
pub use events::{EventBus, OrderEvent};
pub use refund::RefundProcessor;
pub use session::TillSession;
