//! # Order Events
//!
//! Broadcast channel carrying completed-order and refund events to
//! downstream observers (receipt rendering, inventory decrement,
//! reporting).
//!
//! Emission never blocks the checkout path: a send with zero
//! subscribers is silently dropped, and a slow subscriber lags rather
//! than back-pressuring the till.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use till_core::OrderItem;

/// Default channel capacity. A subscriber further behind than this
/// starts seeing `RecvError::Lagged`.
const EVENT_CAPACITY: usize = 64;

// =============================================================================
// Event Types
// =============================================================================

/// A durable change to the order ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    /// An order reached `completed` with its payment.
    #[serde(rename_all = "camelCase")]
    Committed {
        order_id: String,
        total_cents: i64,
        items: Vec<OrderItem>,
    },

    /// A completed order was refunded.
    #[serde(rename_all = "camelCase")]
    Refunded {
        order_id: String,
        amount_cents: i64,
    },
}

impl OrderEvent {
    /// The order this event concerns.
    pub fn order_id(&self) -> &str {
        match self {
            OrderEvent::Committed { order_id, .. } => order_id,
            OrderEvent::Refunded { order_id, .. } => order_id,
        }
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Fan-out bus for [`OrderEvent`]s.
///
/// Cheap to clone; all clones publish into the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<OrderEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        EventBus { tx }
    }

    /// Subscribes to future events. Events emitted before the call
    /// are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event. Never fails: no subscribers just means
    /// nobody was listening.
    pub fn emit(&self, event: OrderEvent) {
        debug!(order_id = %event.order_id(), "Emitting order event");
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_with_no_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.emit(OrderEvent::Refunded {
            order_id: "ord-1".to_string(),
            amount_cents: 500,
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(OrderEvent::Committed {
            order_id: "ord-2".to_string(),
            total_cents: 1750,
            items: vec![],
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.order_id(), "ord-2");
        match event {
            OrderEvent::Committed { total_cents, .. } => assert_eq!(total_cents, 1750),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.emit(OrderEvent::Refunded {
            order_id: "early".to_string(),
            amount_cents: 100,
        });

        let mut rx = bus.subscribe();
        bus.emit(OrderEvent::Refunded {
            order_id: "late".to_string(),
            amount_cents: 200,
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.order_id(), "late");
    }
}
