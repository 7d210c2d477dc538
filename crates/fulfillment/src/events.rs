//! Observer notifications for fulfillment state changes.
//!
//! State changes are published on a broadcast channel; presentation layers
//! subscribe instead of watching a shared mutable store. Publishing never
//! blocks and never fails - with no subscribers the event is simply dropped.

use chrono::NaiveDate;
use tokio::sync::broadcast;

use restock_core::{ClientId, OrderId, OrderStatus, OrderSubStatus};

/// Default capacity of the broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A state change worth notifying observers about.
#[derive(Debug, Clone)]
pub enum FulfillmentEvent {
    /// An order moved through the pipeline without stock effect.
    OrderTransitioned {
        /// Order that moved.
        order_id: OrderId,
        /// New status.
        status: OrderStatus,
        /// New sub-status.
        sub_status: OrderSubStatus,
    },
    /// A delivery was confirmed and the order rescheduled.
    DeliveryConfirmed {
        /// Order confirmed.
        order_id: OrderId,
        /// Client delivered to.
        client_id: ClientId,
        /// The newly computed reposition date.
        next_date: NaiveDate,
    },
    /// A return was confirmed and the order rescheduled.
    ReturnConfirmed {
        /// Order confirmed.
        order_id: OrderId,
        /// Client the return was for.
        client_id: ClientId,
        /// The newly computed reposition date.
        next_date: NaiveDate,
    },
    /// Standard allocation fell back to the even distribution because the
    /// configured mix was unusable. A configuration owner should be alerted.
    ConfigurationDegraded {
        /// Why the fallback was taken.
        reason: String,
    },
}

/// Broadcast bus for fulfillment events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FulfillmentEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FulfillmentEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: FulfillmentEvent) {
        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(FulfillmentEvent::ConfigurationDegraded {
            reason: "percentages sum to 97".to_string(),
        });

        match rx.recv().await.unwrap() {
            FulfillmentEvent::ConfigurationDegraded { reason } => {
                assert!(reason.contains("97"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::default();
        bus.publish(FulfillmentEvent::OrderTransitioned {
            order_id: OrderId::new(1),
            status: OrderStatus::Scheduled,
            sub_status: OrderSubStatus::Picked,
        });
    }
}
