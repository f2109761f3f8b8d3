//! Notification publisher: translates order mutations into kitchen events.

use std::sync::Arc;

use chrono::Utc;

use kds_core::event::KitchenEvent;
use kds_core::order::KitchenStatus;
use kds_core::store::OrderStore;
use kds_core::ticket::Ticket;

use crate::broadcast::BroadcastRegistry;

/// Publishes kitchen events for order mutations.
///
/// Invoked by the order-mutating routes after a successful persist. Publish
/// failures never surface to the mutating request: a missed notification is
/// reconciled by the dashboard's periodic full refresh.
pub struct NotificationPublisher {
    store: Arc<dyn OrderStore>,
    registry: Arc<BroadcastRegistry>,
}

impl NotificationPublisher {
    /// Creates a publisher over the given store and registry.
    #[must_use]
    pub fn new(store: Arc<dyn OrderStore>, registry: Arc<BroadcastRegistry>) -> Self {
        Self { store, registry }
    }

    /// Publishes a status-update event for an order.
    ///
    /// The event is intentionally minimal (`orderId`, `status`, timestamp):
    /// subscribers already hold the order and only patch its status, so no
    /// re-fetch happens here.
    pub fn publish_status_change(&self, order_id: &str, status: KitchenStatus) {
        let delivered = self
            .registry
            .publish(&KitchenEvent::status_update(order_id, status));
        tracing::debug!(
            order_id = %order_id,
            status = %status,
            delivered,
            "published status update"
        );
    }

    /// Publishes a new-order event carrying the full ticket projection.
    ///
    /// The order is re-fetched so the event reflects its current snapshot.
    /// If the order cannot be found or the fetch fails, the publish is
    /// skipped and logged: the order remains independently visible via the
    /// authoritative listing.
    pub async fn publish_new_order(&self, order_id: &str) {
        let order = match self.store.get_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(order_id = %order_id, "skipping new-order notification: order not found");
                return;
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %order_id,
                    error = %err,
                    "skipping new-order notification: snapshot fetch failed"
                );
                return;
            }
        };

        let ticket = Ticket::project(&order, display_sequence());
        let delivered = self.registry.publish(&KitchenEvent::new_order(ticket));
        tracing::debug!(order_id = %order_id, delivered, "published new order");
    }
}

/// Display sequence for pushed orders: wall-clock milliseconds, unique enough
/// across concurrent publishes for a display-only number.
fn display_sequence() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}
