//! Notification events pushed to kitchen dashboards.
//!
//! Events are a closed tagged union; both the server fan-out and the
//! dashboard client match on it exhaustively, so a new event kind is a
//! compile-time decision on every consuming side. Events are transient and
//! never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::order::KitchenStatus;
use crate::ticket::Ticket;

/// A notification event on the kitchen update channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KitchenEvent {
    /// Emitted once per new channel, informational.
    Connected {
        /// Human-readable greeting.
        message: String,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },
    /// Emitted on a fixed interval per channel to detect half-open
    /// connections.
    Heartbeat {
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },
    /// A new order was captured; carries the full ticket projection.
    NewOrder {
        /// The projected ticket.
        order: Ticket,
    },
    /// An order's kitchen status changed; carries the minimal patch only.
    StatusUpdate {
        /// Identifier of the affected order.
        #[serde(rename = "orderId")]
        order_id: String,
        /// The new status.
        status: KitchenStatus,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl KitchenEvent {
    /// Creates the per-channel greeting event.
    #[must_use]
    pub fn connected() -> Self {
        Self::Connected {
            message: "Connected to kitchen updates".to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a heartbeat event stamped now.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// Creates a new-order event carrying the given ticket.
    #[must_use]
    pub fn new_order(order: Ticket) -> Self {
        Self::NewOrder { order }
    }

    /// Creates a status-update event stamped now.
    #[must_use]
    pub fn status_update(order_id: impl Into<String>, status: KitchenStatus) -> Self {
        Self::StatusUpdate {
            order_id: order_id.into(),
            status,
            timestamp: Utc::now(),
        }
    }

    /// Encodes the event as a Server-Sent Events data frame
    /// (`data: <JSON>\n\n`).
    #[must_use]
    pub fn to_sse_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {json}\n\n"),
            // This union has no fallible fields; emit an SSE comment frame
            // rather than panicking if that ever changes.
            Err(_) => ": encode error\n\n".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Order, OrderItem};
    use chrono::TimeZone;
    use serde_json::Map;

    #[test]
    fn connected_frame_has_expected_shape() {
        let frame = KitchenEvent::connected().to_sse_frame();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));

        let json: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "connected");
        assert_eq!(json["message"], "Connected to kitchen updates");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn status_update_uses_camel_case_order_id() {
        let event = KitchenEvent::status_update("o1", KitchenStatus::InProgress);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status_update");
        assert_eq!(json["orderId"], "o1");
        assert_eq!(json["status"], "In Progress");
    }

    #[test]
    fn new_order_round_trips() {
        let mut order = Order {
            id: "o2".to_string(),
            subtotal: 12.5,
            tax: 1.25,
            discount: 0.0,
            total: 13.75,
            metadata: Map::new(),
            items: vec![OrderItem::new("Coffee", 1, 12.5)],
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            customer_name: None,
            customer_phone: None,
        };
        order.set_table_number(5);

        let event = KitchenEvent::new_order(Ticket::project(&order, 42));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: KitchenEvent = serde_json::from_str(&json).unwrap();

        let KitchenEvent::NewOrder { order: ticket } = parsed else {
            panic!("expected new_order event");
        };
        assert_eq!(ticket.order_id, "o2");
        assert_eq!(ticket.order_number, 42);
        assert_eq!(ticket.table_number, 5);
    }

    #[test]
    fn unknown_event_type_fails_to_decode() {
        let err = serde_json::from_str::<KitchenEvent>(r#"{"type":"table_cleared"}"#);
        assert!(err.is_err());
    }
}
