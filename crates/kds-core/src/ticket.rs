//! Kitchen ticket projection.
//!
//! A [`Ticket`] is the display-oriented read projection of an [`Order`]
//! consumed by kitchen dashboards. It is rebuilt fully on each authoritative
//! fetch and patched incrementally by notification events; it has no
//! lifecycle beyond the dashboard session.

use chrono::{DateTime, NaiveTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::order::{KitchenStatus, Order};

/// Format used for the `time_placed` display string (e.g. `10:00 AM`).
const TIME_PLACED_FORMAT: &str = "%-I:%M %p";

/// A single item line on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TicketItem {
    /// Product name.
    pub name: String,
    /// Quantity ordered.
    pub quantity: u32,
}

/// The kitchen-view projection of an order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Display sequence number (positional for list fetches, wall-clock
    /// derived for pushed orders).
    pub order_number: u64,
    /// Order identifier.
    pub order_id: String,
    /// Table number for display.
    pub table_number: u32,
    /// Formatted placed-time string (12-hour clock).
    pub time_placed: String,
    /// Item name/quantity pairs.
    pub items: Vec<TicketItem>,
    /// Current kitchen status.
    pub status: KitchenStatus,
    /// Optional customer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Optional customer phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    /// Amount due.
    pub total: f64,
}

impl Ticket {
    /// Projects an order into its kitchen view with the given display
    /// sequence number.
    ///
    /// When the order metadata carries no table number, a pseudo-random
    /// placeholder in `[1, 20]` is substituted. The placeholder is cosmetic:
    /// it keeps the ticket renderable and is never written back to the order.
    #[must_use]
    pub fn project(order: &Order, sequence: u64) -> Self {
        Self {
            order_number: sequence,
            order_id: order.id.clone(),
            table_number: order.table_number().unwrap_or_else(fallback_table_number),
            time_placed: format_time_placed(order.created_at),
            items: order
                .items
                .iter()
                .map(|item| TicketItem {
                    name: item.product_name.clone(),
                    quantity: item.quantity,
                })
                .collect(),
            status: order.kitchen_status(),
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            total: order.total,
        }
    }
}

/// Formats a timestamp as the ticket's placed-time display string.
#[must_use]
pub fn format_time_placed(at: DateTime<Utc>) -> String {
    at.format(TIME_PLACED_FORMAT).to_string()
}

/// Parses a placed-time display string back into a time of day.
///
/// Returns `None` for strings that do not match the display format. Used by
/// dashboards to order tickets; unparseable strings sort last.
#[must_use]
pub fn parse_time_placed(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%I:%M %p").ok()
}

/// Picks a placeholder table number in `[1, 20]`.
fn fallback_table_number() -> u32 {
    rand::thread_rng().gen_range(1..=20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderItem;
    use chrono::TimeZone;
    use serde_json::Map;

    fn sample_order() -> Order {
        let mut order = Order {
            id: "01J0000000000000000000TICK".to_string(),
            subtotal: 25.0,
            tax: 2.5,
            discount: 0.0,
            total: 27.5,
            metadata: Map::new(),
            items: vec![
                OrderItem::new("Tom Yum", 1, 15.0),
                OrderItem::new("Jasmine Rice", 2, 5.0),
            ],
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
            customer_name: Some("Alex".to_string()),
            customer_phone: None,
        };
        order.set_table_number(7);
        order
    }

    #[test]
    fn projection_carries_order_fields() {
        let order = sample_order();
        let ticket = Ticket::project(&order, 3);

        assert_eq!(ticket.order_number, 3);
        assert_eq!(ticket.order_id, order.id);
        assert_eq!(ticket.table_number, 7);
        assert_eq!(ticket.time_placed, "10:00 AM");
        assert_eq!(ticket.status, KitchenStatus::Pending);
        assert_eq!(ticket.items.len(), 2);
        assert_eq!(ticket.items[1].name, "Jasmine Rice");
        assert_eq!(ticket.items[1].quantity, 2);
        assert!((ticket.total - 27.5).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_table_number_falls_back_into_range() {
        let mut order = sample_order();
        order.metadata.clear();
        for _ in 0..32 {
            let ticket = Ticket::project(&order, 1);
            assert!((1..=20).contains(&ticket.table_number));
        }
    }

    #[test]
    fn ticket_serializes_camel_case() {
        let ticket = Ticket::project(&sample_order(), 1);
        let json = serde_json::to_value(&ticket).unwrap();
        assert!(json.get("orderNumber").is_some());
        assert!(json.get("orderId").is_some());
        assert!(json.get("tableNumber").is_some());
        assert!(json.get("timePlaced").is_some());
        assert_eq!(json["customerName"], "Alex");
        // Absent optionals are omitted, not null.
        assert!(json.get("customerPhone").is_none());
    }

    #[test]
    fn time_placed_round_trips() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 21, 5, 0).unwrap();
        let formatted = format_time_placed(at);
        assert_eq!(formatted, "9:05 PM");
        let parsed = parse_time_placed(&formatted).unwrap();
        assert_eq!(parsed, NaiveTime::from_hms_opt(21, 5, 0).unwrap());
    }

    #[test]
    fn unparseable_time_placed_is_none() {
        assert!(parse_time_placed("noon-ish").is_none());
    }
}
