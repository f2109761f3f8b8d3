//! Order records and the kitchen status cycle.
//!
//! An [`Order`] is the persisted source of truth owned by the order store.
//! Kitchen-facing state lives in the order's free-form metadata map under the
//! `kitchen_status` and `table_number` keys, mirroring how the capture side
//! stamps them at creation time.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Metadata key carrying the kitchen status of an order.
pub const KITCHEN_STATUS_KEY: &str = "kitchen_status";

/// Metadata key carrying the table number of an order.
pub const TABLE_NUMBER_KEY: &str = "table_number";

/// Sales tax rate applied to captured orders.
pub const TAX_RATE: f64 = 0.10;

/// Kitchen preparation status of an order.
///
/// The wire representation matches the dashboard strings exactly
/// (`"Pending"`, `"In Progress"`, `"Done"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum KitchenStatus {
    /// Order received, not yet started.
    Pending,
    /// Order is being prepared.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Order is complete and leaves the active view.
    Done,
}

impl KitchenStatus {
    /// Returns the next status in the manual-advance cycle.
    ///
    /// The cycle wraps: `Pending → In Progress → Done → Pending`.
    #[must_use]
    pub const fn advanced(self) -> Self {
        match self {
            Self::Pending => Self::InProgress,
            Self::InProgress => Self::Done,
            Self::Done => Self::Pending,
        }
    }

    /// Returns the wire string for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }
}

impl fmt::Display for KitchenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KitchenStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(Self::Pending),
            "In Progress" => Ok(Self::InProgress),
            "Done" => Ok(Self::Done),
            other => Err(Error::InvalidInput(format!(
                "invalid kitchen status: {other}"
            ))),
        }
    }
}

/// A single order line item.
///
/// Product names are denormalized at capture time so the kitchen view does
/// not depend on the product catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    /// Product name as sold.
    pub product_name: String,
    /// Quantity ordered (positive).
    pub quantity: u32,
    /// Unit price at capture time.
    pub unit_price: f64,
    /// Line total (`quantity * unit_price`).
    pub total_price: f64,
}

impl OrderItem {
    /// Creates a line item, deriving the line total.
    #[must_use]
    pub fn new(product_name: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_price: f64::from(quantity) * unit_price,
        }
    }
}

/// Monetary totals for a captured order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    /// Sum of line totals.
    pub subtotal: f64,
    /// Tax on the subtotal.
    pub tax: f64,
    /// Amount due (`subtotal + tax - discount`).
    pub total: f64,
}

/// Computes order totals from line items and a flat discount.
#[must_use]
pub fn compute_totals(items: &[OrderItem], discount: f64) -> OrderTotals {
    let subtotal: f64 = items
        .iter()
        .map(|item| f64::from(item.quantity) * item.unit_price)
        .sum();
    let tax = subtotal * TAX_RATE;
    OrderTotals {
        subtotal,
        tax,
        total: subtotal + tax - discount,
    }
}

/// A persisted order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Opaque unique identifier (ULID).
    pub id: String,
    /// Sum of line totals.
    pub subtotal: f64,
    /// Tax amount.
    pub tax: f64,
    /// Flat discount applied at capture.
    pub discount: f64,
    /// Amount due.
    pub total: f64,
    /// Free-form metadata map (`kitchen_status`, `table_number`, ...).
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
    /// Ordered line items.
    pub items: Vec<OrderItem>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional customer name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Optional customer phone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
}

impl Order {
    /// Returns the kitchen status recorded in metadata.
    ///
    /// Defaults to [`KitchenStatus::Pending`] when the key is absent or does
    /// not parse as a known status.
    #[must_use]
    pub fn kitchen_status(&self) -> KitchenStatus {
        self.metadata
            .get(KITCHEN_STATUS_KEY)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(KitchenStatus::Pending)
    }

    /// Returns the table number recorded in metadata, if any.
    #[must_use]
    pub fn table_number(&self) -> Option<u32> {
        self.metadata
            .get(TABLE_NUMBER_KEY)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    /// Records a kitchen status into the metadata map.
    pub fn set_kitchen_status(&mut self, status: KitchenStatus) {
        self.metadata.insert(
            KITCHEN_STATUS_KEY.to_string(),
            Value::String(status.as_str().to_string()),
        );
    }

    /// Records a table number into the metadata map.
    pub fn set_table_number(&mut self, table_number: u32) {
        self.metadata.insert(
            TABLE_NUMBER_KEY.to_string(),
            Value::Number(table_number.into()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with_metadata(metadata: Map<String, Value>) -> Order {
        Order {
            id: "01J0000000000000000000TEST".to_string(),
            subtotal: 10.0,
            tax: 1.0,
            discount: 0.0,
            total: 11.0,
            metadata,
            items: vec![OrderItem::new("Pad Thai", 1, 10.0)],
            created_at: Utc::now(),
            customer_name: None,
            customer_phone: None,
        }
    }

    #[test]
    fn status_cycle_wraps_back_to_pending() {
        assert_eq!(KitchenStatus::Pending.advanced(), KitchenStatus::InProgress);
        assert_eq!(KitchenStatus::InProgress.advanced(), KitchenStatus::Done);
        assert_eq!(KitchenStatus::Done.advanced(), KitchenStatus::Pending);
    }

    #[test]
    fn status_round_trips_through_wire_strings() {
        for status in [
            KitchenStatus::Pending,
            KitchenStatus::InProgress,
            KitchenStatus::Done,
        ] {
            assert_eq!(status.as_str().parse::<KitchenStatus>().unwrap(), status);
        }
    }

    #[test]
    fn status_serde_uses_display_strings() {
        let json = serde_json::to_string(&KitchenStatus::InProgress).unwrap();
        assert_eq!(json, "\"In Progress\"");
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert!("Cancelled".parse::<KitchenStatus>().is_err());
    }

    #[test]
    fn kitchen_status_defaults_to_pending() {
        let order = order_with_metadata(Map::new());
        assert_eq!(order.kitchen_status(), KitchenStatus::Pending);
    }

    #[test]
    fn kitchen_status_ignores_garbage_metadata() {
        let mut metadata = Map::new();
        metadata.insert(KITCHEN_STATUS_KEY.to_string(), Value::from(42));
        let order = order_with_metadata(metadata);
        assert_eq!(order.kitchen_status(), KitchenStatus::Pending);
    }

    #[test]
    fn set_kitchen_status_round_trips() {
        let mut order = order_with_metadata(Map::new());
        order.set_kitchen_status(KitchenStatus::InProgress);
        assert_eq!(order.kitchen_status(), KitchenStatus::InProgress);
    }

    #[test]
    fn totals_apply_tax_and_discount() {
        let items = vec![
            OrderItem::new("Spring Rolls", 2, 5.0),
            OrderItem::new("Green Curry", 1, 12.5),
        ];
        let totals = compute_totals(&items, 2.5);
        assert!((totals.subtotal - 22.5).abs() < f64::EPSILON);
        assert!((totals.tax - 2.25).abs() < f64::EPSILON);
        assert!((totals.total - 22.25).abs() < f64::EPSILON);
    }
}
