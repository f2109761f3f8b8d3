//! Order capture routes.
//!
//! ## Routes
//!
//! - `POST /orders` - Capture a new order (feeds the kitchen channel)
//! - `GET  /orders/{id}` - Fetch one order

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use ulid::Ulid;
use utoipa::ToSchema;

use kds_core::order::{compute_totals, Order, OrderItem};

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::server::AppState;

/// A line item in an order capture request.
///
/// Prices and names are denormalized at capture time; the kitchen channel
/// never consults the product catalog.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    /// Product name as sold.
    pub name: String,
    /// Quantity ordered (positive).
    pub quantity: u32,
    /// Unit price.
    pub unit_price: f64,
}

/// Request to capture a new order.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Line items (non-empty).
    pub items: Vec<CreateOrderItem>,
    /// Flat discount applied to the total.
    #[serde(default)]
    pub discount: f64,
    /// Table the order was placed from.
    #[serde(default)]
    pub table_number: Option<u32>,
    /// Optional customer name.
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Optional customer phone.
    #[serde(default)]
    pub customer_phone: Option<String>,
}

/// Response after capturing an order.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateOrderResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The stored order.
    pub order: Order,
}

/// Creates order routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
}

/// Capture a new order.
///
/// `POST /api/v1/orders`
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order captured", body = CreateOrderResponse),
        (status = 400, description = "Invalid order", body = crate::error::ApiErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorBody),
        (status = 500, description = "Internal error", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn create_order(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_capture(&req).map_err(|err| err.with_request_id(ctx.request_id.clone()))?;

    let items: Vec<OrderItem> = req
        .items
        .iter()
        .map(|item| OrderItem::new(item.name.clone(), item.quantity, item.unit_price))
        .collect();
    let totals = compute_totals(&items, req.discount);

    let mut order = Order {
        id: Ulid::new().to_string(),
        subtotal: totals.subtotal,
        tax: totals.tax,
        discount: req.discount,
        total: totals.total,
        metadata: Map::new(),
        items,
        created_at: Utc::now(),
        customer_name: req.customer_name,
        customer_phone: req.customer_phone,
    };
    if let Some(table_number) = req.table_number {
        order.set_table_number(table_number);
    }

    let order_id = order.id.clone();
    state
        .store()
        .insert_order(order.clone())
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    tracing::info!(
        order_id = %order_id,
        total = order.total,
        items = order.items.len(),
        "order captured"
    );

    // Fan-out happens after the persist so subscribers only ever see orders
    // the authoritative listing can also return.
    state.publisher().publish_new_order(&order_id).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            message: "Order created successfully".to_string(),
            order,
        }),
    ))
}

/// Fetch one order.
///
/// `GET /api/v1/orders/{id}`
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    tag = "orders",
    params(("id" = String, Path, description = "Order ID")),
    responses(
        (status = 200, description = "The order", body = Order),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn get_order(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let order = state
        .store()
        .get_order(&id)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?
        .ok_or_else(|| {
            ApiError::not_found("Order not found").with_request_id(ctx.request_id.clone())
        })?;

    Ok(Json(order))
}

fn validate_capture(req: &CreateOrderRequest) -> Result<(), ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("order must contain at least one item"));
    }
    for item in &req.items {
        if item.name.trim().is_empty() {
            return Err(ApiError::bad_request("item name cannot be empty"));
        }
        if item.quantity == 0 {
            return Err(ApiError::bad_request("item quantity must be positive"));
        }
        if !item.unit_price.is_finite() || item.unit_price < 0.0 {
            return Err(ApiError::bad_request("item unit price must be non-negative"));
        }
    }
    if !req.discount.is_finite() || req.discount < 0.0 {
        return Err(ApiError::bad_request("discount must be non-negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with_items(items: Vec<CreateOrderItem>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            discount: 0.0,
            table_number: None,
            customer_name: None,
            customer_phone: None,
        }
    }

    #[test]
    fn empty_order_is_rejected() {
        let err = validate_capture(&request_with_items(Vec::new())).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let req = request_with_items(vec![CreateOrderItem {
            name: "Coffee".to_string(),
            quantity: 0,
            unit_price: 3.0,
        }]);
        assert!(validate_capture(&req).is_err());
    }

    #[test]
    fn negative_discount_is_rejected() {
        let mut req = request_with_items(vec![CreateOrderItem {
            name: "Coffee".to_string(),
            quantity: 1,
            unit_price: 3.0,
        }]);
        req.discount = -1.0;
        assert!(validate_capture(&req).is_err());
    }

    #[test]
    fn well_formed_capture_passes_validation() {
        let req = request_with_items(vec![CreateOrderItem {
            name: "Coffee".to_string(),
            quantity: 2,
            unit_price: 3.0,
        }]);
        assert!(validate_capture(&req).is_ok());
    }
}
