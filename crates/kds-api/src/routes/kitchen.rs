//! Kitchen dashboard routes.
//!
//! ## Routes
//!
//! - `GET /kitchen/orders` - List recent orders projected for the dashboard
//! - `PUT /kitchen/orders/{order_id}/status` - Update an order's kitchen status
//! - `GET /kitchen/updates` - Subscribe to real-time kitchen events (SSE)

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ulid::Ulid;
use utoipa::ToSchema;

use kds_core::event::KitchenEvent;
use kds_core::order::{KitchenStatus, Order};
use kds_core::ticket::Ticket;

use crate::broadcast::{BroadcastRegistry, ChannelId};
use crate::context::{
    extract_account_claim, token_from_query_or_header, verify_bearer_token, RequestContext,
};
use crate::error::ApiError;
use crate::server::AppState;

/// Kitchen order listing response.
#[derive(Debug, Serialize, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct KitchenOrdersResponse {
    /// Projected tickets, newest first.
    pub orders: Vec<Ticket>,
    /// Number of tickets returned.
    pub total: usize,
}

/// Request to update an order's kitchen status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// The new status (`Pending`, `In Progress`, or `Done`).
    pub status: String,
}

/// Response after a successful status update.
#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateStatusResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// The updated order snapshot.
    pub order: Order,
}

/// Query parameters accepted by the streaming endpoint.
#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    /// Bearer credential; takes precedence over the `Authorization` header.
    pub token: Option<String>,
}

/// Creates the authenticated kitchen routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/kitchen/orders", get(list_orders))
        .route("/kitchen/orders/:order_id/status", put(update_status))
}

/// Creates the self-authenticating streaming routes.
pub fn stream_routes() -> Router<Arc<AppState>> {
    Router::new().route("/kitchen/updates", get(subscribe))
}

/// List recent orders for the kitchen dashboard.
///
/// `GET /api/v1/kitchen/orders`
#[utoipa::path(
    get,
    path = "/api/v1/kitchen/orders",
    tag = "kitchen",
    responses(
        (status = 200, description = "Recent orders, newest first", body = KitchenOrdersResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorBody),
        (status = 500, description = "Internal error", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list_orders(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - state.config.order_window();
    let orders = state
        .store()
        .list_recent(since)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    // Positional numbering over the fetched window; pushed orders get a
    // wall-clock sequence instead (see the notification publisher).
    let tickets: Vec<Ticket> = orders
        .iter()
        .enumerate()
        .map(|(index, order)| Ticket::project(order, index as u64 + 1))
        .collect();

    tracing::debug!(total = tickets.len(), "listed kitchen orders");

    Ok(Json(KitchenOrdersResponse {
        total: tickets.len(),
        orders: tickets,
    }))
}

/// Update an order's kitchen status.
///
/// `PUT /api/v1/kitchen/orders/{order_id}/status`
#[utoipa::path(
    put,
    path = "/api/v1/kitchen/orders/{order_id}/status",
    tag = "kitchen",
    params(("order_id" = String, Path, description = "Order ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = UpdateStatusResponse),
        (status = 400, description = "Invalid status", body = crate::error::ApiErrorBody),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorBody),
        (status = 404, description = "Order not found", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn update_status(
    ctx: RequestContext,
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status: KitchenStatus = req
        .status
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid status").with_request_id(ctx.request_id.clone()))?;

    let order = state
        .store()
        .set_kitchen_status(&order_id, status)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?
        .ok_or_else(|| {
            ApiError::not_found("Order not found").with_request_id(ctx.request_id.clone())
        })?;

    tracing::info!(order_id = %order_id, status = %status, "kitchen status updated");
    state.publisher().publish_status_change(&order_id, status);

    Ok(Json(UpdateStatusResponse {
        message: "Order status updated successfully".to_string(),
        order,
    }))
}

/// Subscribe to real-time kitchen events.
///
/// `GET /api/v1/kitchen/updates`
///
/// The response is a long-lived `text/event-stream`; the first frame is
/// always `connected`, followed by periodic `heartbeat` frames and pushed
/// `new_order` / `status_update` frames.
#[utoipa::path(
    get,
    path = "/api/v1/kitchen/updates",
    tag = "kitchen",
    params(("token" = Option<String>, Query, description = "Bearer credential (query fallback for EventSource)")),
    responses(
        (status = 200, description = "Event stream opened"),
        (status = 401, description = "Unauthorized", body = crate::error::ApiErrorBody),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn subscribe(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubscribeQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    authenticate_subscriber(&state, query.token.as_deref(), &headers).await?;

    let registry = state.registry();
    let (id, rx) = registry.register();

    // Queue the greeting before the response body is handed to the client so
    // it is always the first frame on the wire.
    if registry.send_to(id, &KitchenEvent::connected()).is_err() {
        registry.unregister(id);
        return Err(ApiError::internal("subscriber channel closed during setup"));
    }

    let heartbeat = tokio::spawn(heartbeat_loop(
        id,
        Arc::clone(&registry),
        state.config.heartbeat_interval(),
    ));
    let guard = ChannelGuard {
        id,
        registry,
        heartbeat,
    };

    tracing::info!(channel = %id, "kitchen update subscription opened");

    // The guard travels with the stream: every closure path (client close,
    // server drop, failed heartbeat) converges on its Drop impl.
    let stream = futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let event = rx.recv().await?;
        Some((
            Ok::<Bytes, Infallible>(Bytes::from(event.to_sse_frame())),
            (rx, guard),
        ))
    });

    let mut response = Body::from_stream(stream).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    Ok(response)
}

/// Verifies the streaming credential and resolves it to a known account.
///
/// Hard precondition: any failure terminates the connection attempt with 401
/// and no channel is opened. The client owns reconnecting with a fresh
/// credential. Debug mode accepts unauthenticated subscriptions for local
/// development.
async fn authenticate_subscriber(
    state: &AppState,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    if state.config.debug {
        return Ok(());
    }

    let request_id = Ulid::new().to_string();
    let token = token_from_query_or_header(query_token, headers)
        .ok_or_else(|| ApiError::missing_auth().with_request_id(request_id.clone()))?;

    let claims = verify_bearer_token(&state.config.jwt, &token)
        .map_err(|err| err.with_request_id(request_id.clone()))?;
    let account = extract_account_claim(&claims, &state.config.jwt.user_claim, &request_id)?;

    match state.accounts().contains(&account).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!(account = %account, "subscription rejected: account not found");
            Err(ApiError::unauthorized("Account not found").with_request_id(request_id))
        }
        Err(err) => Err(ApiError::from(err).with_request_id(request_id)),
    }
}

/// Emits heartbeats on a fixed interval until the channel write fails.
///
/// A failed write unregisters the channel immediately instead of waiting for
/// the transport-level close, which some transports signal slowly.
async fn heartbeat_loop(id: ChannelId, registry: Arc<BroadcastRegistry>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    // The first tick completes immediately; the greeting frame already
    // covers connection liveness at open time.
    interval.tick().await;
    loop {
        interval.tick().await;
        if registry.send_to(id, &KitchenEvent::heartbeat()).is_err() {
            tracing::debug!(channel = %id, "heartbeat failed; closing channel");
            registry.unregister(id);
            break;
        }
    }
}

/// Ties channel cleanup to the response body's lifetime.
struct ChannelGuard {
    id: ChannelId,
    registry: Arc<BroadcastRegistry>,
    heartbeat: tokio::task::JoinHandle<()>,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.registry.unregister(self.id);
        tracing::debug!(channel = %self.id, "kitchen update subscription closed");
    }
}
