//! HTTP route handlers.

pub mod kitchen;
pub mod orders;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/v1` routes (authenticated via middleware).
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new().merge(kitchen::routes()).merge(orders::routes())
}

/// `/api/v1` streaming routes (self-authenticating).
///
/// Mounted outside the auth middleware: the streaming endpoint extracts and
/// verifies its own credential because browser `EventSource` clients can only
/// pass it as a query parameter.
pub fn api_stream_routes() -> Router<Arc<AppState>> {
    kitchen::stream_routes()
}
