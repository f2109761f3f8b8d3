//! `OpenAPI` (3.1) specification generation for `kds-api`.
//!
//! The generated spec is served at `/openapi.json` and used to generate
//! external clients and to detect breaking API changes in CI.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// `OpenAPI` documentation for the KDS REST API (`/api/v1/*`).
#[derive(OpenApi)]
#[openapi(
    info(
        title = "KDS API",
        description = "Kitchen order capture and real-time notification API"
    ),
    paths(
        crate::routes::kitchen::list_orders,
        crate::routes::kitchen::update_status,
        crate::routes::kitchen::subscribe,
        crate::routes::orders::create_order,
        crate::routes::orders::get_order,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::routes::kitchen::KitchenOrdersResponse,
            crate::routes::kitchen::UpdateStatusRequest,
            crate::routes::kitchen::UpdateStatusResponse,
            crate::routes::orders::CreateOrderItem,
            crate::routes::orders::CreateOrderRequest,
            crate::routes::orders::CreateOrderResponse,
            kds_core::order::Order,
            kds_core::order::OrderItem,
            kds_core::order::KitchenStatus,
            kds_core::ticket::Ticket,
            kds_core::ticket::TicketItem,
        )
    ),
    tags(
        (name = "kitchen", description = "Kitchen dashboard operations"),
        (name = "orders", description = "Order capture operations"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Returns the generated `OpenAPI` spec.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
