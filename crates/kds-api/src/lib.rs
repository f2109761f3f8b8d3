//! # kds-api
//!
//! HTTP composition layer for the KDS kitchen order service.
//!
//! This crate provides the API surface for KDS, handling:
//!
//! - **Authentication**: JWT verification and debug-mode header auth
//! - **Order capture**: Validated order intake feeding the kitchen channel
//! - **Fan-out**: The broadcast registry and notification publisher
//! - **Streaming**: The long-lived Server-Sent Events subscription endpoint
//!
//! ## Design Principles
//!
//! This crate is a **thin composition layer**: domain types and store traits
//! live in `kds-core`. The broadcast registry is an explicitly instantiated
//! object owned by the composition root — never module-global state — so
//! tests can run isolated registries side by side.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                                - Health check
//! GET  /ready                                 - Readiness check
//! GET  /openapi.json                          - OpenAPI document
//! POST /api/v1/orders                         - Capture an order
//! GET  /api/v1/orders/{id}                    - Fetch an order
//! GET  /api/v1/kitchen/orders                 - List recent kitchen orders
//! PUT  /api/v1/kitchen/orders/{id}/status     - Update kitchen status
//! GET  /api/v1/kitchen/updates                - Subscribe to kitchen events (SSE)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use kds_api::server::Server;
//!
//! let server = Server::builder()
//!     .http_port(8080)
//!     .build();
//!
//! server.serve().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod broadcast;
pub mod config;
pub mod context;
pub mod error;
pub mod openapi;
pub mod publisher;
pub mod routes;
pub mod server;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::broadcast::BroadcastRegistry;
    pub use crate::config::Config;
    pub use crate::context::RequestContext;
    pub use crate::error::{ApiError, ApiResult};
    pub use crate::publisher::NotificationPublisher;
    pub use crate::server::Server;
}
