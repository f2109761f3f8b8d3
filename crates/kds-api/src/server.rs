//! API server implementation.
//!
//! Provides health, ready, and API endpoints for the KDS kitchen service,
//! and owns the broadcast registry for the process lifetime.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use kds_core::store::{AccountDirectory, MemoryAccountDirectory, MemoryOrderStore, OrderStore};
use kds_core::{Error, Result};

use crate::broadcast::BroadcastRegistry;
use crate::config::{Config, CorsConfig};
use crate::publisher::NotificationPublisher;

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Order persistence.
    store: Arc<dyn OrderStore>,
    /// Known accounts, consulted by the streaming endpoint.
    accounts: Arc<dyn AccountDirectory>,
    /// Live subscriber channels (process lifetime).
    registry: Arc<BroadcastRegistry>,
    /// Mutation-to-event translator.
    publisher: Arc<NotificationPublisher>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &"<OrderStore>")
            .field("accounts", &"<AccountDirectory>")
            .field("channels", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates new application state over the given store and directory.
    #[must_use]
    pub fn new(
        config: Config,
        store: Arc<dyn OrderStore>,
        accounts: Arc<dyn AccountDirectory>,
    ) -> Self {
        let registry = Arc::new(BroadcastRegistry::new());
        let publisher = Arc::new(NotificationPublisher::new(
            Arc::clone(&store),
            Arc::clone(&registry),
        ));
        Self {
            config,
            store,
            accounts,
            registry,
            publisher,
        }
    }

    /// Returns the order store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn OrderStore> {
        Arc::clone(&self.store)
    }

    /// Returns the account directory.
    #[must_use]
    pub fn accounts(&self) -> Arc<dyn AccountDirectory> {
        Arc::clone(&self.accounts)
    }

    /// Returns the broadcast registry.
    #[must_use]
    pub fn registry(&self) -> Arc<BroadcastRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns the notification publisher.
    #[must_use]
    pub fn publisher(&self) -> Arc<NotificationPublisher> {
        Arc::clone(&self.publisher)
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check that
/// doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service is ready to accept requests. Probes the
/// order store with a cheap lookup to validate the persistence path.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store().get_order("__kds/ready-check").await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("order store check failed: {e}")),
            }),
        ),
    }
}

/// Serves the generated `OpenAPI` document.
async fn openapi_json() -> impl IntoResponse {
    Json(crate::openapi::openapi())
}

// ============================================================================
// Server
// ============================================================================

/// The KDS API server.
pub struct Server {
    config: Config,
    store: Arc<dyn OrderStore>,
    accounts: Arc<dyn AccountDirectory>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("store", &"<OrderStore>")
            .field("accounts", &"<AccountDirectory>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with the given configuration.
    ///
    /// Defaults to in-memory stores; use the builder for production wiring.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemoryOrderStore::new()),
            accounts: Arc::new(MemoryAccountDirectory::new()),
        }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState::new(
            self.config.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.accounts),
        ));

        let cors = self.build_cors_layer();
        let auth_layer =
            middleware::from_fn_with_state(Arc::clone(&state), crate::context::auth_middleware);

        Router::new()
            // Health, ready, and spec endpoints (no auth required)
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/openapi.json", get(openapi_json))
            // API routes (auth via RequestContext extractor)
            .nest("/api/v1", crate::routes::api_v1_routes().layer(auth_layer))
            // Streaming routes authenticate themselves (query-parameter
            // credential fallback for browser EventSource clients)
            .nest("/api/v1", crate::routes::api_stream_routes())
            // Middleware (order matters): trace outermost, then CORS.
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            // Shared state
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::CACHE_CONTROL,
                header::HeaderName::from_static("x-user-id"),
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the server cannot
    /// bind to the port.
    pub async fn serve(&self) -> Result<()> {
        self.validate_config()?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(http_port = self.config.http_port, "Starting KDS API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to test the routes
    /// without actually binding to a port.
    #[doc(hidden)]
    #[must_use]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }

    fn validate_config(&self) -> Result<()> {
        // Enforce "no wildcard in production" for CORS.
        if !self.config.debug
            && self
                .config
                .cors
                .allowed_origins
                .iter()
                .any(|origin| origin == "*")
        {
            return Err(Error::InvalidInput(
                "cors.allowed_origins cannot include '*' when debug=false".to_string(),
            ));
        }

        // Require JWT configuration in production mode.
        if !self.config.debug {
            let has_hs256_secret = self.config.jwt.hs256_secret.is_some();
            let has_rs256_public_key = self.config.jwt.rs256_public_key_pem.is_some();

            if !has_hs256_secret && !has_rs256_public_key {
                return Err(Error::InvalidInput(
                    "jwt.hs256_secret or jwt.rs256_public_key_pem is required when debug=false"
                        .to_string(),
                ));
            }
            if has_hs256_secret && has_rs256_public_key {
                return Err(Error::InvalidInput(
                    "jwt.hs256_secret and jwt.rs256_public_key_pem are mutually exclusive"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Builder for constructing a server.
pub struct ServerBuilder {
    config: Config,
    store: Arc<dyn OrderStore>,
    accounts: Arc<dyn AccountDirectory>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("store", &"<OrderStore>")
            .field("accounts", &"<AccountDirectory>")
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            store: Arc::new(MemoryOrderStore::new()),
            accounts: Arc::new(MemoryAccountDirectory::new()),
        }
    }
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entire configuration.
    ///
    /// Useful when the config was loaded from the environment; the other
    /// builder methods tweak individual fields on top of it.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    ///
    /// See `Config::debug` for behavior changes (header-based auth vs
    /// Authorization).
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the JWT HS256 secret used for bearer token verification.
    ///
    /// Required when `debug` is false.
    #[must_use]
    pub fn jwt_hs256_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt.hs256_secret = Some(secret.into());
        self
    }

    /// Sets the per-channel heartbeat interval in seconds.
    #[must_use]
    pub fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.config.heartbeat_interval_secs = secs;
        self
    }

    /// Sets the order store used by request handlers.
    ///
    /// By default, the server uses an in-memory store intended only for
    /// tests/dev.
    #[must_use]
    pub fn order_store(mut self, store: Arc<dyn OrderStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the account directory consulted by the streaming endpoint.
    #[must_use]
    pub fn account_directory(mut self, accounts: Arc<dyn AccountDirectory>) -> Self {
        self.accounts = accounts;
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            store: self.store,
            accounts: self.accounts,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() -> Result<()> {
        let server = ServerBuilder::new().build();
        let router = server.test_router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let health: HealthResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(health.status, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_endpoint() -> Result<()> {
        let server = ServerBuilder::new().build();
        let router = server.test_router();

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let ready: ReadyResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(ready.ready);
        Ok(())
    }

    #[tokio::test]
    async fn test_openapi_endpoint() -> Result<()> {
        let server = ServerBuilder::new().build();
        let router = server.test_router();

        let request = Request::builder()
            .uri("/openapi.json")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        let spec: serde_json::Value = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(spec.get("paths").is_some());
        Ok(())
    }

    #[test]
    fn validate_config_rejects_prod_without_jwt() {
        let server = ServerBuilder::new().debug(false).build();
        assert!(server.validate_config().is_err());
    }

    #[test]
    fn validate_config_rejects_prod_cors_wildcard() {
        let mut config = Config {
            debug: false,
            ..Config::default()
        };
        config.jwt.hs256_secret = Some("secret".to_string());
        config.cors.allowed_origins = vec!["*".to_string()];

        let server = Server::new(config);
        assert!(server.validate_config().is_err());
    }

    #[test]
    fn validate_config_accepts_prod_with_secret() {
        let mut config = Config {
            debug: false,
            ..Config::default()
        };
        config.jwt.hs256_secret = Some("secret".to_string());

        let server = Server::new(config);
        assert!(server.validate_config().is_ok());
    }
}
