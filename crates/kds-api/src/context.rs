//! Request context extraction and authentication middleware.
//!
//! In debug mode, the account is supplied via an `X-User-Id` header for local
//! development. In production mode, the account is extracted from a verified
//! JWT (claim name configurable via `KDS_JWT_USER_CLAIM`, default `sub`).
//!
//! The streaming endpoint authenticates itself through
//! [`token_from_query_or_header`] and [`verify_bearer_token`], because the
//! browser `EventSource` API cannot attach custom headers and must fall back
//! to a `token` query parameter.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::header::HeaderName;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use ulid::Ulid;

use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::server::AppState;

/// Header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request context derived from authentication and headers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Authenticated account identifier (from JWT or debug header).
    pub account_id: Option<String>,
    /// Request ID for tracing/correlation.
    pub request_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(existing) = parts.extensions.get::<Self>() {
            return Ok(existing.clone());
        }

        let headers = &parts.headers;
        let request_id =
            header_string(headers, "X-Request-Id").unwrap_or_else(|| Ulid::new().to_string());

        let account_id = if state.config.debug {
            header_string(headers, "X-User-Id")
        } else {
            let token = bearer_token(headers)
                .ok_or_else(|| ApiError::missing_auth().with_request_id(request_id.clone()))?;
            let claims = verify_bearer_token(&state.config.jwt, &token)
                .map_err(|err| err.with_request_id(request_id.clone()))?;
            Some(extract_account_claim(
                &claims,
                &state.config.jwt.user_claim,
                &request_id,
            )?)
        };

        let ctx = Self {
            account_id,
            request_id,
        };

        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

/// Verifies a bearer token's signature and standard claims.
///
/// Enforces expiry always, plus issuer/audience when configured. Returns the
/// decoded claims object.
///
/// # Errors
///
/// Returns `ApiError::invalid_token` for any verification failure, or an
/// internal error when the server has no usable key material.
pub fn verify_bearer_token(jwt: &JwtConfig, token: &str) -> Result<Value, ApiError> {
    let (decoding_key, algorithm) = jwt_decoding_key(jwt)?;
    let mut validation = Validation::new(algorithm);
    validation.validate_nbf = true;

    if let Some(iss) = jwt.issuer.as_deref() {
        validation.set_issuer(&[iss]);
    }
    if let Some(aud) = jwt.audience.as_deref() {
        validation.set_audience(&[aud]);
    }

    jsonwebtoken::decode::<Value>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| ApiError::invalid_token())
}

/// Extracts the account identifier claim from a decoded claims object.
///
/// # Errors
///
/// Returns `ApiError::invalid_token` when the claim is absent or empty.
pub fn extract_account_claim(
    claims: &Value,
    claim: &str,
    request_id: &str,
) -> Result<String, ApiError> {
    claims
        .as_object()
        .and_then(|obj| obj.get(claim))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::invalid_token().with_request_id(request_id.to_string()))
}

fn jwt_decoding_key(jwt: &JwtConfig) -> Result<(DecodingKey, Algorithm), ApiError> {
    match (jwt.hs256_secret.as_deref(), jwt.rs256_public_key_pem.as_deref()) {
        (Some(secret), None) => Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)),
        (None, Some(pem)) => DecodingKey::from_rsa_pem(pem.as_bytes())
            .map(|key| (key, Algorithm::RS256))
            .map_err(|e| ApiError::internal(format!("failed to parse jwt public key: {e}"))),
        (Some(_), Some(_)) => Err(ApiError::internal(
            "jwt.hs256_secret and jwt.rs256_public_key_pem are mutually exclusive",
        )),
        (None, None) => Err(ApiError::internal(
            "jwt.hs256_secret or jwt.rs256_public_key_pem is required when debug=false",
        )),
    }
}

/// Returns the bearer credential for a streaming request.
///
/// The `token` query parameter takes precedence over the `Authorization`
/// header; the browser streaming API cannot set custom headers.
#[must_use]
pub fn token_from_query_or_header(
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Option<String> {
    query_token
        .map(str::to_string)
        .or_else(|| bearer_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let raw = header_string(headers, "Authorization")?;
    let token = raw.strip_prefix("Bearer ")?;
    Some(token.to_string())
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}

/// Authentication middleware.
///
/// Runs before route handlers and injects a verified [`RequestContext`] into
/// request extensions, echoing the request ID on the response.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    let ctx = match RequestContext::from_request_parts(&mut parts, &state).await {
        Ok(ctx) => ctx,
        Err(err) => return err.into_response(),
    };

    let mut req = Request::from_parts(parts, body);
    let request_id = ctx.request_id.clone();
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hs256_config(secret: &str) -> JwtConfig {
        JwtConfig {
            hs256_secret: Some(secret.to_string()),
            ..JwtConfig::default()
        }
    }

    fn mint_token(secret: &str, claims: &Value) -> String {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            claims,
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> u64 {
        use std::time::{Duration, SystemTime, UNIX_EPOCH};
        (SystemTime::now() + Duration::from_secs(3600))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn valid_token_yields_claims() {
        let config = hs256_config("secret");
        let token = mint_token(
            "secret",
            &serde_json::json!({ "sub": "alice", "exp": future_exp() }),
        );

        let claims = verify_bearer_token(&config, &token).unwrap();
        let account = extract_account_claim(&claims, "sub", "req-1").unwrap();
        assert_eq!(account, "alice");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = hs256_config("secret");
        let token = mint_token(
            "other-secret",
            &serde_json::json!({ "sub": "alice", "exp": future_exp() }),
        );
        assert!(verify_bearer_token(&config, &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = hs256_config("secret");
        let token = mint_token("secret", &serde_json::json!({ "sub": "alice", "exp": 1000 }));
        assert!(verify_bearer_token(&config, &token).is_err());
    }

    #[test]
    fn missing_account_claim_is_rejected() {
        let config = hs256_config("secret");
        let token = mint_token("secret", &serde_json::json!({ "exp": future_exp() }));
        let claims = verify_bearer_token(&config, &token).unwrap();
        assert!(extract_account_claim(&claims, "sub", "req-1").is_err());
    }

    #[test]
    fn query_token_takes_precedence_over_header() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-header"));

        let token = token_from_query_or_header(Some("from-query"), &headers);
        assert_eq!(token.as_deref(), Some("from-query"));

        let token = token_from_query_or_header(None, &headers);
        assert_eq!(token.as_deref(), Some("from-header"));

        let token = token_from_query_or_header(None, &HeaderMap::new());
        assert!(token.is_none());
    }
}
