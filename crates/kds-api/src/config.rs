//! Server configuration.

use serde::{Deserialize, Serialize};

use kds_core::{Error, Result};

const MIN_HEARTBEAT_INTERVAL_SECS: u64 = 1;
const MAX_HEARTBEAT_INTERVAL_SECS: u64 = 300;

fn default_order_window_hours() -> u64 {
    24
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

/// Configuration for the KDS API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled:
    /// - `RequestContext` is derived from an optional `X-User-Id` header
    /// - the streaming endpoint accepts unauthenticated subscriptions
    ///
    /// When disabled:
    /// - `Authorization` is required (JWT claim extraction + signature
    ///   verification) and subscribers must resolve to a known account
    pub debug: bool,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// JWT authentication configuration (used when `debug` is false).
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Size of the kitchen order listing window, in hours.
    #[serde(default = "default_order_window_hours")]
    pub order_window_hours: u64,

    /// Per-channel heartbeat interval, in seconds.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            debug: false,
            cors: CorsConfig::default(),
            jwt: JwtConfig::default(),
            order_window_hours: default_order_window_hours(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `KDS_HTTP_PORT`
    /// - `KDS_DEBUG`
    /// - `KDS_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `KDS_CORS_MAX_AGE_SECONDS`
    /// - `KDS_JWT_SECRET`
    /// - `KDS_JWT_PUBLIC_KEY_PEM`
    /// - `KDS_JWT_PUBLIC_KEY_PATH`
    /// - `KDS_JWT_ISSUER`
    /// - `KDS_JWT_AUDIENCE`
    /// - `KDS_JWT_USER_CLAIM`
    /// - `KDS_ORDER_WINDOW_HOURS`
    /// - `KDS_HEARTBEAT_INTERVAL_SECS` (1-300, default: 30)
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("KDS_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("KDS_DEBUG")? {
            config.debug = debug;
        }

        if let Some(origins) = env_string("KDS_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("KDS_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        if let Some(secret) = env_string("KDS_JWT_SECRET") {
            config.jwt.hs256_secret = Some(secret);
        }
        if let Some(pem) = env_string("KDS_JWT_PUBLIC_KEY_PEM") {
            config.jwt.rs256_public_key_pem = Some(normalize_pem(&pem));
        }
        if let Some(path) = env_string("KDS_JWT_PUBLIC_KEY_PATH") {
            if config.jwt.rs256_public_key_pem.is_some() {
                return Err(Error::InvalidInput(
                    "KDS_JWT_PUBLIC_KEY_PATH cannot be set with KDS_JWT_PUBLIC_KEY_PEM"
                        .to_string(),
                ));
            }
            let pem = std::fs::read_to_string(&path).map_err(|e| {
                Error::InvalidInput(format!("KDS_JWT_PUBLIC_KEY_PATH failed to read {path}: {e}"))
            })?;
            config.jwt.rs256_public_key_pem = Some(normalize_pem(&pem));
        }
        if let Some(issuer) = env_string("KDS_JWT_ISSUER") {
            config.jwt.issuer = Some(issuer);
        }
        if let Some(audience) = env_string("KDS_JWT_AUDIENCE") {
            config.jwt.audience = Some(audience);
        }
        if let Some(claim) = env_string("KDS_JWT_USER_CLAIM") {
            config.jwt.user_claim = claim;
        }

        if let Some(hours) = env_u64("KDS_ORDER_WINDOW_HOURS")? {
            if hours == 0 {
                return Err(Error::InvalidInput(
                    "KDS_ORDER_WINDOW_HOURS must be greater than 0".to_string(),
                ));
            }
            config.order_window_hours = hours;
        }
        if let Some(secs) = env_u64("KDS_HEARTBEAT_INTERVAL_SECS")? {
            if !(MIN_HEARTBEAT_INTERVAL_SECS..=MAX_HEARTBEAT_INTERVAL_SECS).contains(&secs) {
                return Err(Error::InvalidInput(format!(
                    "KDS_HEARTBEAT_INTERVAL_SECS must be between {MIN_HEARTBEAT_INTERVAL_SECS} and {MAX_HEARTBEAT_INTERVAL_SECS}"
                )));
            }
            config.heartbeat_interval_secs = secs;
        }

        Ok(config)
    }

    /// Returns the order listing window as a `chrono::Duration`.
    #[must_use]
    pub fn order_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::try_from(self.order_window_hours).unwrap_or(i64::MAX))
    }

    /// Returns the heartbeat interval as a `std::time::Duration`.
    #[must_use]
    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_interval_secs)
    }
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (development only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            // Default: disabled (secure-by-default).
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

/// JWT configuration for production authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 secret used to verify bearer tokens.
    ///
    /// In production this should be delivered via secret manager / env var,
    /// not checked into config files.
    #[serde(default)]
    pub hs256_secret: Option<String>,

    /// RS256 public key in PEM format for verifying bearer tokens.
    ///
    /// Prefer `KDS_JWT_PUBLIC_KEY_PATH` to avoid multiline env vars.
    #[serde(default)]
    pub rs256_public_key_pem: Option<String>,

    /// Optional issuer (`iss`) to enforce.
    #[serde(default)]
    pub issuer: Option<String>,

    /// Optional audience (`aud`) to enforce.
    #[serde(default)]
    pub audience: Option<String>,

    /// Claim name that contains the account identifier.
    #[serde(default = "default_user_claim")]
    pub user_claim: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            hs256_secret: None,
            rs256_public_key_pem: None,
            issuer: None,
            audience: None,
            user_claim: default_user_claim(),
        }
    }
}

fn default_user_claim() -> String {
    "sub".to_string()
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u16: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::InvalidInput(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn normalize_pem(pem: &str) -> String {
    let trimmed = pem.trim();
    if trimmed.contains("\\n") && !trimmed.contains('\n') {
        trimmed.replace("\\n", "\n")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_true_values() {
        assert!(parse_bool("TEST", "true").unwrap());
        assert!(parse_bool("TEST", "1").unwrap());
        assert!(parse_bool("TEST", "yes").unwrap());
        assert!(parse_bool("TEST", "TRUE").unwrap());
    }

    #[test]
    fn parse_bool_accepts_false_values() {
        assert!(!parse_bool("TEST", "false").unwrap());
        assert!(!parse_bool("TEST", "0").unwrap());
        assert!(!parse_bool("TEST", "no").unwrap());
        assert!(!parse_bool("TEST", "FALSE").unwrap());
    }

    #[test]
    fn parse_bool_rejects_invalid_values() {
        assert!(parse_bool("TEST", "maybe").is_err());
        assert!(parse_bool("TEST", "").is_err());
    }

    #[test]
    fn cors_origins_split_and_trim() {
        let origins = parse_cors_allowed_origins(" https://a.example , https://b.example ,");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(parse_cors_allowed_origins("*"), vec!["*"]);
        assert!(parse_cors_allowed_origins("  ").is_empty());
    }

    #[test]
    fn normalize_pem_expands_escaped_newlines() {
        let pem = "-----BEGIN KEY-----\\nabc\\n-----END KEY-----";
        assert!(normalize_pem(pem).contains('\n'));

        let already = "-----BEGIN KEY-----\nabc\n-----END KEY-----";
        assert_eq!(normalize_pem(already), already);
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.order_window_hours, 24);
        assert_eq!(config.heartbeat_interval_secs, 30);
        assert!(!config.debug);
    }
}
