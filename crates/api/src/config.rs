//! Application configuration loaded from environment variables.

use std::time::Duration;

use checkout::CheckoutConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `"0.0.0.0"`)
/// - `PORT`: listen port (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; when unset the
///   server runs on the in-memory stores
/// - `CALL_TIMEOUT_MS`: bound on every upstream call (default `10000`)
/// - `CAPTURE_ATTEMPTS`: payment capture attempts while the gateway is
///   unavailable (default `3`)
/// - `CAPTURE_BACKOFF_MS`: delay between capture attempts (default `200`)
/// - `OPERATOR_EMAIL`: address operator alerts are addressed to
///   (default `"operator@example.com"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub call_timeout: Duration,
    pub capture_attempts: u32,
    pub capture_backoff: Duration,
    pub operator_email: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
            call_timeout: Duration::from_millis(
                std::env::var("CALL_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            capture_attempts: std::env::var("CAPTURE_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            capture_backoff: Duration::from_millis(
                std::env::var("CAPTURE_BACKOFF_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(200),
            ),
            operator_email: std::env::var("OPERATOR_EMAIL")
                .unwrap_or_else(|_| "operator@example.com".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the orchestrator tuning carried by this configuration.
    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig {
            call_timeout: self.call_timeout,
            capture_attempts: self.capture_attempts,
            capture_backoff: self.capture_backoff,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            call_timeout: Duration::from_millis(10_000),
            capture_attempts: 3,
            capture_backoff: Duration::from_millis(200),
            operator_email: "operator@example.com".to_string(),
        }
    }
}
