//! Application configuration loaded from environment variables.

use std::time::Duration;

use payment::{Secret, VnPayConfig};

const DEFAULT_CATALOG_URI: &str = "http://localhost:9001";
const DEFAULT_VNPAY_API_URL: &str = "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html";
const DEFAULT_VNPAY_RETURN_URL: &str = "http://localhost:3000/payments/vnpay/return";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` (default `"0.0.0.0"`) and `PORT` (default `3000`)
/// - `RUST_LOG`: tracing filter directive (default `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; records are kept in
///   memory when unset
/// - `CATALOG_SERVICE_URI` (default `http://localhost:9001`) and
///   `CATALOG_TIMEOUT_SECS` (default `10`)
/// - `VNPAY_API_URL`, `VNPAY_RETURN_URL`, `VNPAY_TMN_CODE`,
///   `VNPAY_SECRET_KEY`, `VNPAY_VERSION` (default `2.1.0`),
///   `VNPAY_COMMAND` (default `pay`), `VNPAY_ORDER_TYPE` (default `other`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub catalog_service_uri: String,
    pub catalog_timeout: Duration,
    pub vnpay: VnPayConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = Self::default();

        let vnpay = VnPayConfig::new(
            var("VNPAY_API_URL", DEFAULT_VNPAY_API_URL),
            var("VNPAY_RETURN_URL", DEFAULT_VNPAY_RETURN_URL),
            var("VNPAY_TMN_CODE", ""),
            Secret::new(var("VNPAY_SECRET_KEY", "")),
        )
        .with_version(var("VNPAY_VERSION", defaults.vnpay.version()))
        .with_command(var("VNPAY_COMMAND", defaults.vnpay.command()))
        .with_order_type(var("VNPAY_ORDER_TYPE", defaults.vnpay.order_type()));

        Self {
            host: var("HOST", &defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG", &defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            catalog_service_uri: var("CATALOG_SERVICE_URI", &defaults.catalog_service_uri),
            catalog_timeout: lookup("CATALOG_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.catalog_timeout),
            vnpay,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            catalog_service_uri: DEFAULT_CATALOG_URI.to_string(),
            catalog_timeout: Duration::from_secs(10),
            vnpay: VnPayConfig::new(
                DEFAULT_VNPAY_API_URL,
                DEFAULT_VNPAY_RETURN_URL,
                "",
                Secret::default(),
            ),
        }
    }
}
