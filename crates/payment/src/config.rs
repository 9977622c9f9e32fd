//! Merchant settings for the VNPay gateway.

use crate::secret::Secret;

pub const DEFAULT_VERSION: &str = "2.1.0";
pub const DEFAULT_COMMAND: &str = "pay";
pub const DEFAULT_ORDER_TYPE: &str = "other";

/// Gateway endpoint and merchant credentials.
///
/// Built once at startup and passed by reference into every signing call;
/// there are no setters.
#[derive(Debug, Clone)]
pub struct VnPayConfig {
    pay_url: String,
    return_url: String,
    tmn_code: String,
    secret_key: Secret<String>,
    version: String,
    command: String,
    order_type: String,
}

impl VnPayConfig {
    /// Creates a configuration with the default protocol version, command
    /// and order type.
    pub fn new(
        pay_url: impl Into<String>,
        return_url: impl Into<String>,
        tmn_code: impl Into<String>,
        secret_key: Secret<String>,
    ) -> Self {
        Self {
            pay_url: pay_url.into(),
            return_url: return_url.into(),
            tmn_code: tmn_code.into(),
            secret_key,
            version: DEFAULT_VERSION.to_string(),
            command: DEFAULT_COMMAND.to_string(),
            order_type: DEFAULT_ORDER_TYPE.to_string(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn with_order_type(mut self, order_type: impl Into<String>) -> Self {
        self.order_type = order_type.into();
        self
    }

    /// Gateway endpoint the customer is redirected to.
    pub fn pay_url(&self) -> &str {
        &self.pay_url
    }

    /// Where the gateway sends the customer back after payment.
    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    /// Merchant terminal code.
    pub fn tmn_code(&self) -> &str {
        &self.tmn_code
    }

    pub fn secret_key(&self) -> &Secret<String> {
        &self.secret_key
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn order_type(&self) -> &str {
        &self.order_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_overrides() {
        let config = VnPayConfig::new(
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "http://localhost:3000/payments/vnpay/return",
            "DEMO0001",
            Secret::new("secret".to_string()),
        );
        assert_eq!(config.version(), "2.1.0");
        assert_eq!(config.command(), "pay");
        assert_eq!(config.order_type(), "other");

        let config = config.with_order_type("billpayment").with_version("2.0.0");
        assert_eq!(config.order_type(), "billpayment");
        assert_eq!(config.version(), "2.0.0");
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = VnPayConfig::new("a", "b", "c", Secret::new("do-not-print".to_string()));
        assert!(!format!("{config:?}").contains("do-not-print"));
    }
}
