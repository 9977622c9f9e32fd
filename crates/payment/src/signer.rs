//! Signed payment redirects and verification of gateway returns.

use std::collections::HashMap;

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use common::OrderId;
use domain::Order;
use record_store::RecordStore;

use crate::canonical::{self, PaymentParams, SECURE_HASH, SECURE_HASH_TYPE};
use crate::clock::Clock;
use crate::config::VnPayConfig;
use crate::error::PaymentError;

/// Offset of `Asia/Ho_Chi_Minh`, which observes no daylight saving.
const VIETNAM_OFFSET_SECS: i32 = 7 * 3600;

/// How long a payment link stays valid at the gateway.
const EXPIRY_MINUTES: i64 = 15;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const CURRENCY: &str = "VND";
const LOCALE: &str = "vn";
const ORDER_INFO_PREFIX: &str = "Thanh toan don hang:";

/// Response code the gateway uses for a completed payment.
pub const SUCCESS_CODE: &str = "00";

/// A customer's request to pay for an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    /// Preselects a bank at the gateway; ignored when empty.
    pub bank_code: Option<String>,
}

impl PaymentRequest {
    pub fn new(order_id: OrderId) -> Self {
        Self {
            order_id,
            bank_code: None,
        }
    }

    pub fn with_bank_code(mut self, bank_code: impl Into<String>) -> Self {
        self.bank_code = Some(bank_code.into());
        self
    }
}

/// What the gateway reported for a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub order_id: OrderId,
    pub response_code: String,
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
    }
}

/// Builds signed VNPay redirect URLs for orders awaiting payment.
pub struct PaymentRequestSigner<S: RecordStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: RecordStore, C: Clock> PaymentRequestSigner<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Returns the redirect URL for paying `request.order_id`.
    ///
    /// The result is fully determined by the order, the configuration, the
    /// client address and the clock.
    #[tracing::instrument(skip(self, config, request), fields(order_id = %request.order_id))]
    pub async fn build_payment_url(
        &self,
        config: &VnPayConfig,
        request: &PaymentRequest,
        client_ip: &str,
    ) -> Result<String, PaymentError> {
        let order = self
            .store
            .find_order(request.order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(request.order_id))?;

        if !order.status().awaits_payment() {
            return Err(PaymentError::Consistency(format!(
                "order {} is not waiting for payment",
                order.id()
            )));
        }

        let params = payment_params(config, &order, request, client_ip, self.clock.now());
        let query = canonical::signed_query(&params, config.secret_key().reveal())?;

        metrics::counter!("payment_urls_built_total").increment(1);
        tracing::info!(amount = %params["vnp_Amount"], "payment url built");

        Ok(format!("{}?{query}", config.pay_url()))
    }

    /// Checks the parameters the gateway sent back for a payment.
    ///
    /// Only `vnp_*` parameters take part in the signature; the hash itself
    /// and its type marker are excluded before recomputing.
    pub fn verify_return(
        &self,
        config: &VnPayConfig,
        params: &HashMap<String, String>,
    ) -> Result<PaymentOutcome, PaymentError> {
        verify_return(config, params)
    }
}

/// Assembles the gateway parameters for one order at instant `now`.
pub fn payment_params(
    config: &VnPayConfig,
    order: &Order,
    request: &PaymentRequest,
    client_ip: &str,
    now: DateTime<Utc>,
) -> PaymentParams {
    let order_id = order.id().to_string();
    let (created, expires) = timestamps(now);

    let mut params = PaymentParams::new();
    let mut put = |key: &str, value: String| {
        params.insert(key.to_string(), value);
    };

    put("vnp_Version", config.version().to_string());
    put("vnp_Command", config.command().to_string());
    put("vnp_TmnCode", config.tmn_code().to_string());
    put("vnp_CurrCode", CURRENCY.to_string());
    put("vnp_TxnRef", order_id.clone());
    put("vnp_OrderInfo", format!("{ORDER_INFO_PREFIX}{order_id}"));
    put("vnp_OrderType", config.order_type().to_string());
    put("vnp_Locale", LOCALE.to_string());
    put("vnp_ReturnUrl", config.return_url().to_string());
    put("vnp_CreateDate", created);
    put("vnp_ExpireDate", expires);
    put("vnp_Amount", minor_units(order.total_price()).to_string());
    if let Some(bank_code) = request.bank_code.as_deref().filter(|code| !code.is_empty()) {
        put("vnp_BankCode", bank_code.to_string());
    }
    put("vnp_IpAddr", client_ip.to_string());

    params
}

/// Checks a gateway return against the merchant secret.
pub fn verify_return(
    config: &VnPayConfig,
    params: &HashMap<String, String>,
) -> Result<PaymentOutcome, PaymentError> {
    let signature = params
        .get(SECURE_HASH)
        .filter(|value| !value.is_empty())
        .ok_or(PaymentError::MissingParameter(SECURE_HASH))?;

    let signed: PaymentParams = params
        .iter()
        .filter(|(key, _)| key.starts_with("vnp_"))
        .filter(|(key, _)| key.as_str() != SECURE_HASH && key.as_str() != SECURE_HASH_TYPE)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if !canonical::verify(&signed, config.secret_key().reveal(), signature)? {
        tracing::warn!("payment return carries an invalid signature");
        return Err(PaymentError::InvalidSignature);
    }

    let txn_ref = required(&signed, "vnp_TxnRef")?;
    let order_id = txn_ref
        .parse::<OrderId>()
        .map_err(|_| PaymentError::InvalidParameter {
            name: "vnp_TxnRef",
            value: txn_ref.to_string(),
        })?;
    let response_code = required(&signed, "vnp_ResponseCode")?.to_string();

    Ok(PaymentOutcome {
        order_id,
        response_code,
    })
}

fn required<'a>(params: &'a PaymentParams, name: &'static str) -> Result<&'a str, PaymentError> {
    params
        .get(name)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or(PaymentError::MissingParameter(name))
}

/// Creation and expiry timestamps in Vietnam civil time.
fn timestamps(now: DateTime<Utc>) -> (String, String) {
    let offset = FixedOffset::east_opt(VIETNAM_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    let created = now.with_timezone(&offset);
    let expires = created + Duration::minutes(EXPIRY_MINUTES);
    (
        created.format(TIMESTAMP_FORMAT).to_string(),
        expires.format(TIMESTAMP_FORMAT).to_string(),
    )
}

/// Amount in the gateway's minor units, one hundredth of a dong.
fn minor_units(total_price: f64) -> i64 {
    (total_price * 100.0).round() as i64
}
