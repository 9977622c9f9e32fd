//! VNPay redirect and return endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::OrderId;
use domain::OrderStatus;
use payment::PaymentRequest;
use record_store::RecordStore;
use saga::InventoryClient;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::ClientIp;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub bank_code: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUrlResponse {
    pub payment_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReturnResponse {
    pub order_id: OrderId,
    pub response_code: String,
    pub status: OrderStatus,
}

/// POST /payments/vnpay — build the signed gateway redirect for an order.
#[tracing::instrument(skip(state, req), fields(order_id = %req.order_id))]
pub async fn create<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    ClientIp(client_ip): ClientIp,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<PaymentUrlResponse>, ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let request = PaymentRequest {
        order_id: req.order_id,
        bank_code: req.bank_code,
    };
    let payment_url = state
        .signer
        .build_payment_url(&state.vnpay, &request, &client_ip)
        .await?;

    Ok(Json(PaymentUrlResponse { payment_url }))
}

/// GET /payments/vnpay/return — settle an order from the gateway's signed
/// return parameters.
///
/// A successful payment accepts the order; any other response code
/// rejects it.
#[tracing::instrument(skip(state, params))]
pub async fn complete<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PaymentReturnResponse>, ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let outcome = state.signer.verify_return(&state.vnpay, &params)?;
    let result = if outcome.is_success() { "paid" } else { "failed" };
    metrics::counter!("payment_returns_total", "result" => result).increment(1);

    let order = if outcome.is_success() {
        state.saga.accept_order(outcome.order_id).await?
    } else {
        let reason = format!("payment failed with response code {}", outcome.response_code);
        state.saga.reject_order(outcome.order_id, &reason).await?
    };

    Ok(Json(PaymentReturnResponse {
        order_id: outcome.order_id,
        response_code: outcome.response_code,
        status: order.status(),
    }))
}
