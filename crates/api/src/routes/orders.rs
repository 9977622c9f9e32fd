//! Order submission, lookup and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::OrderId;
use domain::{LineItem, LineItemRequest, Order, UserInformation};
use record_store::RecordStore;
use saga::InventoryClient;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub user_information: UserInformation,
}

#[derive(Deserialize)]
pub struct RejectOrderRequest {
    #[serde(default)]
    pub reason: String,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
}

impl OrderResponse {
    fn new(order: Order) -> Self {
        Self {
            order,
            line_items: None,
        }
    }

    fn with_line_items(order: Order, line_items: Vec<LineItem>) -> Self {
        Self {
            order,
            line_items: Some(line_items),
        }
    }
}

// -- Handlers --

/// POST /orders — price the requested books and record the order.
#[tracing::instrument(skip(state, req))]
pub async fn submit<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Json(req): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let order = state
        .saga
        .submit_order(req.items, req.user_information)
        .await?;
    let (order, line_items) = state.saga.get_order(order.id()).await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::with_line_items(order, line_items)),
    ))
}

/// GET /orders/{id} — load an order with its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let order_id = parse_order_id(&id)?;
    let (order, line_items) = state.saga.get_order(order_id).await?;
    Ok(Json(OrderResponse::with_line_items(order, line_items)))
}

/// POST /orders/{id}/accept — accept a paid order and reduce inventory.
#[tracing::instrument(skip(state))]
pub async fn accept<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.saga.accept_order(order_id).await?;
    Ok(Json(OrderResponse::new(order)))
}

/// POST /orders/{id}/reject — cancel an order still waiting for payment.
#[tracing::instrument(skip(state, req))]
pub async fn reject<S, I>(
    State(state): State<Arc<AppState<S, I>>>,
    Path(id): Path<String>,
    Json(req): Json<RejectOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state.saga.reject_order(order_id, &req.reason).await?;
    Ok(Json(OrderResponse::new(order)))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
