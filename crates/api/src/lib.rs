//! HTTP API server for the bookstore order service.
//!
//! Provides REST endpoints for order submission, acceptance and VNPay
//! payment, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use payment::{PaymentRequestSigner, SystemClock, VnPayConfig};
use record_store::RecordStore;
use saga::{InMemoryEventBus, InventoryClient, OrderSaga};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Saga type served by the API; events travel over the in-process bus.
pub type AppSaga<S, I> = OrderSaga<S, I, InMemoryEventBus>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RecordStore, I: InventoryClient> {
    pub saga: Arc<AppSaga<S, I>>,
    pub signer: PaymentRequestSigner<S, SystemClock>,
    pub vnpay: VnPayConfig,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, I>(state: Arc<AppState<S, I>>, metrics_handle: PrometheusHandle) -> Router
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::submit::<S, I>))
        .route("/orders/{id}", get(routes::orders::get::<S, I>))
        .route("/orders/{id}/accept", post(routes::orders::accept::<S, I>))
        .route("/orders/{id}/reject", post(routes::orders::reject::<S, I>))
        .route("/payments/vnpay", post(routes::payments::create::<S, I>))
        .route(
            "/payments/vnpay/return",
            get(routes::payments::complete::<S, I>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the saga and payment signer over one record store.
pub fn create_default_state<S, I>(store: S, inventory: I, vnpay: VnPayConfig) -> Arc<AppState<S, I>>
where
    S: RecordStore + Clone + 'static,
    I: InventoryClient + 'static,
{
    let saga = Arc::new(OrderSaga::new(
        store.clone(),
        inventory,
        InMemoryEventBus::new(),
    ));
    let signer = PaymentRequestSigner::new(store, SystemClock);

    Arc::new(AppState {
        saga,
        signer,
        vnpay,
    })
}
