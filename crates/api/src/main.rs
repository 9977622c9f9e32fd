//! API server entry point.

use std::net::SocketAddr;

use api::config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use record_store::{InMemoryRecordStore, PostgresRecordStore, RecordStore};
use saga::order_fulfillment::ORDER_DISPATCHED_CHANNEL;
use saga::{DispatchConsumer, HttpInventoryClient};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

const DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Serves the API over `store` until shutdown, then drains the dispatch consumer.
async fn serve<S>(
    config: Config,
    store: S,
    inventory: HttpInventoryClient,
    metrics_handle: PrometheusHandle,
) where
    S: RecordStore + Clone + 'static,
{
    let state = api::create_default_state(store, inventory, config.vnpay.clone());

    let consumer = DispatchConsumer::subscribe(state.saga.clone());
    let consumer_task = tokio::spawn(consumer.run());

    let app = api::create_app(state.clone(), metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("server error");

    state
        .saga
        .publisher()
        .close_channel(ORDER_DISPATCHED_CHANNEL);
    match consumer_task.await {
        Ok(summary) => tracing::info!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            "dispatch consumer drained"
        ),
        Err(e) => tracing::error!(error = %e, "dispatch consumer panicked"),
    }

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if config.vnpay.tmn_code().is_empty() || config.vnpay.secret_key().reveal().is_empty() {
        tracing::warn!("VNPAY_TMN_CODE or VNPAY_SECRET_KEY is not set; payment urls will be rejected by the gateway");
    }

    // 3. Catalog client
    let catalog_url = Url::parse(&config.catalog_service_uri).expect("invalid CATALOG_SERVICE_URI");
    let inventory = HttpInventoryClient::new(catalog_url, config.catalog_timeout)
        .expect("failed to build catalog client");

    // 4. Record store and server
    match config.database_url.clone() {
        Some(database_url) => {
            let store = PostgresRecordStore::connect(&database_url, DATABASE_MAX_CONNECTIONS)
                .await
                .expect("failed to connect to database");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL record store");
            serve(config, store, inventory, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory record store");
            serve(config, InMemoryRecordStore::new(), inventory, metrics_handle).await;
        }
    }
}
