//! HTTP API server for the order reconciliation backend.
//!
//! Exposes checkout, order reads with lazy upstream enrichment,
//! fulfillment resumption, and stock sync as REST endpoints, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{
    CheckoutOrchestrator, InMemoryNotifier, InMemoryPaymentGateway, InMemorySupplier,
    InventorySync, OrderReader,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryInventoryStore, InMemoryOrderStore, InventoryStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O, I>(state: Arc<AppState<O, I>>, metrics_handle: PrometheusHandle) -> Router
where
    O: OrderStore + Clone + 'static,
    I: InventoryStore + Clone + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/checkout", post(routes::orders::checkout::<O, I>))
        .route("/orders", get(routes::orders::list::<O, I>))
        .route("/orders/{id}", get(routes::orders::get::<O, I>))
        .route("/orders/{id}/resume", post(routes::orders::resume::<O, I>))
        .route("/stock/sync", post(routes::stock::sync::<O, I>))
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

/// Creates application state over the given store pair and the
/// in-process upstream gateways.
pub fn create_state<O, I>(
    orders: O,
    inventory: I,
    payment: InMemoryPaymentGateway,
    supplier: InMemorySupplier,
    notifier: InMemoryNotifier,
    config: &Config,
) -> Arc<AppState<O, I>>
where
    O: OrderStore + Clone + 'static,
    I: InventoryStore + Clone + 'static,
{
    let orchestrator = CheckoutOrchestrator::with_config(
        orders.clone(),
        inventory.clone(),
        payment.clone(),
        supplier.clone(),
        notifier,
        config.checkout_config(),
    );
    let reader = OrderReader::new(orders, payment, supplier.clone(), config.call_timeout);
    let sync = InventorySync::new(supplier, inventory, config.call_timeout);

    Arc::new(AppState {
        orchestrator,
        reader,
        sync,
    })
}

/// The in-memory service doubles behind a default state, kept around
/// so the caller can seed stock and steer failure modes.
pub struct InMemoryBackends {
    pub orders: InMemoryOrderStore,
    pub inventory: InMemoryInventoryStore,
    pub payment: InMemoryPaymentGateway,
    pub supplier: InMemorySupplier,
    pub notifier: InMemoryNotifier,
}

/// Creates the default application state over the in-memory stores and
/// gateways.
pub fn create_default_state(
    config: &Config,
) -> (
    Arc<AppState<InMemoryOrderStore, InMemoryInventoryStore>>,
    InMemoryBackends,
) {
    let backends = InMemoryBackends {
        orders: InMemoryOrderStore::new(),
        inventory: InMemoryInventoryStore::new(),
        payment: InMemoryPaymentGateway::new(),
        supplier: InMemorySupplier::new(),
        notifier: InMemoryNotifier::new(),
    };

    let state = create_state(
        backends.orders.clone(),
        backends.inventory.clone(),
        backends.payment.clone(),
        backends.supplier.clone(),
        backends.notifier.clone(),
        config,
    );

    (state, backends)
}
