//! API server entry point.

use api::config::Config;
use checkout::{InMemoryNotifier, InMemoryPaymentGateway, InMemorySupplier};
use order_store::{PostgresInventoryStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

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

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build application state over PostgreSQL or the in-memory stores
    let app = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .expect("failed to connect to PostgreSQL");

            let orders = PostgresOrderStore::new(pool.clone());
            orders.run_migrations().await.expect("migrations failed");
            let inventory = PostgresInventoryStore::new(pool);

            let state = api::create_state(
                orders,
                inventory,
                InMemoryPaymentGateway::new(),
                InMemorySupplier::new(),
                InMemoryNotifier::new(),
                &config,
            );
            api::create_app(state, metrics_handle)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders will not survive a restart");
            let (state, _backends) = api::create_default_state(&config);
            api::create_app(state, metrics_handle)
        }
    };

    // 4. Start server
    let addr = config.addr();
    tracing::info!(%addr, operator = %config.operator_email, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}
