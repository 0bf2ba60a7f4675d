use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parcel_api::{app, metrics::Metrics, AppState};
use parcel_pay::{MockProcessor, PaymentOrchestrator, RetryPolicy, StatusPropagator};
use parcel_store::{MemoryAttemptStore, MemoryOrderStore, RealtimeHub};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parcel_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = parcel_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Parcel API on port {}", config.server.port);

    let order_store = Arc::new(MemoryOrderStore::new());
    let attempts = Arc::new(MemoryAttemptStore::new());
    let hub = Arc::new(RealtimeHub::new(config.tracking.channel_capacity));

    let policy = RetryPolicy {
        max_attempts: config.propagation.max_attempts,
        attempt_timeout: Duration::from_millis(config.propagation.attempt_timeout_ms),
        base_delay: Duration::from_millis(config.propagation.base_delay_ms),
        max_delay: Duration::from_millis(config.propagation.max_delay_ms),
    };
    let propagator = Arc::new(StatusPropagator::new(order_store.clone(), policy));
    let orchestrator = Arc::new(PaymentOrchestrator::new(
        Arc::new(MockProcessor),
        attempts.clone(),
        propagator,
        Duration::from_millis(config.payment.budget_ms),
    ));

    let app_state = AppState {
        order_store,
        attempts,
        orchestrator,
        hub,
        metrics: Arc::new(Metrics::new()),
        currency: config.payment.currency.clone(),
        driver_found_grace: Duration::from_millis(config.tracking.driver_found_grace_ms),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, app).await.expect("Server error");
}
