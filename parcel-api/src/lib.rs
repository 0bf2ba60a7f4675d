use axum::{
    extract::State,
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod metrics;
pub mod orders;
pub mod payments;
pub mod state;
pub mod tracking;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/v1/payments", post(payments::charge_payment))
        .route(
            "/v1/payments/{intent_id}/refund",
            post(payments::refund_payment),
        )
        .route("/v1/orders", get(orders::list_orders))
        .route(
            "/v1/orders/{order_id}/payments",
            get(payments::list_order_payments),
        )
        .route("/v1/orders/{order_id}/track", get(tracking::track_order))
        .route("/v1/events/{user_id}", post(tracking::publish_event))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}
