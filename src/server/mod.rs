//! HTTP surface
//!
//! Routes:
//! - `GET /namespaces`, `GET /namespaces/{name}`, `POST /namespaces`
//! - `GET /healthz`, `GET /readyz`
//! - `GET /metrics`

use axum::{
    routing::get,
    Router,
};

pub mod errors;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod readiness;
pub mod state;

pub use errors::ApiError;
pub use lifecycle::{run_until_shutdown, shutdown_signal, LifecycleError};
pub use readiness::{spawn_warmup, Readiness};
pub use state::AppState;

pub const METRICS_PATH: &str = "/metrics";

/// Create the Axum router with the full middleware pipeline
pub fn create_router(state: AppState) -> Router {
    let metrics = state.metrics.clone();

    let routes = Router::new()
        .route(
            "/namespaces",
            get(handlers::list_namespaces).post(handlers::create_namespace),
        )
        .route("/namespaces/{name}", get(handlers::get_namespace))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route(METRICS_PATH, get(handlers::render_metrics))
        .fallback(handlers::not_found)
        .with_state(state);

    middleware::apply(routes, metrics)
}
