use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::health;
use super::middleware::{logging_middleware, metrics_middleware, response_cache_middleware};
use super::state::AppState;
use super::v1;

/// Create the full router with application state.
///
/// The response cache is a `route_layer`, so it only wraps matched routes
/// and sees the matched route pattern. Health endpoints are added after it
/// and stay uncached.
pub fn create_router_with_state(state: AppState) -> Router {
    Router::new()
        .merge(v1::create_v1_router())
        .route_layer(from_fn_with_state(state.clone(), response_cache_middleware))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
