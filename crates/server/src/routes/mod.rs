//! Route handlers and router assembly.

pub mod cart;
pub mod checkout;
pub mod orders;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
///
/// The binary layers Sentry middleware on top; tests drive this router
/// directly over the in-memory store.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/cart", get(cart::show).delete(cart::clear))
        .route("/cart/lines", post(cart::add))
        .route(
            "/cart/lines/{line_id}",
            patch(cart::update).delete(cart::remove),
        )
        .route("/checkout", post(checkout::create))
        .route("/orders/{order_id}", get(orders::detail))
        .route("/orders/{order_id}/status", put(orders::set_status))
        .route("/orders/status", post(orders::bulk_set_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies store connectivity before returning OK.
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
