//! Checkout route handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::instrument;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::Order;
use crate::services::checkout::CheckoutRequest;
use crate::state::AppState;

/// Place an order from the requested lines.
///
/// On success the order is created with `pending` status and the user's
/// cart is cleared. Failures map to their request-level status codes:
/// invalid address and empty order are 400, unknown product is 404,
/// insufficient stock is 409.
#[instrument(skip(state, request))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.checkout().place_order(user_id, request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}
