//! Order route handlers: owner-scoped detail plus the admin status surface.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use copperpot_core::{OrderId, OrderStatus};

use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::Order;
use crate::services::orders::BulkStatusFailure;
use crate::state::AppState;

/// Single status change request body.
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

/// Bulk status change request body.
#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub order_ids: Vec<OrderId>,
    pub status: OrderStatus,
}

/// Bulk status change response body.
#[derive(Debug, Serialize)]
pub struct BulkStatusResponse {
    pub success_count: usize,
    pub updated: Vec<Order>,
    pub failures: Vec<BulkStatusFailure>,
}

/// Fetch one of the caller's orders.
///
/// Another user's order answers 404, not 403, so order ids don't leak.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<i32>,
) -> Result<Json<Order>> {
    let order_id = OrderId::new(order_id);
    let order = state.orders().get(order_id).await?;
    if order.user_id != user_id {
        return Err(AppError::NotFound(format!("order {order_id}")));
    }
    Ok(Json(order))
}

/// Move an order one step forward in its lifecycle (admin surface).
#[instrument(skip(state))]
pub async fn set_status(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Json(request): Json<SetStatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .set_status(OrderId::new(order_id), request.status)
        .await?;
    Ok(Json(order))
}

/// Apply the same status to many orders (admin surface).
///
/// Per-id failures do not abort the batch; the response reports each
/// outcome and a success count. Answers 207 when any id failed.
#[instrument(skip(state, request), fields(count = request.order_ids.len()))]
pub async fn bulk_set_status(
    State(state): State<AppState>,
    Json(request): Json<BulkStatusRequest>,
) -> Response {
    if request.order_ids.is_empty() {
        return (StatusCode::BAD_REQUEST, "No orders specified").into_response();
    }

    let result = state
        .orders()
        .set_status_many(&request.order_ids, request.status)
        .await;

    let status = if result.failures.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::MULTI_STATUS
    };
    let body = BulkStatusResponse {
        success_count: result.success_count(),
        updated: result.updated,
        failures: result.failures,
    };

    (status, Json(body)).into_response()
}
