//! Cart route handlers.
//!
//! Every mutation returns the full cart with preview totals so clients can
//! rerender without a second round trip. Preview totals track live catalog
//! prices; the frozen totals come from checkout.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use copperpot_core::{CartLineId, ProductId, VariantSelector};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::cart::CartView;
use crate::state::AppState;

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddLineRequest {
    pub product_id: ProductId,
    /// Defaults to 1 when omitted.
    pub quantity: Option<i32>,
    #[serde(default)]
    pub variant: Option<VariantSelector>,
}

/// Update line quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i32,
}

/// Display the current cart.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartView>> {
    let view = state.cart().get(user_id).await?;
    Ok(Json(view))
}

/// Add an item to the cart, merging with an existing (product, variant)
/// line if one exists.
#[instrument(skip(state, request))]
pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<AddLineRequest>,
) -> Result<Json<CartView>> {
    let view = state
        .cart()
        .add_line(
            user_id,
            request.product_id,
            request.quantity.unwrap_or(1),
            request.variant,
        )
        .await?;
    Ok(Json(view))
}

/// Overwrite a cart line's quantity.
#[instrument(skip(state, request))]
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<i32>,
    Json(request): Json<UpdateLineRequest>,
) -> Result<Json<CartView>> {
    let view = state
        .cart()
        .set_line_quantity(user_id, CartLineId::new(line_id), request.quantity)
        .await?;
    Ok(Json(view))
}

/// Remove a cart line.
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<i32>,
) -> Result<Json<CartView>> {
    let view = state
        .cart()
        .remove_line(user_id, CartLineId::new(line_id))
        .await?;
    Ok(Json(view))
}

/// Empty the cart.
#[instrument(skip(state))]
pub async fn clear(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartView>> {
    let view = state.cart().clear(user_id).await?;
    Ok(Json(view))
}
