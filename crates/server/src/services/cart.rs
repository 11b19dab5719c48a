//! Cart operations.
//!
//! A user has at most one open cart, created lazily on first add. Lines
//! with identical (product, variant) merge instead of duplicating. Totals
//! returned here are previews computed from live catalog prices - the
//! frozen order totals come from checkout, not from here.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use copperpot_core::{CartId, CartLineId, ProductId, UserId, VariantSelector};

use crate::db::{RepositoryError, ShopStore};
use crate::models::{Cart, CartLine, NewCartLine};
use crate::services::pricing::{OrderTotals, PricingPolicy};

/// Failures surfaced by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// No such line in the user's cart.
    #[error("cart line {0} not found")]
    LineNotFound(CartLineId),

    /// Quantity was zero or negative.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A cart with its preview totals, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    /// `None` until the user's first add creates the cart.
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    /// Preview totals from live prices; distinct from frozen order totals.
    pub totals: OrderTotals,
}

/// Cart mutation and preview service.
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn ShopStore>,
    pricing: PricingPolicy,
}

impl CartService {
    /// Create the service over the shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>, pricing: PricingPolicy) -> Self {
        Self { store, pricing }
    }

    /// The user's current cart with preview totals.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Repository`] on storage failure.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart = self.store.get_cart(user_id).await?;
        self.view(cart).await
    }

    /// Add a line, merging with an existing (product, variant) line if one
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a non-positive quantity.
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
        variant: Option<VariantSelector>,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let cart = self.store.get_or_create_cart(user_id).await?;
        match cart.find_line(product_id, variant.as_ref()) {
            Some(existing) => {
                self.store
                    .set_cart_line_quantity(cart.id, existing.id, existing.quantity + quantity)
                    .await?
                    .ok_or(CartError::LineNotFound(existing.id))?;
            }
            None => {
                self.store
                    .add_cart_line(
                        cart.id,
                        &NewCartLine {
                            product_id,
                            quantity,
                            variant,
                        },
                    )
                    .await?;
            }
        }

        self.get(user_id).await
    }

    /// Overwrite a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for a non-positive quantity and
    /// [`CartError::LineNotFound`] if the line is not in the user's cart.
    #[instrument(skip(self))]
    pub async fn set_line_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(CartError::LineNotFound(line_id))?;
        self.store
            .set_cart_line_quantity(cart.id, line_id, quantity)
            .await?
            .ok_or(CartError::LineNotFound(line_id))?;

        self.get(user_id).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] if the line is not in the user's
    /// cart.
    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        user_id: UserId,
        line_id: CartLineId,
    ) -> Result<CartView, CartError> {
        let cart = self
            .store
            .get_cart(user_id)
            .await?
            .ok_or(CartError::LineNotFound(line_id))?;
        if !self.store.delete_cart_line(cart.id, line_id).await? {
            return Err(CartError::LineNotFound(line_id));
        }

        self.get(user_id).await
    }

    /// Empty the cart. Idempotent: clearing an absent or already-empty cart
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Repository`] on storage failure.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> Result<CartView, CartError> {
        self.store.clear_cart(user_id).await?;
        self.get(user_id).await
    }

    /// Build the view, pricing lines against the live catalog. Lines whose
    /// product has vanished are skipped from the preview; checkout still
    /// rejects them.
    async fn view(&self, cart: Option<Cart>) -> Result<CartView, CartError> {
        let Some(cart) = cart else {
            return Ok(CartView {
                cart_id: None,
                lines: Vec::new(),
                totals: OrderTotals::zero(),
            });
        };

        let mut priced = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            match self.store.get_product(line.product_id).await? {
                Some(product) => priced.push((product.unit_price, line.quantity)),
                None => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        line_id = %line.id,
                        "cart line references missing product; skipping from preview"
                    );
                }
            }
        }

        Ok(CartView {
            cart_id: Some(cart.id),
            totals: self.pricing.price(priced),
            lines: cart.lines,
        })
    }
}
