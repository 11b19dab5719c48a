//! Inventory ledger: the only mutator of product stock.
//!
//! Reservation is delegated to the store's conditional decrement so the
//! check and the write are one atomic step; release is the compensating
//! action used when a later checkout step fails.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use copperpot_core::ProductId;

use crate::db::{RepositoryError, ReserveOutcome, ShopStore};

/// Failures surfaced by the ledger.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The product holds fewer units than requested.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// No such product in the catalog.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Requested quantity was zero or negative.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Per-product stock accounting over the shared store.
#[derive(Clone)]
pub struct InventoryLedger {
    store: Arc<dyn ShopStore>,
}

impl InventoryLedger {
    /// Create a ledger over the shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    /// Reserve `quantity` units of a product.
    ///
    /// Decrements stock only if enough units remain; the store guarantees
    /// the conditional decrement is atomic per product, so concurrent
    /// reservations cannot oversell.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InsufficientStock`] or
    /// [`InventoryError::ProductNotFound`] as request-level failures, or
    /// [`InventoryError::Repository`] on storage errors.
    #[instrument(skip(self))]
    pub async fn reserve(&self, product_id: ProductId, quantity: i32) -> Result<(), InventoryError> {
        if quantity < 1 {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        match self.store.reserve_stock(product_id, quantity).await? {
            ReserveOutcome::Reserved => {
                tracing::debug!(%product_id, quantity, "stock reserved");
                Ok(())
            }
            ReserveOutcome::InsufficientStock => {
                Err(InventoryError::InsufficientStock(product_id))
            }
            ReserveOutcome::ProductNotFound => Err(InventoryError::ProductNotFound(product_id)),
        }
    }

    /// Restore previously reserved units.
    ///
    /// Only ever called to compensate a reservation made in the same
    /// checkout pass, so it restores exactly what was taken.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the product is gone or storage fails.
    #[instrument(skip(self))]
    pub async fn release(&self, product_id: ProductId, quantity: i32) -> Result<(), RepositoryError> {
        self.store.release_stock(product_id, quantity).await?;
        tracing::debug!(%product_id, quantity, "stock released");
        Ok(())
    }
}
