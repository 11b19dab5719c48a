//! Order assembly: the cart-to-order transition.
//!
//! Checkout validates the request, resolves and reserves each line in
//! order, prices the resolved lines, persists the order and clears the
//! user's cart. Any failure after the first reservation releases every
//! reservation made in the same pass before returning, so stock is never
//! leaked by a failed checkout.

use std::sync::Arc;

use serde::Deserialize;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use copperpot_core::{
    AddressError, OrderStatus, ProductId, ShippingAddress, UserId, VariantSelector,
};

use crate::db::{RepositoryError, ShopStore};
use crate::models::{NewOrder, NewOrderLine, Order};
use crate::services::inventory::{InventoryError, InventoryLedger};
use crate::services::pricing::PricingPolicy;

/// Failures surfaced by checkout.
///
/// Everything except `Repository` is a request-level failure the caller can
/// correct and retry; `Repository` is a system error that has already been
/// compensated for (no reservation survives it).
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The shipping address is missing a required field.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The request contained no lines.
    #[error("order must contain at least one line")]
    EmptyOrder,

    /// A line requested a non-positive quantity.
    #[error("quantity for product {0} must be at least 1")]
    InvalidQuantity(ProductId),

    /// A line references a product that does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// A line requested more units than the product holds.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    /// Storage failure. All reservations made during the attempt have been
    /// released.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Explicit unit price, used when re-pricing from a cart where the price
    /// was already snapshotted. Defaults to the product's current price.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub variant: Option<VariantSelector>,
}

/// A checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub lines: Vec<CheckoutLine>,
    pub shipping_address: ShippingAddress,
    /// Label only; payment capture happens elsewhere.
    pub payment_method: String,
}

/// Orchestrates validation, reservation, pricing and order persistence.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn ShopStore>,
    ledger: InventoryLedger,
    pricing: PricingPolicy,
}

impl CheckoutService {
    /// Create the service over the shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>, pricing: PricingPolicy) -> Self {
        let ledger = InventoryLedger::new(store.clone());
        Self {
            store,
            ledger,
            pricing,
        }
    }

    /// Assemble and persist an order from the requested lines.
    ///
    /// Lines are processed sequentially in request order; a failure at any
    /// line releases every reservation made for earlier lines before the
    /// error is returned. On success the order is persisted with `pending`
    /// status and the user's cart is cleared best-effort.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`].
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<Order, CheckoutError> {
        request.shipping_address.validate()?;
        if request.lines.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }
        if let Some(line) = request.lines.iter().find(|line| line.quantity < 1) {
            return Err(CheckoutError::InvalidQuantity(line.product_id));
        }

        // Resolve and reserve sequentially so a failure partway through has
        // a well-defined set of prior reservations to compensate.
        let mut reserved: Vec<(ProductId, i32)> = Vec::with_capacity(request.lines.len());
        let mut resolved: Vec<NewOrderLine> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = match self.store.get_product(line.product_id).await {
                Ok(Some(product)) => product,
                Ok(None) => {
                    self.rollback(&reserved).await;
                    return Err(CheckoutError::ProductNotFound(line.product_id));
                }
                Err(err) => {
                    self.rollback(&reserved).await;
                    return Err(err.into());
                }
            };

            if let Err(err) = self.ledger.reserve(line.product_id, line.quantity).await {
                self.rollback(&reserved).await;
                return Err(match err {
                    InventoryError::InsufficientStock(id) => CheckoutError::InsufficientStock(id),
                    InventoryError::ProductNotFound(id) => CheckoutError::ProductNotFound(id),
                    InventoryError::InvalidQuantity(_) => {
                        CheckoutError::InvalidQuantity(line.product_id)
                    }
                    InventoryError::Repository(err) => CheckoutError::Repository(err),
                });
            }
            reserved.push((line.product_id, line.quantity));

            resolved.push(NewOrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price.unwrap_or(product.unit_price),
                variant: line.variant.clone(),
            });
        }

        let totals = self
            .pricing
            .price(resolved.iter().map(|line| (line.unit_price, line.quantity)));

        let new_order = NewOrder {
            user_id,
            lines: resolved,
            subtotal: totals.subtotal,
            tax: totals.tax,
            shipping: totals.shipping,
            total: totals.total,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            status: OrderStatus::Pending,
        };

        let order = match self.store.insert_order(&new_order).await {
            Ok(order) => order,
            Err(err) => {
                // Persistence failed after stock was taken: compensate
                // before surfacing, or the units are lost.
                tracing::error!(error = %err, "order persistence failed; releasing reservations");
                self.rollback(&reserved).await;
                return Err(err.into());
            }
        };

        // Best-effort: a stale cart is a lesser defect than a lost order.
        if let Err(err) = self.store.clear_cart(user_id).await {
            tracing::warn!(%user_id, error = %err, "failed to clear cart after checkout");
        }

        tracing::info!(order_id = %order.id, %user_id, total = %order.total, "order created");
        Ok(order)
    }

    /// Release every reservation made earlier in the same pass.
    async fn rollback(&self, reserved: &[(ProductId, i32)]) {
        for &(product_id, quantity) in reserved {
            if let Err(err) = self.ledger.release(product_id, quantity).await {
                tracing::error!(
                    %product_id,
                    quantity,
                    error = %err,
                    "failed to release reservation during rollback"
                );
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewProduct;
    use crate::services::cart::CartService;

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            street: "12 Market Lane".to_string(),
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
        }
    }

    fn request(lines: Vec<CheckoutLine>) -> CheckoutRequest {
        CheckoutRequest {
            lines,
            shipping_address: address(),
            payment_method: "card".to_string(),
        }
    }

    fn line(product_id: ProductId, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            product_id,
            quantity,
            unit_price: None,
            variant: None,
        }
    }

    async fn seed(store: &MemoryStore, price_cents: i64, stock: i32) -> ProductId {
        store
            .insert_product(&NewProduct {
                title: "Widget".to_string(),
                unit_price: money(price_cents),
                stock,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_successful_checkout() {
        // Product with stock 5 at 10.00; ordering 3 leaves stock 2 and
        // prices at subtotal 30.00, tax 5.40, shipping 15.00, total 50.40.
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let order = service
            .place_order(UserId::new(1), request(vec![line(product_id, 3)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, money(3000));
        assert_eq!(order.tax, money(540));
        assert_eq!(order.shipping, money(1500));
        assert_eq!(order.total, money(5040));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines.first().unwrap().unit_price, money(1000));

        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn test_checkout_clears_cart() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let user = UserId::new(1);

        let carts = CartService::new(store.clone(), PricingPolicy::default());
        carts.add_line(user, product_id, 2, None).await.unwrap();

        let service = CheckoutService::new(store.clone(), PricingPolicy::default());
        service
            .place_order(user, request(vec![line(product_id, 2)]))
            .await
            .unwrap();

        let view = carts.get(user).await.unwrap();
        assert!(view.lines.is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_stock_fails_without_order_or_mutation() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 2).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let err = service
            .place_order(UserId::new(1), request(vec![line(product_id, 3)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InsufficientStock(id) if id == product_id));
        let product = store.get_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 2);
    }

    #[tokio::test]
    async fn test_failure_at_later_line_rolls_back_earlier_reservations() {
        let store = Arc::new(MemoryStore::new());
        let first = seed(&store, 1000, 10).await;
        let second = seed(&store, 500, 1).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let err = service
            .place_order(
                UserId::new(1),
                request(vec![line(first, 4), line(second, 2)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::InsufficientStock(id) if id == second));
        // The first line's reservation was compensated.
        assert_eq!(store.get_product(first).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.get_product(second).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_missing_product_rolls_back_earlier_reservations() {
        let store = Arc::new(MemoryStore::new());
        let first = seed(&store, 1000, 10).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let err = service
            .place_order(
                UserId::new(1),
                request(vec![line(first, 4), line(ProductId::new(404), 1)]),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::ProductNotFound(_)));
        assert_eq!(store.get_product(first).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = CheckoutService::new(store, PricingPolicy::default());

        let err = service
            .place_order(UserId::new(1), request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyOrder));
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_any_reservation() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let mut req = request(vec![line(product_id, 1)]);
        req.shipping_address.city = String::new();

        let err = service.place_order(UserId::new(1), req).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAddress(_)));
        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let err = service
            .place_order(UserId::new(1), request(vec![line(product_id, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidQuantity(_)));
        assert_eq!(store.get_product(product_id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_explicit_unit_price_overrides_catalog_price() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let service = CheckoutService::new(store, PricingPolicy::default());

        let mut checkout_line = line(product_id, 1);
        checkout_line.unit_price = Some(money(800));

        let order = service
            .place_order(UserId::new(1), request(vec![checkout_line]))
            .await
            .unwrap();
        assert_eq!(order.lines.first().unwrap().unit_price, money(800));
        assert_eq!(order.subtotal, money(800));
    }

    #[tokio::test]
    async fn test_order_price_frozen_against_later_catalog_changes() {
        let store = Arc::new(MemoryStore::new());
        let product_id = seed(&store, 1000, 5).await;
        let service = CheckoutService::new(store.clone(), PricingPolicy::default());

        let order = service
            .place_order(UserId::new(1), request(vec![line(product_id, 1)]))
            .await
            .unwrap();

        // Raise the catalog price after the order exists.
        let mut product = store.get_product(product_id).await.unwrap().unwrap();
        product.unit_price = money(9999);
        store.update_product(&product).await.unwrap();

        // The stored order keeps its frozen line price and totals.
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.lines.first().unwrap().unit_price, money(1000));
        assert_eq!(stored.subtotal, money(1000));
        assert_eq!(stored.total, order.total);
    }
}
