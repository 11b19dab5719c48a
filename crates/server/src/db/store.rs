//! The storage contract consumed by the domain services.

use async_trait::async_trait;

use copperpot_core::{CartId, CartLineId, OrderId, OrderStatus, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartLine, NewCartLine, NewOrder, NewProduct, Order, Product};

/// Result of a stock reservation attempt.
///
/// Insufficient stock and missing products are expected outcomes of the
/// conditional decrement, not storage failures, so they are modeled here
/// rather than in [`RepositoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// Stock was decremented by the requested quantity.
    Reserved,
    /// The product exists but holds fewer units than requested.
    InsufficientStock,
    /// No such product.
    ProductNotFound,
}

/// Durable store for products, carts and orders.
///
/// Implementations must make [`reserve_stock`](Self::reserve_stock) a single
/// atomic check-then-decrement: two concurrent reservations against the same
/// product must serialize, so stock can never go negative.
#[async_trait]
pub trait ShopStore: Send + Sync {
    // =========================================================================
    // Products
    // =========================================================================

    /// Persist a new product (catalog write-through and test seeding).
    async fn insert_product(&self, input: &NewProduct) -> Result<Product, RepositoryError>;

    /// Overwrite a product record (catalog write-through).
    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError>;

    /// Fetch a product by ID.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Decrement `stock` by `quantity` only if `stock >= quantity`.
    async fn reserve_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<ReserveOutcome, RepositoryError>;

    /// Restore previously reserved units. The compensating action for
    /// [`reserve_stock`](Self::reserve_stock).
    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), RepositoryError>;

    // =========================================================================
    // Carts
    // =========================================================================

    /// Fetch a user's open cart, if one exists.
    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Fetch a user's cart, creating an empty one if absent.
    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError>;

    /// Append a line to a cart.
    async fn add_cart_line(
        &self,
        cart_id: CartId,
        line: &NewCartLine,
    ) -> Result<CartLine, RepositoryError>;

    /// Overwrite a line's quantity. Returns `None` if the line is not in
    /// the cart.
    async fn set_cart_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError>;

    /// Remove a line. Returns `false` if the line is not in the cart.
    async fn delete_cart_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError>;

    /// Remove every line from the user's cart. Idempotent; succeeds when no
    /// cart exists.
    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError>;

    // =========================================================================
    // Orders
    // =========================================================================

    /// Persist a new order with its lines.
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// Fetch an order by ID.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Move an order from `expected` to `target` status.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the order does not exist and
    /// [`RepositoryError::Conflict`] if its status is no longer `expected`
    /// (a concurrent transition won).
    async fn set_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError>;

    // =========================================================================
    // Health
    // =========================================================================

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}
