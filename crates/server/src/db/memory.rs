//! In-memory implementation of [`ShopStore`].
//!
//! Backed by `HashMap`s behind a single `RwLock`; every write takes the
//! write lock, so the reservation's check-then-decrement is serialized the
//! same way the Postgres conditional `UPDATE` is. Used by tests and local
//! development where persistence is not required.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;

use copperpot_core::{CartId, CartLineId, OrderId, OrderStatus, ProductId, UserId};

use super::store::{ReserveOutcome, ShopStore};
use super::RepositoryError;
use crate::models::{Cart, CartLine, NewCartLine, NewOrder, NewProduct, Order, OrderLine, Product};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    next_product_id: i32,
    next_cart_id: i32,
    next_cart_line_id: i32,
    next_order_id: i32,
}

/// Thread-safe in-memory store for tests and development.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn insert_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        inner.next_product_id += 1;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(inner.next_product_id),
            title: input.title.clone(),
            unit_price: input.unit_price,
            stock: input.stock,
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let existing = inner
            .products
            .get_mut(&product.id)
            .ok_or(RepositoryError::NotFound)?;
        *existing = Product {
            updated_at: Utc::now(),
            ..product.clone()
        };
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.products.get(&id).cloned())
    }

    async fn reserve_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<ReserveOutcome, RepositoryError> {
        // Check and decrement under the write lock, mirroring the storage
        // backend's conditional update.
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(ReserveOutcome::ProductNotFound);
        };
        if product.stock < quantity {
            return Ok(ReserveOutcome::InsufficientStock);
        }
        product.stock -= quantity;
        product.updated_at = Utc::now();
        Ok(ReserveOutcome::Reserved)
    }

    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let product = inner.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.stock += quantity;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.carts.get(&user_id).cloned())
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        if let Some(cart) = inner.carts.get(&user_id) {
            return Ok(cart.clone());
        }
        inner.next_cart_id += 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(inner.next_cart_id),
            user_id,
            lines: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.carts.insert(user_id, cart.clone());
        Ok(cart)
    }

    async fn add_cart_line(
        &self,
        cart_id: CartId,
        line: &NewCartLine,
    ) -> Result<CartLine, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        inner.next_cart_line_id += 1;
        let line_id = inner.next_cart_line_id;
        let cart = inner
            .carts
            .values_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or(RepositoryError::NotFound)?;
        let line = CartLine {
            id: CartLineId::new(line_id),
            product_id: line.product_id,
            quantity: line.quantity,
            variant: line.variant.clone(),
        };
        cart.lines.push(line.clone());
        cart.updated_at = Utc::now();
        Ok(line)
    }

    async fn set_cart_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let Some(cart) = inner.carts.values_mut().find(|cart| cart.id == cart_id) else {
            return Ok(None);
        };
        let Some(line) = cart.lines.iter_mut().find(|line| line.id == line_id) else {
            return Ok(None);
        };
        line.quantity = quantity;
        let line = line.clone();
        cart.updated_at = Utc::now();
        Ok(Some(line))
    }

    async fn delete_cart_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let Some(cart) = inner.carts.values_mut().find(|cart| cart.id == cart_id) else {
            return Ok(false);
        };
        let before = cart.lines.len();
        cart.lines.retain(|line| line.id != line_id);
        let removed = cart.lines.len() != before;
        if removed {
            cart.updated_at = Utc::now();
        }
        Ok(removed)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        if let Some(cart) = inner.carts.get_mut(&user_id) {
            cart.lines.clear();
            cart.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        inner.next_order_id += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(inner.next_order_id),
            user_id: order.user_id,
            lines: order
                .lines
                .iter()
                .map(|line| OrderLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    variant: line.variant.clone(),
                })
                .collect(),
            subtotal: order.subtotal,
            tax: order.tax,
            shipping: order.shipping,
            total: order.total,
            shipping_address: order.shipping_address.clone(),
            payment_method: order.payment_method.clone(),
            status: order.status,
            created_at: now,
            updated_at: now,
        };
        inner.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let inner = self.inner.read().expect("RwLock poisoned");
        Ok(inner.orders.get(&id).cloned())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut inner = self.inner.write().expect("RwLock poisoned");
        let order = inner.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != expected {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is {}, not {expected}",
                order.status
            )));
        }
        order.status = target;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn widget(stock: i32) -> NewProduct {
        NewProduct {
            title: "Widget".to_string(),
            unit_price: Decimal::new(1000, 2),
            stock,
        }
    }

    #[tokio::test]
    async fn test_reserve_decrements_stock() {
        let store = MemoryStore::new();
        let product = store.insert_product(&widget(5)).await.unwrap();

        let outcome = store.reserve_stock(product.id, 3).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Reserved);

        let after = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_stock_untouched() {
        let store = MemoryStore::new();
        let product = store.insert_product(&widget(2)).await.unwrap();

        let outcome = store.reserve_stock(product.id, 3).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::InsufficientStock);

        let after = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_missing_product() {
        let store = MemoryStore::new();
        let outcome = store.reserve_stock(ProductId::new(99), 1).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::ProductNotFound);
    }

    #[tokio::test]
    async fn test_release_restores_stock() {
        let store = MemoryStore::new();
        let product = store.insert_product(&widget(5)).await.unwrap();
        store.reserve_stock(product.id, 5).await.unwrap();
        store.release_stock(product.id, 5).await.unwrap();

        let after = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(after.stock, 5);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = MemoryStore::new();
        let product = store.insert_product(&widget(10)).await.unwrap();

        // 8 tasks racing for 3 units each against 10 in stock: at most 3
        // reservations can win.
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.reserve_stock(product.id, 3).await.unwrap()
            }));
        }

        let mut reserved = 0;
        for handle in handles {
            if handle.await.unwrap() == ReserveOutcome::Reserved {
                reserved += 1;
            }
        }

        let after = store.get_product(product.id).await.unwrap().unwrap();
        assert!(reserved <= 3);
        assert_eq!(after.stock, 10 - reserved * 3);
        assert!(after.stock >= 0);
    }

    #[tokio::test]
    async fn test_set_order_status_conflict_on_stale_expectation() {
        let store = MemoryStore::new();
        let order = store
            .insert_order(&NewOrder {
                user_id: UserId::new(1),
                lines: vec![],
                subtotal: Decimal::ZERO,
                tax: Decimal::ZERO,
                shipping: Decimal::ZERO,
                total: Decimal::ZERO,
                shipping_address: copperpot_core::ShippingAddress {
                    street: "1 Main".to_string(),
                    city: "Town".to_string(),
                    state: "ST".to_string(),
                    postal_code: "00000".to_string(),
                    country: "US".to_string(),
                },
                payment_method: "card".to_string(),
                status: OrderStatus::Pending,
            })
            .await
            .unwrap();

        store
            .set_order_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap();

        let err = store
            .set_order_status(order.id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
