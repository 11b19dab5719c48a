//! `PostgreSQL` implementation of [`ShopStore`].
//!
//! Queries use the runtime `query_as` API with `FromRow` row structs that
//! convert into domain models. The stock reservation is a single conditional
//! `UPDATE`, so the storage engine serializes concurrent check-then-decrement
//! attempts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use copperpot_core::{
    CartId, CartLineId, OrderId, OrderStatus, ProductId, ShippingAddress, UserId, VariantSelector,
};

use super::store::{ReserveOutcome, ShopStore};
use super::RepositoryError;
use crate::models::{Cart, CartLine, NewCartLine, NewOrder, NewProduct, Order, OrderLine, Product};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    title: String,
    unit_price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            title: row.title,
            unit_price: row.unit_price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Internal row type for cart header queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for cart line queries.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    variant_size: Option<String>,
    variant_color: Option<String>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: CartLineId::new(row.id),
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            variant: variant_from_columns(row.variant_size, row.variant_color),
        }
    }
}

/// Internal row type for order header queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    street: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    payment_method: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, lines: Vec<OrderLine>) -> Order {
        Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            lines,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping: self.shipping,
            total: self.total,
            shipping_address: ShippingAddress {
                street: self.street,
                city: self.city,
                state: self.state,
                postal_code: self.postal_code,
                country: self.country,
            },
            payment_method: self.payment_method,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: i32,
    quantity: i32,
    unit_price: Decimal,
    variant_size: Option<String>,
    variant_color: Option<String>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
            variant: variant_from_columns(row.variant_size, row.variant_color),
        }
    }
}

/// Variant selectors are stored as two nullable text columns; both NULL
/// means the line has no variant.
fn variant_from_columns(size: Option<String>, color: Option<String>) -> Option<VariantSelector> {
    if size.is_none() && color.is_none() {
        None
    } else {
        Some(VariantSelector { size, color })
    }
}

fn variant_columns(variant: Option<&VariantSelector>) -> (Option<&str>, Option<&str>) {
    match variant {
        Some(v) => (v.size.as_deref(), v.color.as_deref()),
        None => (None, None),
    }
}

// =============================================================================
// Store
// =============================================================================

/// `PostgreSQL`-backed [`ShopStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_cart_lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT id, product_id, quantity, variant_size, variant_color
            FROM shop.cart_line
            WHERE cart_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(cart_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r"
            SELECT product_id, quantity, unit_price, variant_size, variant_color
            FROM shop.order_line
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn cart_from_row(row: CartRow, lines: Vec<CartLine>) -> Cart {
        Cart {
            id: CartId::new(row.id),
            user_id: UserId::new(row.user_id),
            lines,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ShopStore for PgStore {
    async fn insert_product(&self, input: &NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO shop.product (title, unit_price, stock)
            VALUES ($1, $2, $3)
            RETURNING id, title, unit_price, stock, created_at, updated_at
            ",
        )
        .bind(&input.title)
        .bind(input.unit_price)
        .bind(input.stock)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn update_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET title = $2, unit_price = $3, stock = $4, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(product.id.as_i32())
        .bind(&product.title)
        .bind(product.unit_price)
        .bind(product.stock)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, unit_price, stock, created_at, updated_at
            FROM shop.product
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn reserve_stock(
        &self,
        id: ProductId,
        quantity: i32,
    ) -> Result<ReserveOutcome, RepositoryError> {
        // The check and the decrement are one statement; the row lock
        // serializes concurrent reservations against the same product.
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(id.as_i32())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(ReserveOutcome::Reserved);
        }

        let exists = sqlx::query_scalar::<_, i32>(r"SELECT 1 FROM shop.product WHERE id = $1")
            .bind(id.as_i32())
            .fetch_optional(&self.pool)
            .await?;

        Ok(if exists.is_some() {
            ReserveOutcome::InsufficientStock
        } else {
            ReserveOutcome::ProductNotFound
        })
    }

    async fn release_stock(&self, id: ProductId, quantity: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE shop.product
            SET stock = stock + $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(quantity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            SELECT id, user_id, created_at, updated_at
            FROM shop.cart
            WHERE user_id = $1
            ",
        )
        .bind(user_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.fetch_cart_lines(CartId::new(row.id)).await?;
                Ok(Some(Self::cart_from_row(row, lines)))
            }
            None => Ok(None),
        }
    }

    async fn get_or_create_cart(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO shop.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            RETURNING id, user_id, created_at, updated_at
            ",
        )
        .bind(user_id.as_i32())
        .fetch_one(&self.pool)
        .await?;

        let lines = self.fetch_cart_lines(CartId::new(row.id)).await?;
        Ok(Self::cart_from_row(row, lines))
    }

    async fn add_cart_line(
        &self,
        cart_id: CartId,
        line: &NewCartLine,
    ) -> Result<CartLine, RepositoryError> {
        let (size, color) = variant_columns(line.variant.as_ref());
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO shop.cart_line (cart_id, product_id, quantity, variant_size, variant_color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, product_id, quantity, variant_size, variant_color
            ",
        )
        .bind(cart_id.as_i32())
        .bind(line.product_id.as_i32())
        .bind(line.quantity)
        .bind(size)
        .bind(color)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn set_cart_line_quantity(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
        quantity: i32,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            UPDATE shop.cart_line
            SET quantity = $3
            WHERE cart_id = $1 AND id = $2
            RETURNING id, product_id, quantity, variant_size, variant_color
            ",
        )
        .bind(cart_id.as_i32())
        .bind(line_id.as_i32())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_cart_line(
        &self,
        cart_id: CartId,
        line_id: CartLineId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM shop.cart_line
            WHERE cart_id = $1 AND id = $2
            ",
        )
        .bind(cart_id.as_i32())
        .bind(line_id.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM shop.cart_line l
            USING shop.cart c
            WHERE l.cart_id = c.id AND c.user_id = $1
            ",
        )
        .bind(user_id.as_i32())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO shop."order" (
                user_id, subtotal, tax, shipping, total,
                street, city, state, postal_code, country,
                payment_method, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING
                id, user_id, subtotal, tax, shipping, total,
                street, city, state, postal_code, country,
                payment_method, status, created_at, updated_at
            "#,
        )
        .bind(order.user_id.as_i32())
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping)
        .bind(order.total)
        .bind(&order.shipping_address.street)
        .bind(&order.shipping_address.city)
        .bind(&order.shipping_address.state)
        .bind(&order.shipping_address.postal_code)
        .bind(&order.shipping_address.country)
        .bind(&order.payment_method)
        .bind(order.status)
        .fetch_one(&mut *tx)
        .await?;

        let order_id = row.id;
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let (size, color) = variant_columns(line.variant.as_ref());
            let line_row = sqlx::query_as::<_, OrderLineRow>(
                r"
                INSERT INTO shop.order_line (
                    order_id, product_id, quantity, unit_price,
                    variant_size, variant_color
                )
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING product_id, quantity, unit_price, variant_size, variant_color
                ",
            )
            .bind(order_id)
            .bind(line.product_id.as_i32())
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(size)
            .bind(color)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(line_row.into());
        }

        tx.commit().await?;

        Ok(row.into_order(lines))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT
                id, user_id, subtotal, tax, shipping, total,
                street, city, state, postal_code, country,
                payment_method, status, created_at, updated_at
            FROM shop."order"
            WHERE id = $1
            "#,
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.fetch_order_lines(OrderId::new(row.id)).await?;
                Ok(Some(row.into_order(lines)))
            }
            None => Ok(None),
        }
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            UPDATE shop."order"
            SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING
                id, user_id, subtotal, tax, shipping, total,
                street, city, state, postal_code, country,
                payment_method, status, created_at, updated_at
            "#,
        )
        .bind(id.as_i32())
        .bind(expected)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lines = self.fetch_order_lines(OrderId::new(row.id)).await?;
                Ok(row.into_order(lines))
            }
            None => {
                let current = sqlx::query_scalar::<_, OrderStatus>(
                    r#"SELECT status FROM shop."order" WHERE id = $1"#,
                )
                .bind(id.as_i32())
                .fetch_optional(&self.pool)
                .await?;

                match current {
                    Some(current) => Err(RepositoryError::Conflict(format!(
                        "order {id} is {current}, not {expected}"
                    ))),
                    None => Err(RepositoryError::NotFound),
                }
            }
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query(r"SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
