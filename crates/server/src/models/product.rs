//! Catalog product model.
//!
//! Products are owned by the catalog service; this service reads them to
//! resolve prices and mutates nothing but `stock`, through the inventory
//! ledger's reserve/release operations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperpot_core::ProductId;

/// A catalog product as seen by the order-processing path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Current list price. Orders freeze their own copy at creation time.
    pub unit_price: Decimal,
    /// Units on hand. Never negative.
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product (seeding and the catalog write-through).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub unit_price: Decimal,
    pub stock: i32,
}
