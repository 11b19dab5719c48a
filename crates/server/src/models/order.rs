//! Order models.
//!
//! Orders are immutable after creation except for `status`. Line prices are
//! frozen at assembly time and never track later catalog price changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperpot_core::{OrderId, OrderStatus, ProductId, ShippingAddress, UserId, VariantSelector};

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Non-empty, in request order.
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    /// Always `subtotal + tax + shipping` exactly.
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    /// Label only; payment capture happens elsewhere.
    pub payment_method: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable order line with its price frozen at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price captured when the order was assembled.
    pub unit_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelector>,
}

/// Input for persisting a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub lines: Vec<NewOrderLine>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub status: OrderStatus,
}

/// Input for one order line.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub variant: Option<VariantSelector>,
}
