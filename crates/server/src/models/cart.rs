//! Cart models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use copperpot_core::{CartId, CartLineId, ProductId, UserId, VariantSelector};

/// A user's open cart. At most one exists per user; it is created lazily on
/// first add and emptied atomically when an order is assembled from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Lines in insertion order. Lines with identical (product, variant)
    /// are merged, never duplicated.
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Find the line matching a (product, variant) pair, if present.
    #[must_use]
    pub fn find_line(
        &self,
        product_id: ProductId,
        variant: Option<&VariantSelector>,
    ) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.product_id == product_id && line.variant.as_ref() == variant)
    }
}

/// One mutable pre-checkout line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelector>,
}

/// Input for inserting a cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<VariantSelector>,
}
