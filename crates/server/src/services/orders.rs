//! Post-creation order lifecycle.
//!
//! Orders move strictly forward through
//! `pending → confirmed → shipped → delivered`; backward and skipping
//! transitions are rejected. Bulk transitions apply per order and never
//! abort the batch - each id's outcome is reported independently.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use copperpot_core::{OrderId, OrderStatus};

use crate::db::{RepositoryError, ShopStore};
use crate::models::Order;

/// Failures surfaced by status transitions.
#[derive(Debug, Error)]
pub enum OrderStatusError {
    /// No such order.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The requested transition does not move one step forward.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Per-order outcome of a bulk transition.
#[derive(Debug, Serialize)]
pub struct BulkStatusFailure {
    pub order_id: OrderId,
    pub reason: String,
}

/// Result of a bulk transition: per-id outcomes, never a batch abort.
#[derive(Debug, Default, Serialize)]
pub struct BulkStatusResult {
    pub updated: Vec<Order>,
    pub failures: Vec<BulkStatusFailure>,
}

impl BulkStatusResult {
    /// Number of orders successfully transitioned.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.updated.len()
    }
}

/// Admin-facing order status operations.
#[derive(Clone)]
pub struct OrderAdmin {
    store: Arc<dyn ShopStore>,
}

impl OrderAdmin {
    /// Create the service over the shared store.
    #[must_use]
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    /// Fetch a single order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStatusError::OrderNotFound`] if absent.
    pub async fn get(&self, order_id: OrderId) -> Result<Order, OrderStatusError> {
        self.store
            .get_order(order_id)
            .await?
            .ok_or(OrderStatusError::OrderNotFound(order_id))
    }

    /// Move an order one step forward in its lifecycle.
    ///
    /// The store applies the write conditionally on the status we read, so a
    /// concurrent transition loses cleanly instead of double-applying.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStatusError::InvalidTransition`] for backward or
    /// skipping targets and [`OrderStatusError::OrderNotFound`] if absent.
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        order_id: OrderId,
        target: OrderStatus,
    ) -> Result<Order, OrderStatusError> {
        let order = self.get(order_id).await?;
        if !order.status.can_transition_to(target) {
            return Err(OrderStatusError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }

        match self.store.set_order_status(order_id, order.status, target).await {
            Ok(updated) => {
                tracing::info!(%order_id, from = %order.status, to = %target, "order status updated");
                Ok(updated)
            }
            Err(RepositoryError::NotFound) => Err(OrderStatusError::OrderNotFound(order_id)),
            // A concurrent transition moved the order first; report it as an
            // illegal transition from the status that won.
            Err(RepositoryError::Conflict(_)) => {
                let current = self.get(order_id).await?;
                Err(OrderStatusError::InvalidTransition {
                    from: current.status,
                    to: target,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Apply the same target status to every id, reporting each outcome
    /// independently.
    #[instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    pub async fn set_status_many(
        &self,
        order_ids: &[OrderId],
        target: OrderStatus,
    ) -> BulkStatusResult {
        let mut result = BulkStatusResult::default();
        for &order_id in order_ids {
            match self.set_status(order_id, target).await {
                Ok(order) => result.updated.push(order),
                Err(err) => result.failures.push(BulkStatusFailure {
                    order_id,
                    reason: err.to_string(),
                }),
            }
        }

        if result.failures.is_empty() {
            tracing::info!(count = result.success_count(), "bulk status update completed");
        } else {
            tracing::warn!(
                success = result.success_count(),
                failed = result.failures.len(),
                "bulk status update completed with errors"
            );
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewOrder, NewOrderLine};
    use copperpot_core::{ProductId, ShippingAddress, UserId};
    use rust_decimal::Decimal;

    async fn seed_order(store: &MemoryStore) -> OrderId {
        store
            .insert_order(&NewOrder {
                user_id: UserId::new(1),
                lines: vec![NewOrderLine {
                    product_id: ProductId::new(1),
                    quantity: 1,
                    unit_price: Decimal::new(1000, 2),
                    variant: None,
                }],
                subtotal: Decimal::new(1000, 2),
                tax: Decimal::new(180, 2),
                shipping: Decimal::new(1500, 2),
                total: Decimal::new(2680, 2),
                shipping_address: ShippingAddress {
                    street: "12 Market Lane".to_string(),
                    city: "Portland".to_string(),
                    state: "OR".to_string(),
                    postal_code: "97201".to_string(),
                    country: "US".to_string(),
                },
                payment_method: "card".to_string(),
                status: OrderStatus::Pending,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_forward_transition_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let order_id = seed_order(&store).await;
        let admin = OrderAdmin::new(store);

        let order = admin
            .set_status(order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_skipping_transition_rejected() {
        let store = Arc::new(MemoryStore::new());
        let order_id = seed_order(&store).await;
        let admin = OrderAdmin::new(store.clone());

        let err = admin
            .set_status(order_id, OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderStatusError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Shipped,
            }
        ));

        // The order is unchanged.
        let order = store.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_backward_transition_rejected() {
        let store = Arc::new(MemoryStore::new());
        let order_id = seed_order(&store).await;
        let admin = OrderAdmin::new(store);

        admin.set_status(order_id, OrderStatus::Confirmed).await.unwrap();
        let err = admin
            .set_status(order_id, OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderStatusError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_order() {
        let store = Arc::new(MemoryStore::new());
        let admin = OrderAdmin::new(store);

        let err = admin
            .set_status(OrderId::new(404), OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderStatusError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_bulk_reports_per_id_outcomes() {
        let store = Arc::new(MemoryStore::new());
        let first = seed_order(&store).await;
        let second = seed_order(&store).await;
        let admin = OrderAdmin::new(store);

        let result = admin
            .set_status_many(
                &[first, OrderId::new(404), second],
                OrderStatus::Confirmed,
            )
            .await;

        assert_eq!(result.success_count(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures.first().unwrap().order_id, OrderId::new(404));
    }

    #[tokio::test]
    async fn test_bulk_continues_past_failures() {
        let store = Arc::new(MemoryStore::new());
        let first = seed_order(&store).await;
        let second = seed_order(&store).await;
        let admin = OrderAdmin::new(store);

        // Move `first` ahead so the bulk confirm fails for it but still
        // processes `second`.
        admin.set_status(first, OrderStatus::Confirmed).await.unwrap();

        let result = admin
            .set_status_many(&[first, second], OrderStatus::Confirmed)
            .await;
        assert_eq!(result.success_count(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures.first().unwrap().order_id, first);
    }
}
