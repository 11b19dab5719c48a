//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::ShopStore;
use crate::services::cart::CartService;
use crate::services::checkout::CheckoutService;
use crate::services::orders::OrderAdmin;
use crate::services::pricing::PricingPolicy;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// shared store, configuration and domain services. The store is held as a
/// trait object so the binary can run Postgres while tests inject the
/// in-memory implementation.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn ShopStore>,
    pricing: PricingPolicy,
    cart: CartService,
    checkout: CheckoutService,
    orders: OrderAdmin,
}

impl AppState {
    /// Create a new application state over a store implementation.
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn ShopStore>) -> Self {
        let pricing = config.pricing_policy();
        let cart = CartService::new(store.clone(), pricing);
        let checkout = CheckoutService::new(store.clone(), pricing);
        let orders = OrderAdmin::new(store.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                pricing,
                cart,
                checkout,
                orders,
            }),
        }
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ShopStore> {
        &self.inner.store
    }

    /// The configured pricing policy.
    #[must_use]
    pub fn pricing(&self) -> PricingPolicy {
        self.inner.pricing
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the order admin service.
    #[must_use]
    pub fn orders(&self) -> &OrderAdmin {
        &self.inner.orders
    }
}
