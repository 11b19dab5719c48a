//! Integration tests for Copperpot Market.
//!
//! Tests drive the real router in-process over the in-memory store via
//! `tower::ServiceExt::oneshot`, so the suite runs hermetically - no
//! database or live server required.
//!
//! ```bash
//! cargo test -p copperpot-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;

use copperpot_core::ProductId;
use copperpot_server::config::AppConfig;
use copperpot_server::db::{MemoryStore, ShopStore};
use copperpot_server::models::NewProduct;
use copperpot_server::routes;
use copperpot_server::services::pricing::PricingPolicy;
use copperpot_server::state::AppState;

/// A test application: the real router over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    /// Build the app with the default pricing policy (tax 0.18, shipping 15.00).
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let config = AppConfig {
            database_url: SecretString::from("postgres://unused-in-tests"),
            host: std::net::IpAddr::from([127, 0, 0, 1]),
            port: 0,
            tax_rate: PricingPolicy::DEFAULT_TAX_RATE,
            shipping_fee: PricingPolicy::DEFAULT_SHIPPING_FEE,
            sentry_dsn: None,
        };
        let state = AppState::new(config, store.clone());
        Self {
            router: routes::app(state),
            store,
        }
    }

    /// Seed a product and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the insert (it never does in-memory).
    pub async fn seed_product(&self, title: &str, price_cents: i64, stock: i32) -> ProductId {
        self.store
            .insert_product(&NewProduct {
                title: title.to_string(),
                unit_price: Decimal::new(price_cents, 2),
                stock,
            })
            .await
            .expect("seed product")
            .id
    }

    /// Current stock for a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn stock(&self, product_id: ProductId) -> i32 {
        self.store
            .get_product(product_id)
            .await
            .expect("get product")
            .expect("product exists")
            .stock
    }

    /// Send a request as the given user and return the response.
    ///
    /// # Panics
    ///
    /// Panics if the router fails to produce a response.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<i32>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header("x-user-id", user_id.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Send a request and parse the JSON body, asserting the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs or the body is not valid JSON.
    pub async fn request_json(
        &self,
        method: &str,
        uri: &str,
        user_id: Option<i32>,
        body: Option<serde_json::Value>,
        expected_status: StatusCode,
    ) -> serde_json::Value {
        let response = self.request(method, uri, user_id, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(
            status,
            expected_status,
            "unexpected status; body: {}",
            String::from_utf8_lossy(&bytes)
        );
        serde_json::from_slice(&bytes).expect("JSON body")
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A valid shipping address body.
#[must_use]
pub fn shipping_address() -> serde_json::Value {
    serde_json::json!({
        "street": "12 Market Lane",
        "city": "Portland",
        "state": "OR",
        "postal_code": "97201",
        "country": "US"
    })
}
