//! Order lifecycle tests: single and bulk status transitions, ownership
//! scoping and health endpoints.

use axum::http::StatusCode;
use serde_json::json;

use copperpot_integration_tests::{TestApp, shipping_address};

async fn place_order(app: &TestApp, user_id: i32) -> i64 {
    let product_id = app.seed_product("Widget", 1000, 100).await;
    let order = app
        .request_json(
            "POST",
            "/checkout",
            Some(user_id),
            Some(json!({
                "lines": [{"product_id": product_id, "quantity": 1}],
                "shipping_address": shipping_address(),
                "payment_method": "card"
            })),
            StatusCode::CREATED,
        )
        .await;
    order["id"].as_i64().expect("order id")
}

#[tokio::test]
async fn order_walks_the_full_lifecycle() {
    let app = TestApp::new();
    let order_id = place_order(&app, 1).await;

    for status in ["confirmed", "shipped", "delivered"] {
        let order = app
            .request_json(
                "PUT",
                &format!("/orders/{order_id}/status"),
                None,
                Some(json!({"status": status})),
                StatusCode::OK,
            )
            .await;
        assert_eq!(order["status"], status);
    }
}

#[tokio::test]
async fn skipping_a_lifecycle_step_conflicts() {
    let app = TestApp::new();
    let order_id = place_order(&app, 1).await;

    let response = app
        .request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            None,
            Some(json!({"status": "shipped"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The order is unchanged.
    let order = app
        .request_json(
            "GET",
            &format!("/orders/{order_id}"),
            Some(1),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(order["status"], "pending");
}

#[tokio::test]
async fn regressing_status_conflicts() {
    let app = TestApp::new();
    let order_id = place_order(&app, 1).await;

    app.request_json(
        "PUT",
        &format!("/orders/{order_id}/status"),
        None,
        Some(json!({"status": "confirmed"})),
        StatusCode::OK,
    )
    .await;

    let response = app
        .request(
            "PUT",
            &format!("/orders/{order_id}/status"),
            None,
            Some(json!({"status": "pending"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let app = TestApp::new();
    let response = app
        .request(
            "PUT",
            "/orders/999/status",
            None,
            Some(json!({"status": "confirmed"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_transition_reports_per_id_outcomes() {
    let app = TestApp::new();
    let first = place_order(&app, 1).await;
    let second = place_order(&app, 2).await;

    let body = app
        .request_json(
            "POST",
            "/orders/status",
            None,
            Some(json!({
                "order_ids": [first, 999, second],
                "status": "confirmed"
            })),
            StatusCode::MULTI_STATUS,
        )
        .await;

    assert_eq!(body["success_count"], 2);
    assert_eq!(body["updated"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["failures"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["failures"][0]["order_id"], 999);
}

#[tokio::test]
async fn bulk_transition_with_all_successes_is_ok() {
    let app = TestApp::new();
    let first = place_order(&app, 1).await;
    let second = place_order(&app, 2).await;

    let body = app
        .request_json(
            "POST",
            "/orders/status",
            None,
            Some(json!({
                "order_ids": [first, second],
                "status": "confirmed"
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(body["success_count"], 2);
}

#[tokio::test]
async fn bulk_transition_with_no_ids_is_a_bad_request() {
    let app = TestApp::new();
    let response = app
        .request(
            "POST",
            "/orders/status",
            None,
            Some(json!({"order_ids": [], "status": "confirmed"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_detail_is_owner_scoped() {
    let app = TestApp::new();
    let order_id = place_order(&app, 1).await;

    app.request_json(
        "GET",
        &format!("/orders/{order_id}"),
        Some(1),
        None,
        StatusCode::OK,
    )
    .await;

    let response = app
        .request("GET", &format!("/orders/{order_id}"), Some(2), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_respond() {
    let app = TestApp::new();

    let response = app.request("GET", "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request("GET", "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}
