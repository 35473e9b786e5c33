//! Checkout and order history through the HTTP API.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::{Value, json};

use mercado_integration_tests::{TestApp, TestResponse};

async fn checkout(app: &TestApp, token: &str, body: &Value) -> TestResponse {
    app.json(Method::POST, "/products/checkout", Some(token), body)
        .await
}

#[tokio::test]
async fn test_checkout_computes_total() {
    let app = TestApp::new().await;
    let (user_id, token) = app.user("ana@example.com").await;
    let product_id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": "19.99"}),
        )
        .await;

    let res = checkout(
        &app,
        &token,
        &json!({"productId": product_id, "userId": user_id, "quantity": 3}),
    )
    .await;

    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["message"], "Order placed");
    assert_eq!(res.body["total"], "59.97");
    assert!(res.body["orderId"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_checkout_rejects_non_positive_quantity() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let product_id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": 5}),
        )
        .await;

    for quantity in [0, -2] {
        let res = checkout(
            &app,
            &token,
            &json!({"productId": product_id, "quantity": quantity}),
        )
        .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }

    let history = app
        .call(Method::GET, "/products/history", Some(&token))
        .await;
    assert_eq!(history.body, json!([]));
}

#[tokio::test]
async fn test_checkout_missing_fields() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = checkout(&app, &token, &json!({})).await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let message = res.body["message"].as_str().unwrap();
    assert!(message.contains("productId") && message.contains("quantity"));
}

#[tokio::test]
async fn test_checkout_unknown_product() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;

    let res = checkout(&app, &token, &json!({"productId": 77, "quantity": 1})).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_for_other_user_is_forbidden() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let (bob, _) = app.user("bob@example.com").await;
    let product_id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": 5}),
        )
        .await;

    let res = checkout(
        &app,
        &token,
        &json!({"productId": product_id, "userId": bob, "quantity": 1}),
    )
    .await;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_checkout_respects_stock() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let product_id = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": 5, "stock": 2}),
        )
        .await;

    let res = checkout(&app, &token, &json!({"productId": product_id, "quantity": 3})).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["message"], "Insufficient stock");

    let res = checkout(&app, &token, &json!({"productId": product_id, "quantity": 2})).await;
    assert_eq!(res.status, StatusCode::CREATED);

    let product = app
        .call(Method::GET, &format!("/products/{product_id}"), Some(&token))
        .await
        .body;
    assert_eq!(product["stock"], 0);
}

#[tokio::test]
async fn test_history_is_per_user_and_filterable() {
    let app = TestApp::new().await;
    let (ana_id, ana) = app.user("ana@example.com").await;
    let (_, bob) = app.user("bob@example.com").await;

    let mug = app
        .create_product(
            &ana,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": "2.50"}),
        )
        .await;
    let lamp = app
        .create_product(
            &ana,
            &json!({"name": "Lamp", "categoryId": 2, "description": "d", "price": 10}),
        )
        .await;

    checkout(&app, &ana, &json!({"productId": mug, "quantity": 2})).await;
    checkout(&app, &ana, &json!({"productId": lamp, "quantity": 1})).await;
    checkout(&app, &bob, &json!({"productId": mug, "quantity": 1})).await;

    let history = app
        .call(Method::GET, "/products/history", Some(&ana))
        .await;
    assert_eq!(history.status, StatusCode::OK);
    let orders = history.body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    // Newest first.
    assert_eq!(orders[0]["productId"], lamp);
    assert_eq!(orders[1]["productId"], mug);
    assert_eq!(orders[1]["total"], "5.00");
    assert!(orders.iter().all(|o| o["userId"] == ana_id));

    let filtered = app
        .call(
            Method::GET,
            &format!("/products/history?productId={mug}"),
            Some(&ana),
        )
        .await;
    assert_eq!(filtered.body.as_array().unwrap().len(), 1);

    let none = app
        .call(Method::GET, "/products/history?productId=999", Some(&ana))
        .await;
    assert_eq!(none.status, StatusCode::OK);
    assert_eq!(none.body, json!([]));
}

#[tokio::test]
async fn test_orders_survive_product_deletion() {
    let app = TestApp::new().await;
    let (_, token) = app.user("ana@example.com").await;
    let mug = app
        .create_product(
            &token,
            &json!({"name": "Mug", "categoryId": 1, "description": "d", "price": 3}),
        )
        .await;
    checkout(&app, &token, &json!({"productId": mug, "quantity": 1})).await;

    let res = app
        .call(Method::DELETE, &format!("/products/{mug}"), Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);

    let history = app
        .call(Method::GET, "/products/history", Some(&token))
        .await;
    assert_eq!(history.body.as_array().unwrap().len(), 1);
}
