//! Integration tests for order patching: the permission matrix, the
//! status lifecycle, and stock restoration on cancel.
//!
//! These tests require a running server and database.
//! Run with: cargo test -p marketplace-integration-tests -- --ignored

use marketplace_integration_tests::{
    base_url, product_stock, promote_to_admin, register_and_login, seed_product, test_pool,
    unique_suffix,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;

const ADDRESS: &str = "221B Baker Street, London";

/// Seed a product, fill the cart, and check out. Returns (order id,
/// product id).
async fn place_order(pool: &PgPool, client: &Client, token: &str, stock: i32) -> (i64, i32) {
    let product_id = seed_product(
        pool,
        &format!("lifecycle-{}", unique_suffix()),
        "10.00",
        stock,
    )
    .await;

    let resp = client
        .post(format!("{}/cart", base_url()))
        .bearer_auth(token)
        .json(&json!({ "productId": product_id, "quantity": 2 }))
        .send()
        .await
        .expect("add to cart failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{}/orders", base_url()))
        .bearer_auth(token)
        .json(&json!({ "shippingAddress": ADDRESS, "paymentMethod": "COD" }))
        .send()
        .await
        .expect("checkout failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("order body");
    (body["data"]["id"].as_i64().expect("order id"), product_id)
}

async fn patch_order(client: &Client, token: &str, order_id: i64, patch: Value) -> reqwest::Response {
    client
        .patch(format!("{}/orders/{order_id}", base_url()))
        .bearer_auth(token)
        .json(&patch)
        .send()
        .await
        .expect("patch request failed")
}

// ============================================================================
// Customer Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cancel_restores_stock() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let (order_id, product_id) = place_order(&pool, &client, &token, 5).await;
    assert_eq!(product_stock(&pool, product_id).await, 3);

    let resp = patch_order(&client, &token, order_id, json!({ "status": "cancelled" })).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("patch body");
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(product_stock(&pool, product_id).await, 5);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_ship_own_order() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let (order_id, _) = place_order(&pool, &client, &token, 5).await;

    let resp = patch_order(&client, &token, order_id, json!({ "status": "shipped" })).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_touch_foreign_order() {
    let pool = test_pool().await;
    let (owner, owner_token, _, _) = register_and_login(&pool).await;
    let (order_id, _) = place_order(&pool, &owner, &owner_token, 5).await;

    let (_, stranger_token, _, _) = register_and_login(&pool).await;
    let stranger = marketplace_integration_tests::http_client();
    let resp = patch_order(
        &stranger,
        &stranger_token,
        order_id,
        json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Admin Lifecycle
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_walks_the_lifecycle() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let (order_id, _) = place_order(&pool, &client, &token, 5).await;

    let (_, admin_token, admin_id, admin_email) = register_and_login(&pool).await;
    promote_to_admin(&pool, admin_id).await;
    // Re-login so the token carries the admin role.
    let admin = marketplace_integration_tests::http_client();
    let body = marketplace_integration_tests::login(&admin, &admin_email, "correct-horse").await;
    let admin_token = body["data"]["accessToken"]
        .as_str()
        .map_or(admin_token, ToString::to_string);

    for status in ["processing", "shipped", "delivered"] {
        let resp = patch_order(&admin, &admin_token, order_id, json!({ "status": status })).await;
        assert_eq!(resp.status(), StatusCode::OK, "transition to {status}");
    }

    // Delivered is terminal.
    let resp = patch_order(
        &admin,
        &admin_token,
        order_id,
        json!({ "status": "cancelled" }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_backwards_transition_rejected() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let (order_id, _) = place_order(&pool, &client, &token, 5).await;

    sqlx::query("UPDATE orders SET status = 'shipped' WHERE id = $1")
        .bind(order_id)
        .execute(&pool)
        .await
        .expect("failed to force status");

    let (_, admin_token, admin_id, admin_email) = register_and_login(&pool).await;
    promote_to_admin(&pool, admin_id).await;
    let admin = marketplace_integration_tests::http_client();
    let body = marketplace_integration_tests::login(&admin, &admin_email, "correct-horse").await;
    let admin_token = body["data"]["accessToken"]
        .as_str()
        .map_or(admin_token, ToString::to_string);

    let resp = patch_order(&admin, &admin_token, order_id, json!({ "status": "pending" })).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(
        body["message"],
        "Invalid status transition from shipped to pending"
    );
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_unknown_patch_field_rejected() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let (order_id, _) = place_order(&pool, &client, &token, 5).await;

    // totalAmount is not patchable by anyone.
    let resp = patch_order(&client, &token, order_id, json!({ "totalAmount": "0.01" })).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
