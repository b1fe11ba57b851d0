//! Integration tests for authentication and the product catalog surface.
//!
//! These tests require a running server and database.
//! Run with: cargo test -p marketplace-integration-tests -- --ignored

use marketplace_integration_tests::{
    base_url, http_client, register_and_login, seed_product, test_pool, unique_suffix,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

// ============================================================================
// Auth Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_login_refresh_cycle() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    assert!(!token.is_empty());

    // The cookie jar holds the refresh token; exchange it.
    let resp = client
        .post(format!("{}/auth/refresh-token", base_url()))
        .send()
        .await
        .expect("refresh failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("refresh body");
    let fresh = body["data"]["accessToken"].as_str().expect("access token");
    assert!(!fresh.is_empty());

    // The fresh token works as a bearer credential.
    let resp = client
        .get(format!("{}/orders/history", base_url()))
        .bearer_auth(fresh)
        .send()
        .await
        .expect("history failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_email_conflicts() {
    let pool = test_pool().await;
    let (_, _, _, email) = register_and_login(&pool).await;

    let resp = http_client()
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "name": "Copycat",
            "email": email,
            "password": "another-password",
        }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["message"], "Email already exists");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_wrong_password_unauthorized() {
    let pool = test_pool().await;
    let (_, _, _, email) = register_and_login(&pool).await;

    let resp = http_client()
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": "wrong-horse" }))
        .send()
        .await
        .expect("login failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_registered_role_is_always_customer() {
    // A client cannot smuggle a role into registration; the field is
    // simply not part of the request shape.
    let email = format!("wannabe-admin-{}@example.com", unique_suffix());
    let resp = http_client()
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "name": "Wannabe",
            "email": email,
            "password": "correct-horse",
            "role": "admin",
        }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("register body");
    assert_eq!(body["data"]["role"], "customer");
    // The password never comes back in any shape.
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("passwordHash").is_none());
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_catalog_mutations_require_admin() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;

    let form = reqwest::multipart::Form::new()
        .text("name", "Forbidden Chair")
        .text("price", "10.00")
        .text("stock", "5");

    let resp = client
        .post(format!("{}/products", base_url()))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .expect("create product failed");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // And with no credentials at all.
    let form = reqwest::multipart::Form::new().text("name", "Anonymous Chair");
    let resp = http_client()
        .post(format!("{}/products", base_url()))
        .multipart(form)
        .send()
        .await
        .expect("create product failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_listing_filters_and_pagination() {
    let pool = test_pool().await;
    let marker = unique_suffix();
    seed_product(&pool, &format!("walnut desk {marker}"), "150.00", 3).await;
    seed_product(&pool, &format!("walnut chair {marker}"), "80.00", 3).await;
    seed_product(&pool, &format!("steel lamp {marker}"), "30.00", 3).await;

    // Free-text search narrows to the two walnut items.
    let resp = http_client()
        .get(format!(
            "{}/products?searchTerm=walnut%20{marker}&sortBy=price&sortOrder=asc",
            base_url()
        ))
        .send()
        .await
        .expect("list failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("list body");
    let items = body["data"].as_array().expect("data array");
    assert_eq!(items.len(), 2);
    assert_eq!(body["meta"]["total"], 2);
    // Ascending price puts the chair first.
    assert!(
        items[0]["name"]
            .as_str()
            .expect("name")
            .contains("chair")
    );

    // Price floor excludes the chair.
    let resp = http_client()
        .get(format!(
            "{}/products?searchTerm=walnut%20{marker}&minPrice=100",
            base_url()
        ))
        .send()
        .await
        .expect("list failed");
    let body: Value = resp.json().await.expect("list body");
    assert_eq!(body["meta"]["total"], 1);

    // Tiny page size still reports the full total.
    let resp = http_client()
        .get(format!(
            "{}/products?searchTerm={marker}&limit=1&page=2",
            base_url()
        ))
        .send()
        .await
        .expect("list failed");
    let body: Value = resp.json().await.expect("list body");
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["meta"]["page"], 2);
    assert_eq!(body["meta"]["total"], 3);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_cart_quantity_merge_and_replace() {
    let pool = test_pool().await;
    let (client, token, _, _) = register_and_login(&pool).await;
    let product_id = seed_product(&pool, &format!("merge-{}", unique_suffix()), "9.99", 50).await;

    // Two adds merge additively: 2 + 3 = 5.
    for quantity in [2, 3] {
        let resp = client
            .post(format!("{}/cart", base_url()))
            .bearer_auth(&token)
            .json(&json!({ "productId": product_id, "quantity": quantity }))
            .send()
            .await
            .expect("add to cart failed");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = client
        .get(format!("{}/cart", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("get cart failed");
    let body: Value = resp.json().await.expect("cart body");
    assert_eq!(body["data"]["items"][0]["quantity"], 5);

    // PATCH replaces outright: quantity becomes 1, not 6.
    let resp = client
        .patch(format!("{}/cart/{product_id}", base_url()))
        .bearer_auth(&token)
        .json(&json!({ "quantity": 1 }))
        .send()
        .await
        .expect("patch cart failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("cart body");
    assert_eq!(body["data"]["items"][0]["quantity"], 1);

    // Removing a never-added product is a no-op, not an error.
    let ghost = seed_product(&pool, &format!("ghost-{}", unique_suffix()), "1.00", 1).await;
    let resp = client
        .delete(format!("{}/cart/{ghost}", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete cart line failed");
    assert_eq!(resp.status(), StatusCode::OK);
}
