//! Integration test harness for the marketplace backend.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and apply crates/server/migrations/*.sql
//! # Start the server: cargo run -p marketplace-server
//!
//! cargo test -p marketplace-integration-tests -- --ignored
//! ```
//!
//! Tests are `#[ignore]`d by default because they need a running server
//! (`MARKETPLACE_BASE_URL`, default `http://localhost:3000`) and direct
//! database access (`DATABASE_URL`) for seeding.

use reqwest::Client;
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("MARKETPLACE_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Connect to the test database for seeding and assertions.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is unset or the connection fails.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database")
}

/// A fresh cookie-keeping HTTP client.
///
/// # Panics
///
/// Panics if the client cannot be constructed.
#[must_use]
pub fn http_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Unique suffix for test fixtures so parallel runs don't collide.
#[must_use]
pub fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{nanos:x}")
}

/// Register a fresh customer and log in, returning (client, access
/// token, user id, email).
///
/// # Panics
///
/// Panics if registration or login fails.
pub async fn register_and_login(pool: &PgPool) -> (Client, String, i32, String) {
    let client = http_client();
    let email = format!("customer-{}@example.com", unique_suffix());

    let resp = client
        .post(format!("{}/auth/register", base_url()))
        .json(&json!({
            "name": "Test Customer",
            "email": email,
            "password": "correct-horse",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(resp.status(), 201, "register should return 201");

    let body: Value = login(&client, &email, "correct-horse").await;
    let token = body["data"]["accessToken"]
        .as_str()
        .expect("login returns accessToken")
        .to_string();

    let (user_id,): (i32,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(pool)
        .await
        .expect("registered user exists");

    (client, token, user_id, email)
}

/// Log in and return the response envelope.
///
/// # Panics
///
/// Panics if the request fails or does not return 200.
pub async fn login(client: &Client, email: &str, password: &str) -> Value {
    let resp = client
        .post(format!("{}/auth/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), 200, "login should return 200");
    resp.json().await.expect("login body is JSON")
}

/// Seed a product directly in the database, bypassing the admin API.
/// Returns the product ID.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_product(pool: &PgPool, name: &str, price: &str, stock: i32) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO products (name, description, price, stock)
        VALUES ($1, 'seeded for integration tests', $2::numeric, $3)
        RETURNING id
        ",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("failed to seed product");
    id
}

/// Current stock of a product.
///
/// # Panics
///
/// Panics if the product does not exist.
pub async fn product_stock(pool: &PgPool, product_id: i32) -> i32 {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("product exists");
    stock
}

/// Promote a user to admin directly in the database. Registration always
/// produces customers, so admin tests go through here.
///
/// # Panics
///
/// Panics if the update fails.
pub async fn promote_to_admin(pool: &PgPool, user_id: i32) {
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("failed to promote user");
}
