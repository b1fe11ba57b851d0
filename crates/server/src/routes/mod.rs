//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database ping)
//!
//! # Auth
//! POST /auth/register               - Create account (role forced to customer)
//! POST /auth/login                  - Issue access + refresh tokens
//! POST /auth/refresh-token          - Exchange refresh token for a new access token
//! POST /auth/logout                 - Clear auth cookies (stateless otherwise)
//!
//! # Products
//! POST   /products                  - [admin] Create product (multipart, optional image)
//! GET    /products                  - List with filter/pagination
//! GET    /products/{id}             - Product detail
//! PATCH  /products/{id}             - [admin] Partial update (multipart, optional image)
//! DELETE /products/{id}             - [admin] Delete product and its image asset
//!
//! # Cart
//! POST   /cart                      - [customer] Add item (additive merge)
//! GET    /cart                      - [customer] Resolved cart
//! PATCH  /cart/{productId}          - [customer] Replace line quantity
//! DELETE /cart/{productId}          - [customer] Remove line
//! DELETE /cart                      - [customer] Clear cart
//!
//! # Orders
//! POST  /orders                     - [customer] Checkout the cart
//! GET   /orders/history             - [customer] Own orders, newest first
//! PATCH /orders/{id}                - [any authenticated] Role-gated patch
//!
//! # Reviews
//! POST   /reviews                   - [customer] Create (purchase-gated)
//! GET    /reviews/product/{productId} - Reviews for a product, newest first
//! PATCH  /reviews/{reviewId}        - [customer] Update own review
//! DELETE /reviews/{reviewId}        - [customer] Delete own review
//! ```

pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::Router;

use crate::state::AppState;

/// Assemble all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::routes())
        .nest("/products", products::routes())
        .nest("/cart", cart::routes())
        .nest("/orders", orders::routes())
        .nest("/reviews", reviews::routes())
}
