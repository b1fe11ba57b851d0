//! Database operations for the marketplace `PostgreSQL` schema.
//!
//! ## Tables
//!
//! - `users` - Accounts and password hashes
//! - `products` - Catalog records with stock counts
//! - `carts` / `cart_items` - One active cart per user
//! - `orders` / `order_items` - Immutable order snapshots
//! - `reviews` - Purchase-gated product comments
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are applied with
//! `psql` (they are plain SQL, not sqlx migration files).
//!
//! All queries use runtime-checked `sqlx::query`/`query_as`, so the crate
//! builds without a database connection.

pub mod carts;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use carts::CartRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g. unique email).
    #[error("{0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the underlying sqlx error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        matches!(
            err,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation()
        )
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
