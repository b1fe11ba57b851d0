//! Cart repository: one active cart per user, one line per product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use marketplace_core::{CartId, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Cart, CartLine, Product};

/// Joined row: a cart line with its product resolved.
#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    quantity: i32,
    product_id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        Self {
            quantity: row.quantity,
            product: Product {
                id: ProductId::new(row.product_id),
                name: row.name,
                description: row.description,
                price: row.price,
                stock: row.stock,
                image_url: row.image_url,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The ID of the user's cart, if one has been created.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn cart_id(&self, user: UserId) -> Result<Option<CartId>, RepositoryError> {
        let row: Option<(CartId,)> = sqlx::query_as("SELECT id FROM carts WHERE user_id = $1")
            .bind(user)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(|(id,)| id))
    }

    /// The user's cart with every line resolved to its current catalog
    /// record, or `None` if the user has never added anything.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_resolved(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let Some(cart_id) = self.cart_id(user).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, CartLineRow>(
            r"
            SELECT ci.quantity,
                   p.id AS product_id, p.name, p.description, p.price, p.stock,
                   p.image_url, p.created_at, p.updated_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(Cart {
            id: cart_id,
            user_id: user,
            items: rows.into_iter().map(Into::into).collect(),
        }))
    }

    /// Add `quantity` of a product to the user's cart, creating the cart
    /// on first use. An existing line for the same product is merged
    /// additively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_item(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lazily create the cart; the no-op update makes RETURNING fire
        // on the conflict path too.
        let (cart_id,): (CartId,) = sqlx::query_as(
            r"
            INSERT INTO carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            RETURNING id
            ",
        )
        .bind(user)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO cart_items (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(product)
        .bind(quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Replace the quantity of an existing line. Returns `false` if the
    /// product is not a line in this cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn set_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE cart_items SET quantity = $3 WHERE cart_id = $1 AND product_id = $2")
                .bind(cart)
                .bind(product)
                .bind(quantity)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a product's line from the cart. Removing a product that
    /// was never present is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart)
            .bind(product)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Empty the user's cart. A user without a cart is left as-is.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            DELETE FROM cart_items
            WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            ",
        )
        .bind(user)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
