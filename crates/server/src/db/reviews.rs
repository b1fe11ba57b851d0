//! Review repository.
//!
//! Update and delete are scoped to (review id, user id) in the WHERE
//! clause itself, so "not yours" and "does not exist" are one condition.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marketplace_core::{ProductId, ReviewId, UserId};

use super::RepositoryError;
use crate::models::Review;

/// Internal row type: a review joined with the reviewer's display name.
#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    product_id: i32,
    user_id: i32,
    user_name: String,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            product_id: ProductId::new(row.product_id),
            user_id: UserId::new(row.user_id),
            user_name: row.user_name,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_JOINED: &str = r"
    SELECT r.id, r.product_id, r.user_id, u.name AS user_name,
           r.comment, r.created_at, r.updated_at
    FROM reviews r
    JOIN users u ON u.id = r.user_id";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a review. The purchase gate has already been checked by
    /// the caller.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn create(
        &self,
        user: UserId,
        product: ProductId,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let (id,): (ReviewId,) = sqlx::query_as(
            r"
            INSERT INTO reviews (user_id, product_id, comment)
            VALUES ($1, $2, $3)
            RETURNING id
            ",
        )
        .bind(user)
        .bind(product)
        .bind(comment)
        .fetch_one(self.pool)
        .await?;

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get one review with the reviewer resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{SELECT_JOINED} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// All reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_product(
        &self,
        product: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(&format!(
            "{SELECT_JOINED} WHERE r.product_id = $1 ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(product)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Replace the comment on the user's own review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the review does not
    /// exist or belongs to someone else, `RepositoryError::Database` on
    /// query failure.
    pub async fn update_comment(
        &self,
        id: ReviewId,
        user: UserId,
        comment: &str,
    ) -> Result<Review, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE reviews
            SET comment = $3, updated_at = now()
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user)
        .bind(comment)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Delete the user's own review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the review does not
    /// exist or belongs to someone else, `RepositoryError::Database` on
    /// query failure.
    pub async fn delete(&self, id: ReviewId, user: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
