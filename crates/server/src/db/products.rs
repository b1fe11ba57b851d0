//! Product repository: catalog CRUD and filtered listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use marketplace_core::ProductId;

use super::RepositoryError;
use crate::models::{PageOptions, Product, ProductFilters, ProductSort, SortOrder};

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    description: String,
    price: Decimal,
    stock: i32,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Partial update for a product. `image_url` distinguishes "leave alone"
/// (`None`) from "set or clear" (`Some(..)`).
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub image_url: Option<Option<String>>,
}

impl ProductChanges {
    /// Whether the change set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.image_url.is_none()
    }
}

const SELECT_COLUMNS: &str =
    "id, name, description, price, stock, image_url, created_at, updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
        stock: i32,
        image_url: Option<&str>,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO products (name, description, price, stock, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, stock, image_url, created_at, updated_at
            ",
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .bind(image_url)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// List products matching `filters`, one page at a time, together
    /// with the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if either query fails.
    pub async fn list(
        &self,
        filters: &ProductFilters,
        page: PageOptions,
        sort: ProductSort,
        order: SortOrder,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE TRUE"
        ));
        push_filters(&mut query, filters);
        // sort column and direction come from whitelisted enums, not user text
        query.push(format!(" ORDER BY {} {}", sort.column(), order.as_sql()));
        query.push(" LIMIT ");
        query.push_bind(page.limit);
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let rows: Vec<ProductRow> = query.build_query_as().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products WHERE TRUE");
        push_filters(&mut count, filters);
        let (total,): (i64,) = count.build_query_as().fetch_one(self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Apply a partial update, returning the updated record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID,
    /// `RepositoryError::Database` on query failure.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<Product, RepositoryError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE products SET updated_at = now()");

        if let Some(name) = &changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = &changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(price) = changes.price {
            query.push(", price = ").push_bind(price);
        }
        if let Some(stock) = changes.stock {
            query.push(", stock = ").push_bind(stock);
        }
        if let Some(image_url) = &changes.image_url {
            query.push(", image_url = ").push_bind(image_url.clone());
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {SELECT_COLUMNS}"));

        let row: Option<ProductRow> = query.build_query_as().fetch_optional(self.pool).await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product, returning its image URL (if any) so the caller
    /// can remove the asset from disk.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has this ID,
    /// `RepositoryError::Database` on query failure.
    pub async fn delete(&self, id: ProductId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING image_url")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        match row {
            Some((image_url,)) => Ok(image_url),
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Append the filter predicate to a query ending in `WHERE TRUE`.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &ProductFilters) {
    if let Some(term) = &filters.search_term {
        let pattern = format!("%{term}%");
        query.push(" AND (name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR description ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
    if let Some(min_price) = filters.min_price {
        query.push(" AND price >= ").push_bind(min_price);
    }
    if let Some(max_price) = filters.max_price {
        query.push(" AND price <= ").push_bind(max_price);
    }
}
