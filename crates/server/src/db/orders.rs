//! Order repository: transactional checkout, history, and patching.
//!
//! Checkout runs as a single database transaction. Each line's stock is
//! taken with a conditional decrement (`... WHERE stock >= n`), so two
//! concurrent checkouts over the same product serialize on the row and
//! exactly one of them wins the last units; the loser rolls back with
//! nothing changed. The cart clear and the order insert ride in the same
//! transaction, making the whole step all-or-nothing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use marketplace_core::{OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, OrderPatch, Product};

/// Failures specific to the checkout transaction.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The user has no cart, or the cart has no lines.
    #[error("cart is empty")]
    CartEmpty,

    /// A line asked for more units than the product has left.
    #[error("insufficient stock for {product}")]
    InsufficientStock {
        /// Name of the product that ran short.
        product: String,
    },

    /// Underlying database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Failures specific to patching an order.
#[derive(Debug, Error)]
pub enum OrderUpdateError {
    /// The order's status changed between validation and write.
    #[error("order status changed concurrently")]
    StaleStatus,

    /// Underlying database failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderUpdateError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    total_amount: Decimal,
    shipping_address: String,
    payment_method: PaymentMethod,
    payment_status: bool,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            items,
            total_amount: self.total_amount,
            shipping_address: self.shipping_address,
            payment_method: self.payment_method,
            payment_status: self.payment_status,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Joined row: an order line with the current catalog record, when the
/// product still exists.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    current_name: Option<String>,
    current_description: Option<String>,
    current_price: Option<Decimal>,
    current_stock: Option<i32>,
    current_image_url: Option<String>,
    current_created_at: Option<DateTime<Utc>>,
    current_updated_at: Option<DateTime<Utc>>,
}

impl OrderItemRow {
    fn into_item(self) -> OrderItem {
        let product = match (
            self.product_id,
            self.current_name,
            self.current_description,
            self.current_price,
            self.current_stock,
            self.current_created_at,
            self.current_updated_at,
        ) {
            (
                Some(id),
                Some(name),
                Some(description),
                Some(price),
                Some(stock),
                Some(created_at),
                Some(updated_at),
            ) => Some(Product {
                id: ProductId::new(id),
                name,
                description,
                price,
                stock,
                image_url: self.current_image_url,
                created_at,
                updated_at,
            }),
            _ => None,
        };

        OrderItem {
            product_id: self.product_id.map(ProductId::new),
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
            product,
        }
    }
}

/// Cart line as seen inside the checkout transaction.
#[derive(Debug, sqlx::FromRow)]
struct CheckoutLine {
    product_id: i32,
    name: String,
    price: Decimal,
    quantity: i32,
}

const ORDER_COLUMNS: &str = "id, user_id, total_amount, shipping_address, \
     payment_method, payment_status, status, created_at, updated_at";

const ITEM_COLUMNS: &str = r"
    oi.order_id, oi.product_id, oi.product_name, oi.quantity, oi.unit_price,
    p.name AS current_name, p.description AS current_description,
    p.price AS current_price, p.stock AS current_stock,
    p.image_url AS current_image_url,
    p.created_at AS current_created_at, p.updated_at AS current_updated_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Convert the user's cart into an order, atomically.
    ///
    /// Inside one transaction: conditionally decrement every line's
    /// stock, insert the order and its snapshot items, and clear the
    /// cart. Any line failing its stock check rolls the whole thing
    /// back.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::CartEmpty`] if there is nothing to order,
    /// [`CheckoutError::InsufficientStock`] naming the product that ran
    /// short, or [`CheckoutError::Repository`] on database failure.
    pub async fn checkout(
        &self,
        user: UserId,
        shipping_address: &str,
        payment_method: PaymentMethod,
    ) -> Result<Order, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        // Deterministic line order keeps concurrent checkouts from
        // deadlocking on each other's product rows.
        let lines = sqlx::query_as::<_, CheckoutLine>(
            r"
            SELECT ci.product_id, p.name, p.price, ci.quantity
            FROM carts c
            JOIN cart_items ci ON ci.cart_id = c.id
            JOIN products p ON p.id = ci.product_id
            WHERE c.user_id = $1
            ORDER BY ci.product_id
            ",
        )
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        if lines.is_empty() {
            return Err(CheckoutError::CartEmpty);
        }

        let mut total = Decimal::ZERO;
        for line in &lines {
            let taken = sqlx::query(
                r"
                UPDATE products
                SET stock = stock - $2, updated_at = now()
                WHERE id = $1 AND stock >= $2
                ",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if taken.rows_affected() == 0 {
                // Dropping tx rolls back every decrement so far.
                return Err(CheckoutError::InsufficientStock {
                    product: line.name.clone(),
                });
            }

            total += line.price * Decimal::from(line.quantity);
        }

        let order_row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO orders
                (user_id, total_amount, shipping_address, payment_method, payment_status, status)
            VALUES ($1, $2, $3, $4, $5, 'pending')
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(user)
        .bind(total)
        .bind(shipping_address)
        .bind(payment_method)
        .bind(payment_method.is_prepaid())
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order_row.id)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.price)
            .execute(&mut *tx)
            .await?;

            items.push(OrderItem {
                product_id: Some(ProductId::new(line.product_id)),
                product_name: line.name,
                quantity: line.quantity,
                unit_price: line.price,
                product: None,
            });
        }

        sqlx::query(
            r"
            DELETE FROM cart_items
            WHERE cart_id IN (SELECT id FROM carts WHERE user_id = $1)
            ",
        )
        .bind(user)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order_row.into_order(items))
    }

    /// Get a single order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM order_items oi
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            "
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(Some(
            row.into_order(items.into_iter().map(OrderItemRow::into_item).collect()),
        ))
    }

    /// All of a user's orders, newest first, with items resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn history(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let item_rows = sqlx::query_as::<_, OrderItemRow>(&format!(
            r"
            SELECT {ITEM_COLUMNS}
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            LEFT JOIN products p ON p.id = oi.product_id
            WHERE o.user_id = $1
            ORDER BY oi.id
            "
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        let mut by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for item in item_rows {
            by_order
                .entry(item.order_id)
                .or_default()
                .push(item.into_item());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect())
    }

    /// Apply a validated patch, guarded by the status the caller
    /// validated against. If the transition enters `cancelled`, every
    /// line's quantity is restored to product stock in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// [`OrderUpdateError::StaleStatus`] if the order's status no longer
    /// matches `expected_status` (someone else got there first), or
    /// [`OrderUpdateError::Repository`] on database failure.
    pub async fn apply_patch(
        &self,
        id: OrderId,
        expected_status: OrderStatus,
        patch: &OrderPatch,
    ) -> Result<Order, OrderUpdateError> {
        let mut tx = self.pool.begin().await?;

        let mut query = QueryBuilder::<Postgres>::new("UPDATE orders SET updated_at = now()");
        if let Some(address) = &patch.shipping_address {
            query.push(", shipping_address = ").push_bind(address);
        }
        if let Some(status) = patch.status {
            query.push(", status = ").push_bind(status);
        }
        if let Some(paid) = patch.payment_status {
            query.push(", payment_status = ").push_bind(paid);
        }
        query.push(" WHERE id = ").push_bind(id);
        // Optimistic guard: the handler validated the transition against
        // this status, so the write must only land if it still holds.
        query.push(" AND status = ").push_bind(expected_status);

        let updated = query.build().execute(&mut *tx).await?;
        if updated.rows_affected() == 0 {
            return Err(OrderUpdateError::StaleStatus);
        }

        if patch.status == Some(OrderStatus::Cancelled) {
            // Lines whose product has since been deleted simply don't
            // match; the rest get their units back.
            sqlx::query(
                r"
                UPDATE products p
                SET stock = p.stock + oi.quantity, updated_at = now()
                FROM order_items oi
                WHERE oi.order_id = $1 AND p.id = oi.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get(id)
            .await?
            .ok_or(OrderUpdateError::Repository(RepositoryError::NotFound))
    }

    /// Whether any of the user's orders contains this product. This is
    /// the purchase gate for reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_has_ordered(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM orders o
                JOIN order_items oi ON oi.order_id = o.id
                WHERE o.user_id = $1 AND oi.product_id = $2
            )
            ",
        )
        .bind(user)
        .bind(product)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }
}
