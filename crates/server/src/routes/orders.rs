//! Order handlers: checkout, history, and the role-gated patch.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{OrderId, PaymentMethod, Role};

use crate::db::orders::{CheckoutError, OrderUpdateError};
use crate::db::OrderRepository;
use crate::error::AppError;
use crate::middleware::{require_role, RequireAuth};
use crate::models::{authorize_patch, check_transition, Order, OrderPatch};
use crate::response::ApiResponse;
use crate::state::AppState;

const MIN_ADDRESS_LENGTH: usize = 10;

/// Order routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/history", get(history))
        .route("/{id}", patch(update))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub shipping_address: String,
    pub payment_method: PaymentMethod,
}

impl CreateOrderRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.shipping_address.trim().len() < MIN_ADDRESS_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Shipping address must be at least {MIN_ADDRESS_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Convert the caller's cart into an order. Customer only.
#[instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateOrderRequest>,
) -> Result<ApiResponse<Order>, AppError> {
    require_role(&[Role::Customer], user.role)?;
    body.validate()?;

    let order = OrderRepository::new(state.pool())
        .checkout(
            user.id,
            body.shipping_address.trim(),
            body.payment_method,
        )
        .await
        .map_err(|e| match e {
            CheckoutError::CartEmpty => AppError::BadRequest("Cart is empty".to_string()),
            CheckoutError::InsufficientStock { product } => {
                AppError::BadRequest(format!("Insufficient stock for {product}"))
            }
            CheckoutError::Repository(repo) => repo.into(),
        })?;

    tracing::info!(order_id = %order.id, user_id = %user.id, "order placed");
    Ok(ApiResponse::created("Order placed successfully", order))
}

/// The caller's orders, newest first. Customer only.
#[instrument(skip(state))]
async fn history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Vec<Order>>, AppError> {
    require_role(&[Role::Customer], user.role)?;

    let orders = OrderRepository::new(state.pool()).history(user.id).await?;

    Ok(ApiResponse::ok("Order history retrieved successfully", orders))
}

/// Patch an order. Any authenticated caller may try; the permission
/// matrix in [`authorize_patch`] decides what lands.
#[instrument(skip(state, body))]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
    Json(body): Json<OrderPatch>,
) -> Result<ApiResponse<Order>, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }
    if let Some(address) = &body.shipping_address
        && address.trim().len() < MIN_ADDRESS_LENGTH
    {
        return Err(AppError::BadRequest(format!(
            "Shipping address must be at least {MIN_ADDRESS_LENGTH} characters"
        )));
    }

    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    authorize_patch(user.id, user.role, order.user_id, order.status, &body)?;
    if let Some(target) = body.status {
        check_transition(order.status, target)?;
    }

    let updated = repo
        .apply_patch(id, order.status, &body)
        .await
        .map_err(|e| match e {
            OrderUpdateError::StaleStatus => AppError::Conflict(
                "Order was modified concurrently, please retry".to_string(),
            ),
            OrderUpdateError::Repository(repo) => repo.into(),
        })?;

    tracing::info!(order_id = %id, "order updated");
    Ok(ApiResponse::ok("Order updated successfully", updated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        let short = CreateOrderRequest {
            shipping_address: "short".to_string(),
            payment_method: PaymentMethod::Cod,
        };
        assert!(short.validate().is_err());

        let padded = CreateOrderRequest {
            shipping_address: "   abc    ".to_string(),
            payment_method: PaymentMethod::Cod,
        };
        assert!(padded.validate().is_err());

        let ok = CreateOrderRequest {
            shipping_address: "221B Baker Street, London".to_string(),
            payment_method: PaymentMethod::Card,
        };
        assert!(ok.validate().is_ok());
    }
}
