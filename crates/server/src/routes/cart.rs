//! Cart handlers. All routes are customer-only.
//!
//! Stock is checked here as a courtesy; the authoritative check is the
//! conditional decrement at checkout.

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{ProductId, Role, UserId};

use crate::db::{CartRepository, ProductRepository};
use crate::error::AppError;
use crate::middleware::{require_role, RequireAuth};
use crate::models::Cart;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Cart routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(add_item).get(get_cart).delete(clear_cart))
        .route("/{productId}", delete(remove_item).patch(update_quantity))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

fn validate_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Look up the product and make sure `requested` units fit in stock.
async fn check_stock(
    state: &AppState,
    product: ProductId,
    requested: i32,
) -> Result<(), AppError> {
    let product = ProductRepository::new(state.pool())
        .get(product)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    if product.stock < requested {
        return Err(AppError::BadRequest(
            "Insufficient stock available".to_string(),
        ));
    }
    Ok(())
}

async fn resolved_cart(state: &AppState, user: UserId) -> Result<Option<Cart>, AppError> {
    Ok(CartRepository::new(state.pool()).get_resolved(user).await?)
}

// =============================================================================
// Handlers
// =============================================================================

/// Add a product to the cart, merging with an existing line.
#[instrument(skip(state, body))]
async fn add_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<AddItemRequest>,
) -> Result<ApiResponse<Cart>, AppError> {
    require_role(&[Role::Customer], user.role)?;
    validate_quantity(body.quantity)?;
    check_stock(&state, body.product_id, body.quantity).await?;

    let repo = CartRepository::new(state.pool());
    repo.add_item(user.id, body.product_id, body.quantity)
        .await?;

    let cart = resolved_cart(&state, user.id)
        .await?
        .ok_or_else(|| AppError::Internal("cart disappeared after insert".to_string()))?;

    Ok(ApiResponse::ok("Item added to cart successfully", cart))
}

/// The caller's cart; `data` is null if nothing was ever added.
#[instrument(skip(state))]
async fn get_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<Cart>, AppError> {
    require_role(&[Role::Customer], user.role)?;

    match resolved_cart(&state, user.id).await? {
        Some(cart) => Ok(ApiResponse::ok("Cart retrieved successfully", cart)),
        None => Ok(ApiResponse::ok_empty("Cart is empty")),
    }
}

/// Replace a line's quantity (not additive).
#[instrument(skip(state, body))]
async fn update_quantity(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
    Json(body): Json<QuantityRequest>,
) -> Result<ApiResponse<Cart>, AppError> {
    require_role(&[Role::Customer], user.role)?;
    validate_quantity(body.quantity)?;

    let repo = CartRepository::new(state.pool());
    let cart_id = repo
        .cart_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;

    check_stock(&state, product_id, body.quantity).await?;

    let updated = repo.set_quantity(cart_id, product_id, body.quantity).await?;
    if !updated {
        return Err(AppError::NotFound("Item not found in cart".to_string()));
    }

    let cart = resolved_cart(&state, user.id)
        .await?
        .ok_or_else(|| AppError::Internal("cart disappeared after update".to_string()))?;

    Ok(ApiResponse::ok("Cart item updated successfully", cart))
}

/// Remove a product's line. Absent lines are a no-op.
#[instrument(skip(state))]
async fn remove_item(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<ProductId>,
) -> Result<ApiResponse<Cart>, AppError> {
    require_role(&[Role::Customer], user.role)?;

    let repo = CartRepository::new(state.pool());
    let cart_id = repo
        .cart_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;

    repo.remove_item(cart_id, product_id).await?;

    let cart = resolved_cart(&state, user.id)
        .await?
        .ok_or_else(|| AppError::Internal("cart disappeared after remove".to_string()))?;

    Ok(ApiResponse::ok("Item removed from cart successfully", cart))
}

/// Empty the cart entirely.
#[instrument(skip(state))]
async fn clear_cart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    require_role(&[Role::Customer], user.role)?;

    CartRepository::new(state.pool()).clear(user.id).await?;

    Ok(ApiResponse::ok_empty("Cart cleared successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_validation() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(100).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }
}
