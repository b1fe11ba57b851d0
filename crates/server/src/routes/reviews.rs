//! Review handlers. Creation is purchase-gated: only customers whose
//! order history contains the product may review it.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{ProductId, ReviewId, Role};

use crate::db::{OrderRepository, ProductRepository, ReviewRepository};
use crate::error::AppError;
use crate::middleware::{require_role, RequireAuth};
use crate::models::Review;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Review routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/product/{productId}", get(list_for_product))
        .route("/{reviewId}", patch(update).delete(delete))
}

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub product_id: ProductId,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub comment: String,
}

fn validate_comment(comment: &str) -> Result<&str, AppError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".to_string()));
    }
    Ok(trimmed)
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a review, enforcing the purchase gate.
#[instrument(skip(state, body))]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(body): Json<CreateReviewRequest>,
) -> Result<ApiResponse<Review>, AppError> {
    require_role(&[Role::Customer], user.role)?;
    let comment = validate_comment(&body.comment)?;

    ProductRepository::new(state.pool())
        .get(body.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let has_ordered = OrderRepository::new(state.pool())
        .user_has_ordered(user.id, body.product_id)
        .await?;
    if !has_ordered {
        return Err(AppError::Forbidden(
            "You can only review products you have purchased".to_string(),
        ));
    }

    let review = ReviewRepository::new(state.pool())
        .create(user.id, body.product_id, comment)
        .await?;

    tracing::info!(review_id = %review.id, product_id = %body.product_id, "review created");
    Ok(ApiResponse::created("Review created successfully", review))
}

/// Reviews for a product, newest first. Public.
#[instrument(skip(state))]
async fn list_for_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<ApiResponse<Vec<Review>>, AppError> {
    let reviews = ReviewRepository::new(state.pool())
        .list_by_product(product_id)
        .await?;

    Ok(ApiResponse::ok("Reviews retrieved successfully", reviews))
}

/// Update the caller's own review.
#[instrument(skip(state, body))]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(review_id): Path<ReviewId>,
    Json(body): Json<UpdateReviewRequest>,
) -> Result<ApiResponse<Review>, AppError> {
    require_role(&[Role::Customer], user.role)?;
    let comment = validate_comment(&body.comment)?;

    let review = ReviewRepository::new(state.pool())
        .update_comment(review_id, user.id, comment)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => AppError::NotFound(
                "Review not found or you are not authorized to update it".to_string(),
            ),
            other => other.into(),
        })?;

    Ok(ApiResponse::ok("Review updated successfully", review))
}

/// Delete the caller's own review.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(review_id): Path<ReviewId>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    require_role(&[Role::Customer], user.role)?;

    ReviewRepository::new(state.pool())
        .delete(review_id, user.id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => AppError::NotFound(
                "Review not found or you are not authorized to delete it".to_string(),
            ),
            other => other.into(),
        })?;

    Ok(ApiResponse::ok_empty("Review deleted successfully"))
}
