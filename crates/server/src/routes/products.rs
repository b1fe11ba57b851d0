//! Product catalog handlers.
//!
//! Create and update accept `multipart/form-data` so an image file can
//! ride along with the scalar fields. Listing is public; mutations are
//! admin-only.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use marketplace_core::{ProductId, Role};

use crate::db::products::ProductChanges;
use crate::db::ProductRepository;
use crate::error::AppError;
use crate::middleware::{require_role, RequireAuth};
use crate::models::{PageOptions, Product, ProductFilters, ProductSort, SortOrder};
use crate::response::{ApiResponse, Meta};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Product routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{id}", get(get_one).patch(update).delete(delete))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub search_term: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<ProductSort>,
    pub sort_order: Option<SortOrder>,
}

// =============================================================================
// Multipart Form
// =============================================================================

/// Raw multipart fields before validation. `image` carries the original
/// filename next to the bytes so the extension survives.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    stock: Option<i32>,
    image: Option<(String, Vec<u8>)>,
    remove_image: bool,
}

impl ProductForm {
    /// Drain a multipart stream into the known fields. Unknown fields
    /// are ignored.
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match name.as_str() {
                "name" => form.name = Some(text(field, &name).await?),
                "description" => form.description = Some(text(field, &name).await?),
                "price" => {
                    let raw = text(field, &name).await?;
                    let price = raw.trim().parse::<Decimal>().map_err(|_| {
                        AppError::BadRequest("Price must be a valid number".to_string())
                    })?;
                    form.price = Some(price);
                }
                "stock" => {
                    let raw = text(field, &name).await?;
                    let stock = raw.trim().parse::<i32>().map_err(|_| {
                        AppError::BadRequest("Stock must be a whole number".to_string())
                    })?;
                    form.stock = Some(stock);
                }
                "image" => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .ok_or_else(|| AppError::BadRequest("Image must be a file".to_string()))?;
                    let bytes = field.bytes().await.map_err(|e| {
                        AppError::BadRequest(format!("Failed to read image: {e}"))
                    })?;
                    if !bytes.is_empty() {
                        form.image = Some((filename, bytes.to_vec()));
                    }
                }
                "removeImage" => {
                    form.remove_image = text(field, &name).await?.trim() == "true";
                }
                _ => {}
            }
        }

        Ok(form)
    }

    fn validate_scalars(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name
            && name.trim().is_empty()
        {
            return Err(AppError::BadRequest("Name cannot be empty".to_string()));
        }
        if let Some(price) = self.price
            && price < Decimal::ZERO
        {
            return Err(AppError::BadRequest(
                "Price cannot be negative".to_string(),
            ));
        }
        if let Some(stock) = self.stock
            && stock < 0
        {
            return Err(AppError::BadRequest(
                "Stock cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

async fn text(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid value for '{name}': {e}")))
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a product. Admin only.
#[instrument(skip(state, multipart))]
async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<ApiResponse<Product>, AppError> {
    require_role(&[Role::Admin], user.role)?;

    let form = ProductForm::from_multipart(multipart).await?;
    form.validate_scalars()?;

    let name = form
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::BadRequest("Name is required".to_string()))?;
    let description = form.description.clone().unwrap_or_default();
    let price = form
        .price
        .ok_or_else(|| AppError::BadRequest("Price is required".to_string()))?;
    let stock = form
        .stock
        .ok_or_else(|| AppError::BadRequest("Stock is required".to_string()))?;

    let image_url = match &form.image {
        Some((filename, bytes)) => Some(
            state
                .images()
                .save(filename, bytes)
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        ),
        None => None,
    };

    let product = ProductRepository::new(state.pool())
        .create(name, &description, price, stock, image_url.as_deref())
        .await?;

    tracing::info!(product_id = %product.id, "product created");
    Ok(ApiResponse::created("Product created successfully", product))
}

/// Paginated, filtered product listing. Public.
#[instrument(skip(state))]
async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<ApiResponse<Vec<Product>>, AppError> {
    let filters = ProductFilters {
        search_term: params.search_term.filter(|t| !t.trim().is_empty()),
        min_price: params.min_price,
        max_price: params.max_price,
    };
    let page = PageOptions::from_raw(params.page, params.limit);
    let sort = params.sort_by.unwrap_or_default();
    let order = params.sort_order.unwrap_or_default();

    let (products, total) = ProductRepository::new(state.pool())
        .list(&filters, page, sort, order)
        .await?;

    Ok(
        ApiResponse::ok("Products retrieved successfully", products).with_meta(Meta {
            page: page.page,
            limit: page.limit,
            total,
        }),
    )
}

/// Product detail. Public.
#[instrument(skip(state))]
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<Product>, AppError> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(ApiResponse::ok("Product retrieved successfully", product))
}

/// Partial update. Admin only. A new image replaces (and removes) the
/// prior asset; `removeImage=true` clears it without a replacement.
#[instrument(skip(state, multipart))]
async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<ApiResponse<Product>, AppError> {
    require_role(&[Role::Admin], user.role)?;

    let form = ProductForm::from_multipart(multipart).await?;
    form.validate_scalars()?;

    let repo = ProductRepository::new(state.pool());
    let existing = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    let image_url = match (&form.image, form.remove_image) {
        (Some((filename, bytes)), _) => Some(Some(
            state
                .images()
                .save(filename, bytes)
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?,
        )),
        (None, true) => Some(None),
        (None, false) => None,
    };

    let changes = ProductChanges {
        name: form.name.map(|n| n.trim().to_string()),
        description: form.description,
        price: form.price,
        stock: form.stock,
        image_url,
    };
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".to_string()));
    }

    let product = repo.update(id, &changes).await?;

    // The record now points elsewhere; drop the replaced asset.
    if changes.image_url.is_some()
        && let Some(old_url) = &existing.image_url
    {
        state.images().delete(old_url).await;
    }

    tracing::info!(product_id = %product.id, "product updated");
    Ok(ApiResponse::ok("Product updated successfully", product))
}

/// Delete a product and its image asset. Admin only.
#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    require_role(&[Role::Admin], user.role)?;

    let image_url = ProductRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound("Product not found".to_string())
            }
            other => other.into(),
        })?;

    if let Some(url) = image_url {
        state.images().delete(&url).await;
    }

    tracing::info!(product_id = %id, "product deleted");
    Ok(ApiResponse::ok_empty("Product deleted successfully"))
}
