//! Admin routes for catalog maintenance.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use stocklink_auth::Access;
use stocklink_infra::projections::{CategoryReadModel, ProductReadModel};

use crate::app::dto::{
    self, CreateCategoryRequest, CreateProductRequest, UpdateCategoryRequest, UpdateProductRequest,
};
use crate::app::errors::{ApiError, OrRedirect};
use crate::app::services::AppServices;
use crate::middleware;

const CATEGORIES: &str = "/admin/categories";
const PRODUCTS: &str = "/admin/products";

pub fn router() -> Router {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", post(update_category))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", post(update_product))
        .route_layer(axum::middleware::from_fn_with_state(
            Access::Admin,
            middleware::require_access,
        ))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> Json<Vec<CategoryReadModel>> {
    Json(services.categories())
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateCategoryRequest>,
) -> Result<Response, ApiError> {
    let category = services
        .create_category(body.name, body.image)
        .or_redirect(CATEGORIES)?;
    tracing::info!(category = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)).into_response())
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCategoryRequest>,
) -> Result<Json<CategoryReadModel>, ApiError> {
    let category_id = dto::parse_category_id(&id).or_redirect(CATEGORIES)?;
    let category = services
        .update_category(category_id, body.name, body.image, body.active)
        .or_redirect(CATEGORIES)?;
    Ok(Json(category))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
) -> Json<Vec<ProductReadModel>> {
    Json(services.products())
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CreateProductRequest>,
) -> Result<Response, ApiError> {
    let category_id = body
        .category_id
        .as_deref()
        .map(dto::parse_category_id)
        .transpose()
        .or_redirect(PRODUCTS)?;

    let product = services
        .create_product(body.sku, body.name, body.unit, category_id, body.image)
        .or_redirect(PRODUCTS)?;
    tracing::info!(sku = %product.sku, "product created");
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// Partial update; field edits and the `active` toggle land in one append.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ProductReadModel>, ApiError> {
    let product_id = dto::parse_product_id(&id).or_redirect(PRODUCTS)?;
    let category_id = match body.category_id {
        Some(Some(raw)) => Some(Some(dto::parse_category_id(&raw).or_redirect(PRODUCTS)?)),
        Some(None) => Some(None),
        None => None,
    };

    let product = services
        .update_product(product_id, body.name, body.unit, category_id, body.image, body.active)
        .or_redirect(PRODUCTS)?;
    Ok(Json(product))
}
