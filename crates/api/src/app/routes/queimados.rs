//! Requester branch: catalog, cart, own orders and reports.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use stocklink_auth::{Access, BranchRole};
use stocklink_reports::{ReportFilter, ReportKind};
use stocklink_transfers::{ItemId, TransferOrderId};

use crate::app::dto::{self, AddToCartRequest, CartResponse, UpdateCartRequest};
use crate::app::errors::{ApiError, OrRedirect};
use crate::app::routes::reports;
use crate::app::services::{AppServices, OrderDetail};
use crate::context::PrincipalContext;
use crate::middleware;

const PRODUCTS: &str = "/queimados/products";
const CART: &str = "/queimados/cart";
const ORDERS: &str = "/queimados/orders";

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(add_to_cart))
        .route("/categories", get(list_categories))
        .route("/cart", get(view_cart).post(update_cart))
        .route("/cart/items/:item_id/remove", post(remove_item))
        .route("/cart/submit", post(submit_cart))
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/receive", post(confirm_received))
        .route("/report", get(report))
        .route("/report/pdf", get(report_pdf))
        .route("/report/pdf/:id", get(order_pdf))
        .route_layer(axum::middleware::from_fn_with_state(
            Access::Branch(BranchRole::Requester),
            middleware::require_access,
        ))
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(json!({
        "products": services.active_products(),
        "cart_count": services.cart_count(principal.user_id()),
    }))
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.active_catalog())
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<AddToCartRequest>,
) -> Result<Response, ApiError> {
    let product_id = dto::parse_product_id(&body.product_id).or_redirect(PRODUCTS)?;
    let actor = principal.actor();
    let item_id = services
        .add_to_cart(&actor, product_id, body.qty)
        .or_redirect(PRODUCTS)?;

    Ok(Json(json!({
        "item_id": item_id,
        "cart_count": services.cart_count(actor.user_id),
    }))
    .into_response())
}

pub async fn view_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Json<CartResponse> {
    Json(CartResponse::from(&services.cart(&principal.actor())))
}

pub async fn update_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(body): Json<UpdateCartRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let quantities = dto::keyed_quantities(body.quantities);
    let cart = services
        .update_cart(&principal.actor(), &quantities)
        .or_redirect(CART)?;
    Ok(Json(CartResponse::from(&cart)))
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(item_id): Path<u32>,
) -> Result<Json<CartResponse>, ApiError> {
    let actor = principal.actor();
    services
        .remove_from_cart(&actor, ItemId(item_id))
        .or_redirect(CART)?;
    Ok(Json(CartResponse::from(&services.cart(&actor))))
}

pub async fn submit_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<Response, ApiError> {
    let order = services.submit_cart(&principal.actor()).or_redirect(CART)?;
    Ok((StatusCode::CREATED, Json(order)).into_response())
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    Json(services.requester_orders(principal.user_id()))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<u64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = services
        .requester_order(principal.user_id(), TransferOrderId(id))
        .or_redirect(ORDERS)?;
    Ok(Json(detail))
}

pub async fn confirm_received(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let order = services
        .confirm_received(&principal.actor(), TransferOrderId(id))
        .or_redirect(ORDERS)?;
    Ok(Json(order).into_response())
}

pub async fn report(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<ReportFilter>,
) -> impl IntoResponse {
    reports::interactive(&services, &filter)
}

pub async fn report_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<ReportFilter>,
) -> Result<Response, ApiError> {
    reports::export(&services, ReportKind::Requester, &filter)
}

pub async fn order_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    reports::export_order(&services, ReportKind::Requester, TransferOrderId(id))
}
