//! Supplier branch: order queue, picking, dispatch and reports.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use stocklink_auth::{Access, BranchRole};
use stocklink_reports::{ReportFilter, ReportKind};
use stocklink_transfers::{ItemId, OrderView, TransferOrderId};

use crate::app::dto::{self, CountResponse, PollResponse, SetSentQuantitiesRequest};
use crate::app::errors::{ApiError, OrRedirect};
use crate::app::routes::reports;
use crate::app::services::{AppServices, OrderDetail};
use crate::context::PrincipalContext;
use crate::middleware;

const ORDERS: &str = "/austin/orders";

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order).post(set_sent_quantities))
        .route("/orders/:id/start-picking", post(start_picking))
        .route("/orders/:id/dispatch", post(dispatch))
        .route("/orders/:id/items/:item_id/ok", post(mark_item_fulfilled))
        .route("/report", get(report))
        .route("/report/pdf", get(report_pdf))
        .route("/report/pdf/:id", get(order_pdf))
        .route("/api/badge", get(badge))
        .route("/api/poll", get(poll))
        .route_layer(axum::middleware::from_fn_with_state(
            Access::Branch(BranchRole::Supplier),
            middleware::require_access,
        ))
}

pub async fn list_orders(Extension(services): Extension<Arc<AppServices>>) -> Json<Vec<OrderView>> {
    Json(services.supplier_orders())
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<u64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let detail = services.order_detail(TransferOrderId(id)).or_redirect(ORDERS)?;
    Ok(Json(detail))
}

pub async fn set_sent_quantities(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<u64>,
    Json(body): Json<SetSentQuantitiesRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let order = services
        .set_sent_quantities(
            &principal.actor(),
            TransferOrderId(id),
            dto::keyed_quantities(body.quantities),
            body.notes,
        )
        .or_redirect(ORDERS)?;
    Ok(Json(order))
}

pub async fn start_picking(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<u64>,
) -> Result<Json<OrderView>, ApiError> {
    let order = services
        .start_picking(&principal.actor(), TransferOrderId(id))
        .or_redirect(ORDERS)?;
    Ok(Json(order))
}

pub async fn dispatch(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<u64>,
) -> Result<Json<OrderView>, ApiError> {
    let order = services
        .dispatch(&principal.actor(), TransferOrderId(id))
        .or_redirect(ORDERS)?;
    Ok(Json(order))
}

pub async fn mark_item_fulfilled(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, item_id)): Path<(u64, u32)>,
) -> Result<Json<OrderView>, ApiError> {
    let order = services
        .mark_item_fulfilled(&principal.actor(), TransferOrderId(id), ItemId(item_id))
        .or_redirect(ORDERS)?;
    Ok(Json(order))
}

pub async fn badge(Extension(services): Extension<Arc<AppServices>>) -> Json<CountResponse> {
    Json(CountResponse {
        count: services.submitted_count(),
    })
}

pub async fn poll(Extension(services): Extension<Arc<AppServices>>) -> Json<PollResponse> {
    Json(PollResponse {
        count: services.submitted_count(),
        newest_id: services.newest_submitted().map_or(0, |id| id.0),
    })
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
    reports::export(&services, ReportKind::Supplier, &filter)
}

pub async fn order_pdf(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    reports::export_order(&services, ReportKind::Supplier, TransferOrderId(id))
}
