use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};

use stocklink_transfers::TransferOrderId;

use crate::app::dto::StatusResponse;
use crate::app::errors::{self, ApiError, OrRedirect};
use crate::app::services::{self, AppServices};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    let p = principal.principal();
    Json(serde_json::json!({
        "user_id": p.user_id.to_string(),
        "username": p.username,
        "roles": p.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
        "branch": p.branch_role.map(|b| b.group()),
        "is_admin": p.is_admin(),
        "cart_count": services.cart_count(p.user_id),
    }))
}

/// Send the caller to their branch's landing page.
pub async fn landing(Extension(principal): Extension<PrincipalContext>) -> Response {
    match principal.branch_role() {
        Some(role) => Redirect::to(role.landing_path()).into_response(),
        None if principal.principal().is_admin() => Redirect::to("/admin/products").into_response(),
        None => errors::json_error(
            StatusCode::FORBIDDEN,
            "no_branch_role",
            "user belongs to no branch group",
            None,
        ),
    }
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Sse<impl tokio_stream::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>> {
    services::order_sse_stream(services)
}

/// Lightweight status poll used by open order pages.
pub async fn order_poll(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<u64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let order = services.order(TransferOrderId(id)).or_redirect("/")?;
    Ok(Json(StatusResponse::from(&order)))
}
