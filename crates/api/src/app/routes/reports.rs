//! Report handlers shared by both branch route groups.

use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use stocklink_reports::{ReportFilter, ReportKind};
use stocklink_transfers::{OrderView, TransferOrderId};

use crate::app::errors::{ApiError, OrRedirect};
use crate::app::services::AppServices;

fn report_view(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Supplier => "/austin/report",
        ReportKind::Requester => "/queimados/report",
    }
}

/// On-screen report.
pub fn interactive(services: &AppServices, filter: &ReportFilter) -> Json<Vec<OrderView>> {
    Json(services.report(filter))
}

pub fn export(services: &AppServices, kind: ReportKind, filter: &ReportFilter) -> Result<Response, ApiError> {
    let bytes = services.report_pdf(kind, filter).or_redirect(report_view(kind))?;
    Ok(pdf_response(bytes, &kind.filename()))
}

pub fn export_order(services: &AppServices, kind: ReportKind, order_id: TransferOrderId) -> Result<Response, ApiError> {
    let bytes = services.order_pdf(kind, order_id).or_redirect(report_view(kind))?;
    Ok(pdf_response(bytes, &kind.order_filename(order_id)))
}

fn pdf_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response()
}
