use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use serde_json::json;

use stocklink_infra::command_dispatcher::DispatchError;

use crate::app::services::ServiceError;

/// An error response plus the view the client should fall back to.
#[derive(Debug)]
pub struct ApiError {
    error: ServiceError,
    redirect: &'static str,
}

impl ApiError {
    pub fn new(error: impl Into<ServiceError>, redirect: &'static str) -> Self {
        Self {
            error: error.into(),
            redirect,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        service_error_to_response(self.error, Some(self.redirect))
    }
}

/// Attach a fallback view to any service error.
pub trait OrRedirect<T> {
    fn or_redirect(self, redirect: &'static str) -> Result<T, ApiError>;
}

impl<T, E: Into<ServiceError>> OrRedirect<T> for Result<T, E> {
    fn or_redirect(self, redirect: &'static str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::new(e, redirect))
    }
}

pub fn service_error_to_response(err: ServiceError, redirect: Option<&str>) -> Response {
    match err {
        ServiceError::Dispatch(e) => dispatch_error_to_response(e, redirect),
        ServiceError::ReadModel(e) => {
            tracing::warn!(error = %e, "read model update failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "read_model_error", e.to_string(), redirect)
        }
        ServiceError::Report(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "report_error", e.to_string(), redirect)
        }
        ServiceError::Startup(e) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "startup_error", e.to_string(), redirect)
        }
    }
}

pub fn dispatch_error_to_response(err: DispatchError, redirect: Option<&str>) -> Response {
    match err {
        DispatchError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg, redirect)
        }
        DispatchError::InvalidTransition(msg) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", msg, redirect)
        }
        DispatchError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg, redirect),
        DispatchError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg, redirect)
        }
        DispatchError::PermissionDenied => Redirect::to("/").into_response(),
        DispatchError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found", redirect),
        DispatchError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg, redirect)
        }
        DispatchError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
            redirect,
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    redirect: Option<&str>,
) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "redirect": redirect,
        })),
    )
        .into_response()
}
