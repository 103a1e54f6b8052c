//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring and the application operations
//! - `routes/`: HTTP routes + handlers (one file per route group)
//! - `dto.rs`: request/response DTOs and id parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, ServiceError};

/// Build the full HTTP router with fresh in-memory services.
pub fn build_app(config: &AppConfig) -> Result<Router, ServiceError> {
    let services = AppServices::in_memory(config.local_time(), config.realtime_buffer)?;
    Ok(router_with(config.jwt_secret(), Arc::new(services)))
}

/// Build the router over existing services.
pub fn router_with(jwt_secret: String, services: Arc<AppServices>) -> Router {
    let jwt = Arc::new(stocklink_auth::Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
