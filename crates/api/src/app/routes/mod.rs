use axum::{routing::get, Router};

pub mod admin;
pub mod austin;
pub mod queimados;
pub mod reports;
pub mod system;

/// Router for all authenticated endpoints.
///
/// Branch and admin groups carry their own access gate.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::landing))
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/orders/:id/poll", get(system::order_poll))
        .nest("/queimados", queimados::router())
        .nest("/austin", austin::router())
        .nest("/admin", admin::router())
}
