//! HTTP API application wiring (Axum router).
//!
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses
//!
//! Handlers never touch storage directly: writes go through the message bus,
//! reads through the allocations view.

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use stockroom_infra::App;

pub mod dto;
pub mod errors;
pub mod routes;

/// Build the full HTTP router around a bootstrapped [`App`].
pub fn build_app(app: App) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(app)))
}
