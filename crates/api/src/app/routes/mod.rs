use axum::Router;

pub mod allocations;
pub mod system;

pub fn router() -> Router {
    allocations::router()
}
