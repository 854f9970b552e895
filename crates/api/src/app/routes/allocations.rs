//! Allocation routes: commands in, read model out.

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use stockroom_allocation::{Allocate, AllocationMessage, CreateBatch};
use stockroom_core::{BatchRef, OrderId};
use stockroom_infra::{App, views};

use crate::app::dto::AllocateResponse;
use crate::app::errors;

pub fn router() -> Router {
    Router::new()
        .route("/add_batch", post(add_batch))
        .route("/allocate", post(allocate))
        .route("/allocations/:orderid", get(allocations_view))
}

/// POST /add_batch
pub async fn add_batch(Extension(app): Extension<App>, Json(body): Json<CreateBatch>) -> axum::response::Response {
    match dispatch(app, body).await {
        Ok(_) => (StatusCode::CREATED, "OK").into_response(),
        Err(response) => response,
    }
}

/// POST /allocate
pub async fn allocate(Extension(app): Extension<App>, Json(body): Json<Allocate>) -> axum::response::Response {
    match dispatch(app, body).await {
        Ok(batchref) => (StatusCode::CREATED, Json(AllocateResponse { batchref })).into_response(),
        Err(response) => response,
    }
}

/// GET /allocations/:orderid
pub async fn allocations_view(
    Extension(app): Extension<App>,
    Path(orderid): Path<String>,
) -> axum::response::Response {
    let orderid = OrderId::new(orderid);
    let result = tokio::task::spawn_blocking(move || {
        let mut uow = app.uow();
        views::allocations(&orderid, uow.as_mut())
    })
    .await;

    match result {
        Ok(Ok(rows)) if rows.is_empty() => {
            errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found")
        }
        Ok(Ok(rows)) => Json(rows).into_response(),
        Ok(Err(e)) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "read_model_error", e.to_string()),
        Err(e) => errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string()),
    }
}

/// Run the (blocking) message bus off the async runtime.
async fn dispatch<M>(app: App, message: M) -> Result<Option<BatchRef>, axum::response::Response>
where
    M: Into<AllocationMessage> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || app.handle(message)).await;

    match result {
        Ok(Ok(handled)) => Ok(handled.output.flatten()),
        Ok(Err(e)) => Err(errors::app_error_to_response(e)),
        Err(e) => Err(errors::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            e.to_string(),
        )),
    }
}
