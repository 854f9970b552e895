use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockroom_core::DomainError;
use stockroom_events::BusError;
use stockroom_infra::{AppError, HandlerError};

pub fn app_error_to_response(err: AppError) -> axum::response::Response {
    match err {
        BusError::UnregisteredCommand(command) => json_error(
            StatusCode::BAD_REQUEST,
            "unregistered_command",
            format!("no handler registered for command `{command}`"),
        ),
        BusError::Handler(e) => handler_error_to_response(e),
    }
}

pub fn handler_error_to_response(err: HandlerError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        HandlerError::InvalidSku(_) => json_error(StatusCode::BAD_REQUEST, "invalid_sku", message),
        HandlerError::UnknownBatch(_) => json_error(StatusCode::NOT_FOUND, "unknown_batch", message),
        HandlerError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        HandlerError::Domain(DomainError::InvariantViolation(_)) => {
            json_error(StatusCode::BAD_REQUEST, "invariant_violation", message)
        }
        HandlerError::Domain(DomainError::NotFound(_)) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        HandlerError::Domain(DomainError::Conflict(_)) => json_error(StatusCode::CONFLICT, "conflict", message),
        HandlerError::UnitOfWork(e) if e.is_conflict() => json_error(StatusCode::CONFLICT, "conflict", message),
        HandlerError::Publish(_) => json_error(StatusCode::BAD_GATEWAY, "publish_error", message),
        other => {
            tracing::error!(error = %other, "request failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
