//! The JSON failure contract: `{"success": false, "error": <text>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use flowgic_infra::command_dispatcher::DispatchError;

pub const PERMISSION_DENIED: &str = "Permission denied";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const ORDER_NOT_FOUND: &str = "Order not found";
pub const VEHICLE_NOT_FOUND: &str = "Vehicle not found";
pub const CSRF_FAILED: &str = "CSRF verification failed";
pub const CONFLICT: &str = "The order was modified concurrently, please retry";
pub const INTERNAL: &str = "Internal server error";

pub fn json_failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": message.into(),
        })),
    )
        .into_response()
}

pub fn forbidden() -> Response {
    json_failure(StatusCode::FORBIDDEN, PERMISSION_DENIED)
}

pub fn not_found() -> Response {
    json_failure(StatusCode::NOT_FOUND, ORDER_NOT_FOUND)
}

pub fn vehicle_not_found() -> Response {
    json_failure(StatusCode::NOT_FOUND, VEHICLE_NOT_FOUND)
}

pub fn bad_request(message: impl Into<String>) -> Response {
    json_failure(StatusCode::BAD_REQUEST, message)
}

pub fn dispatch_error_to_response(err: DispatchError) -> Response {
    match err {
        DispatchError::Validation(msg) | DispatchError::InvariantViolation(msg) => {
            json_failure(StatusCode::BAD_REQUEST, msg)
        }
        DispatchError::NotFound => not_found(),
        DispatchError::Concurrency(msg) => {
            tracing::warn!(error = %msg, "write conflict survived retries");
            json_failure(StatusCode::CONFLICT, CONFLICT)
        }
        DispatchError::Unauthorized => forbidden(),
        DispatchError::TenantIsolation(msg) => {
            tracing::error!(error = %msg, "company isolation violation");
            forbidden()
        }
        err @ (DispatchError::Deserialize(_) | DispatchError::Store(_)) => {
            tracing::error!(error = %err, "order command failed");
            json_failure(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL)
        }
    }
}
