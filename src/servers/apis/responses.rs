//! JSON error responses for the admin API.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The `{"error": "..."}` body every failed API call answers with.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

#[must_use]
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// `401` when the Basic credentials are missing or wrong.
#[must_use]
pub fn authentication_failed() -> Response {
    error_response(StatusCode::UNAUTHORIZED, "Authentication failed")
}

/// `429` when the per-IP request budget is spent.
#[must_use]
pub fn rate_limit_exceeded() -> Response {
    error_response(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
}

/// `405` for anything but `GET`: the API is read-only.
#[must_use]
pub fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// `404` for unknown API paths.
#[must_use]
pub fn undefined_api_call() -> Response {
    error_response(StatusCode::NOT_FOUND, "Undefined API call")
}

/// `400` when a path id is not a positive integer.
#[must_use]
pub fn invalid_integer_id() -> Response {
    error_response(StatusCode::BAD_REQUEST, "Invalid integer ID")
}

/// `503` when the API is disabled in the configuration.
#[must_use]
pub fn api_disabled() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "API is currently disabled")
}

/// `503` when the store cannot answer.
#[must_use]
pub fn tracker_error() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "tracker error")
}
