//! Response envelope and error translation shared by every service.
//!
//! DESIGN
//! ======
//! Every endpoint answers with `{ code, status, message, data }`. Service
//! errors implement [`ErrorCode`] so route handlers can return them with `?`
//! and get a consistent envelope. Server-side failures are logged here and
//! replaced by a generic message so SQL or upstream details never leak.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

const SUCCESS_MESSAGE: &str = "SUCCESS";

// =============================================================================
// ENVELOPE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub status: String,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    #[must_use]
    pub fn of(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self { code: status.as_u16(), status: status_name(status), message: message.into(), data }
    }

    #[must_use]
    pub fn ok(data: T) -> Self {
        Self::of(StatusCode::OK, SUCCESS_MESSAGE, data)
    }

    #[must_use]
    pub fn created(data: T) -> Self {
        Self::of(StatusCode::CREATED, SUCCESS_MESSAGE, data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// `StatusCode::NOT_FOUND` -> `"NOT_FOUND"`.
#[must_use]
pub fn status_name(status: StatusCode) -> String {
    status
        .canonical_reason()
        .unwrap_or("UNKNOWN")
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}

// =============================================================================
// ERRORS
// =============================================================================

/// Stable machine-readable classification for service errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn status(&self) -> StatusCode;
}

/// Error half of every handler's `Result`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self { status, code, message: message.into() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "E_UNAUTHORIZED", "로그인이 필요합니다.")
    }
}

impl<E: ErrorCode> From<E> for ApiError {
    fn from(err: E) -> Self {
        let status = err.status();
        let code = err.error_code();
        if status.is_server_error() {
            tracing::error!(code, error = %err, "request failed");
            let message = status.canonical_reason().unwrap_or("Internal Server Error");
            return Self::new(status, code, message);
        }
        Self::new(status, code, err.to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorData {
    error_code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::of(self.status, self.message, ErrorData { error_code: self.code });
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "response_test.rs"]
mod tests;
