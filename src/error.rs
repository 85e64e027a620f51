//! API error surface.
//!
//! DESIGN
//! ======
//! Every service error carries a grepable `E_*` code and a retryable flag
//! through the [`ErrorCode`] trait. HTTP handlers wrap them in [`ApiError`],
//! which renders as a JSON body so the client can show the message and
//! decide whether resubmitting the failing action makes sense. No error is
//! fatal to the process.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Grepable error code and retryable flag for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    pub retryable: bool,
}

/// An HTTP error response: status plus structured body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new<E: ErrorCode>(status: StatusCode, err: &E) -> Self {
        Self {
            status,
            body: ErrorBody { code: err.error_code(), message: err.to_string(), retryable: err.retryable() },
        }
    }

    /// Like [`ApiError::new`] but with an extra hint appended to the message.
    pub fn with_hint<E: ErrorCode>(status: StatusCode, err: &E, hint: &str) -> Self {
        let mut api = Self::new(status, err);
        api.body.message = format!("{err}. {hint}");
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
