//! HTTP error response handling for the API
//!
//! Domain errors become JSON bodies with the status code from [`ToHttpStatus`].

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// A 404 with the standard error body
pub fn not_found(resource: impl Into<String>) -> Response {
    (StatusCode::NOT_FOUND, Json(ApiError::not_found(resource))).into_response()
}
