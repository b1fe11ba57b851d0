//! JSON response envelope shared by every endpoint.
//!
//! All handlers, success and failure alike, reply with:
//!
//! ```json
//! { "statusCode": 200, "success": true, "message": "...", "meta": {...}, "data": ... }
//! ```
//!
//! `meta` only appears on paginated listings.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Pagination metadata for list endpoints.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Meta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

/// The response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub success: bool,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// A 200 OK envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, Some(data))
    }

    /// A 201 Created envelope.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, Some(data))
    }

    /// A 200 OK envelope whose `data` is explicitly `null`.
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, message, None)
    }

    /// An envelope with an arbitrary success status.
    pub fn with_status(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status_code: status.as_u16(),
            success: true,
            message: Some(message.into()),
            meta: None,
            data,
        }
    }

    /// Attach pagination metadata.
    #[must_use]
    pub const fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}
