//! HTTP error handling for the retrieval endpoint.
//!
//! This module converts core library errors into HTTP responses with JSON
//! error bodies. Public messages are fixed per error code so that nothing
//! about the stored path or internal state reaches the client.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// API error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// Error code (e.g., "E004" for an unknown link)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Human-readable error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error with code and message.
    #[must_use]
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Create an internal server error.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            code: None,
            message: "Internal Server Error".to_string(),
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_deref() {
            Some("E001") => StatusCode::METHOD_NOT_ALLOWED,
            Some("E002") => StatusCode::TOO_MANY_REQUESTS,
            Some("E003") => StatusCode::FORBIDDEN,
            Some("E004" | "E006") => StatusCode::NOT_FOUND,
            Some("E005") => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self)).into_response();

        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("GET"));
        }

        response
    }
}

impl From<crate::error::Error> for ApiError {
    fn from(err: crate::error::Error) -> Self {
        let code = err.code();
        let message = match code {
            Some("E001") => "Method Not Allowed",
            Some("E002") => "Too Many Requests",
            Some("E003") => "Access Denied",
            Some("E004" | "E006") => "Not Found",
            Some("E005") => "Link Expired",
            // Storage failures and uncoded errors are server faults.
            _ => return Self::internal(),
        };

        Self {
            code: code.map(String::from),
            message: message.to_string(),
        }
    }
}

/// Result type for web handlers.
pub type ApiResult<T> = Result<T, ApiError>;
