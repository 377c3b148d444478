//! API error types and response handling.
//!
//! A unified error type for all API handlers with automatic conversion to
//! HTTP responses.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ridefare_core::FareError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 422 Unprocessable Entity - Well-formed JSON that does not fit the schema.
    UnprocessableEntity {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 503 Service Unavailable - A maps provider is unavailable.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "INVALID_INPUT",
    "message": "Invalid pricing request: trip_distance_miles must not be negative, got -1",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code.
    #[schema(example = "INVALID_INPUT")]
    pub error: String,

    /// Human-readable error message.
    pub message: String,

    /// Optional additional details.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// A 400 with the `INVALID_INPUT` code.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::BadRequest {
            error_code: "INVALID_INPUT".to_string(),
            message: message.into(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (Self::BadRequest { error_code, message }
        | Self::UnprocessableEntity { error_code, message }
        | Self::InternalError { error_code, message }
        | Self::ServiceUnavailable { error_code, message }) = self;

        if status.is_server_error() {
            tracing::error!(error_code = %error_code, message = %message, "request failed");
        }

        let body = ErrorResponse {
            error: error_code,
            message,
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::UnprocessableEntity { message, .. } => {
                write!(f, "Unprocessable Entity: {message}")
            }
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<FareError> for ApiError {
    fn from(err: FareError) -> Self {
        let error_code = err.error_code().to_string();
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::BadRequest {
                error_code,
                message,
            },
            503 => Self::ServiceUnavailable {
                error_code,
                message,
            },
            _ => Self::InternalError {
                error_code,
                message,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection {
            JsonRejection::JsonDataError(_) => Self::UnprocessableEntity {
                error_code: "INVALID_REQUEST_BODY".to_string(),
                message,
            },
            _ => Self::BadRequest {
                error_code: "MALFORMED_REQUEST_BODY".to_string(),
                message,
            },
        }
    }
}
