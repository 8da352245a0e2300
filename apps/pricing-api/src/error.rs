//! # API Error Types
//!
//! [`ApiError`] is the only error a handler returns. It maps core and
//! database errors to HTTP status codes and a JSON body:
//!
//! ```text
//! {"error": {"code": "VALIDATION_ERROR", "message": "items must not be empty"}}
//! ```
//!
//! | Variant         | Status | Code               |
//! |-----------------|--------|--------------------|
//! | `Validation`    | 400    | `VALIDATION_ERROR` |
//! | `LookupFailure` | 503    | `LOOKUP_FAILURE`   |
//! | `Internal`      | 500    | `INTERNAL_ERROR`   |
//!
//! Lookup and internal messages are logged, never returned.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use quickshop_core::{CoreError, ValidationError};
use quickshop_db::DbError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, or an unknown store (400).
    #[error("{0}")]
    Validation(String),

    /// The rule store could not be read (503).
    #[error("lookup failed: {0}")]
    LookupFailure(String),

    /// Anything else (500).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::LookupFailure(_) => (StatusCode::SERVICE_UNAVAILABLE, "LOOKUP_FAILURE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Validation(message) => message.clone(),
            Self::LookupFailure(_) => "Pricing data is temporarily unavailable".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
        };

        match &self {
            Self::Validation(_) => tracing::debug!(error = %self, "request rejected"),
            Self::LookupFailure(_) => tracing::error!(error = %self, "rule lookup failed"),
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => e.into(),
        }
    }
}

/// An unreachable store is a lookup failure. Bad rows and failed queries
/// are internal errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if err.is_unavailable() {
            Self::LookupFailure(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

/// Unparseable JSON bodies are validation failures like any other.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_and_code(),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
        assert_eq!(
            ApiError::LookupFailure("x".into()).status_and_code(),
            (StatusCode::SERVICE_UNAVAILABLE, "LOOKUP_FAILURE")
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }

    #[tokio::test]
    async fn test_validation_message_is_returned() {
        let err: ApiError = ValidationError::required("storeId").into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error.code, "VALIDATION_ERROR");
        assert!(body.error.message.contains("storeId"));
    }

    #[tokio::test]
    async fn test_lookup_details_are_hidden() {
        let err: ApiError = DbError::ConnectionFailed("disk I/O error at /secret/path".into()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error.code, "LOOKUP_FAILURE");
        assert!(!body.error.message.contains("/secret/path"));
    }

    #[tokio::test]
    async fn test_unreadable_row_is_internal() {
        let err: ApiError =
            DbError::invalid_row("DiscountCode", "dc-1", "buy_quantity out of range: 0").into();
        assert!(matches!(err, ApiError::Internal(_)));

        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("buy_quantity"));
    }

    #[test]
    fn test_pool_exhaustion_is_lookup_failure() {
        let err: ApiError = DbError::PoolExhausted.into();
        assert!(matches!(err, ApiError::LookupFailure(_)));
    }
}
