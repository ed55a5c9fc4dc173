//! Error types for the membership server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use member_store::{OtpError, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error("{0}")]
    NotFound(String),

    /// Permanently disabled operation.
    #[error("{0}")]
    Forbidden(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("{0}")]
    Persistence(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("{0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Otp(OtpError::NotFound) => (StatusCode::BAD_REQUEST, "OTP_NOT_FOUND"),
            ApiError::Otp(OtpError::Expired) => (StatusCode::BAD_REQUEST, "OTP_EXPIRED"),
            ApiError::Otp(OtpError::Mismatch) => (StatusCode::BAD_REQUEST, "OTP_MISMATCH"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::Provider(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            ApiError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            ApiError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!(code, "{}", self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ApiError::NotFound(msg),
            StoreError::Forbidden(msg) => ApiError::Forbidden(msg),
            StoreError::Unavailable(msg) => ApiError::Persistence(msg),
            StoreError::Io(_) | StoreError::Serialization(_) => {
                ApiError::Persistence(e.to_string())
            }
        }
    }
}

impl From<whatsapp_client::WhatsAppError> for ApiError {
    fn from(e: whatsapp_client::WhatsAppError) -> Self {
        ApiError::Provider(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::validation("phone is required"), StatusCode::BAD_REQUEST),
            (ApiError::Otp(OtpError::Expired), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ApiError::Provider("x".into()), StatusCode::BAD_GATEWAY),
            (ApiError::Persistence("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::RateLimitExceeded, StatusCode::TOO_MANY_REQUESTS),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_store_error_conversion() {
        let err: ApiError = StoreError::Forbidden("nope".into()).into();
        assert!(matches!(err, ApiError::Forbidden(ref m) if m == "nope"));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ApiError = StoreError::from(io).into();
        assert!(matches!(err, ApiError::Persistence(_)));

        let err: ApiError = StoreError::Unavailable("read-only".into()).into();
        assert!(matches!(err, ApiError::Persistence(ref m) if m == "read-only"));
    }

    #[test]
    fn test_otp_messages_pass_through() {
        assert_eq!(ApiError::Otp(OtpError::Mismatch).to_string(), "Invalid code");
    }
}
