//! JSON request body extractor.

use crate::error::ApiError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

/// `axum::Json` with failures reported as `VALIDATION_ERROR`.
///
/// The content type is not checked and an empty body reads as `{}`, so a
/// bare request still reaches the handler's missing-field checks.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;

        parse_body(&bytes).map(ApiJson)
    }
}

fn parse_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ApiError> {
    let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        bytes
    };

    serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::SendOtpRequest;
    use serde_json::Value;

    #[test]
    fn test_empty_body_is_empty_object() {
        let request: SendOtpRequest = parse_body(b"").unwrap();
        assert!(request.phone.is_none());

        let value: Value = parse_body(b"  \n").unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[test]
    fn test_malformed_body_is_validation_error() {
        let result = parse_body::<Value>(br#"{"phone": "0317"#);
        assert!(matches!(result, Err(ApiError::Validation(ref m)) if m.starts_with("Invalid request body")));
    }
}
