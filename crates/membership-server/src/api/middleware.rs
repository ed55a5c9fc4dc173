//! Rate limiting, request logging and panic recovery.

use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::any::Any;
use std::{num::NonZeroU32, sync::Arc};
use tracing::{debug, error, info, warn};

/// Global rate limiter (not keyed by caller).
pub type GlobalLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const FALLBACK_PER_MINUTE: u32 = 600;

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    pub global: Arc<GlobalLimiter>,
}

impl RateLimitState {
    /// Allow `requests_per_minute` across all callers. Zero falls back to the default.
    pub fn new(requests_per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(requests_per_minute)
            .or(NonZeroU32::new(FALLBACK_PER_MINUTE))
            .unwrap_or(NonZeroU32::MIN);

        Self {
            global: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Create a permissive rate limiter for testing.
    pub fn permissive() -> Self {
        Self::new(100_000)
    }
}

/// Rejects with 429 once the global quota is spent.
pub async fn rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if rate_limit.global.check().is_err() {
        warn!(uri = %request.uri(), "Global rate limit exceeded");
        return Err(ApiError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}

/// Logging middleware for requests.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    debug!(%method, %uri, "Request started");

    let response = next.run(request).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_success() {
        info!(%method, %uri, %status, latency_ms, "Request completed");
    } else {
        warn!(%method, %uri, %status, latency_ms, "Request failed");
    }

    response
}

/// Response for a handler that panicked. The panic hook has already
/// written the details to the status log.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };

    error!(%detail, "Handler panicked");
    ApiError::internal("Internal server error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_rate_limit_exhaustion() {
        let state = RateLimitState::new(1);

        assert_ok!(state.global.check());
        assert_err!(state.global.check());
    }

    #[test]
    fn test_zero_limit_uses_default() {
        let state = RateLimitState::new(0);
        for _ in 0..100 {
            assert!(state.global.check().is_ok());
        }
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(String::from("boom")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
