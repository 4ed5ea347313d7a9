//! Rate limiting middleware using Governor.
//!
//! Per-token token bucket keyed on the token verified by the auth layer.
//! Everything else, including public routes carrying an unverified header,
//! shares the `anonymous` bucket.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc, time::Duration};

use super::auth::AuthenticatedToken;

const ANONYMOUS_KEY: &str = "anonymous";

/// Requests per minute when nothing is configured.
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 100;

/// Rate limiter state shared across requests.
pub struct RateLimiterState {
    limiters: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    quota: Quota,
}

impl Default for RateLimiterState {
    fn default() -> Self {
        Self::new(DEFAULT_REQUESTS_PER_MINUTE, Duration::from_secs(60))
    }
}

impl RateLimiterState {
    /// Allows `requests` per `period`, all of them usable as a burst.
    ///
    /// Zero values are clamped to the smallest valid quota.
    pub fn new(requests: u32, period: Duration) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let replenish = period / burst.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiters: DashMap::new(),
            quota,
        }
    }

    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)));

        limiter.check().is_ok()
    }
}

/// Rate limiting middleware.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = request
        .extensions()
        .get::<AuthenticatedToken>()
        .map(|token| token.0.to_string())
        .unwrap_or_else(|| ANONYMOUS_KEY.to_string());

    if !limiter.check(&key) {
        tracing::warn!("Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": 60
            })),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiterState::new(2, Duration::from_secs(60));

        assert!(limiter.check("a"));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
        // Separate bucket per key.
        assert!(limiter.check("b"));
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        let limiter = RateLimiterState::new(0, Duration::from_secs(60));
        assert!(limiter.check("a"));
        assert!(!limiter.check("a"));
    }
}
