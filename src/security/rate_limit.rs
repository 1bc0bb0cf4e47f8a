use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;

use super::auth::ApiKey;
use crate::AppState;
use crate::error::ApiError;

/// Bucket shared by callers that present no API key.
const ANONYMOUS: &str = "anonymous";

/// Token-bucket limiter keyed by API key.
pub struct AppRateLimiter {
    limiter: DefaultKeyedRateLimiter<String>,
}

impl std::fmt::Debug for AppRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRateLimiter")
            .field("keys", &self.limiter.len())
            .finish()
    }
}

impl AppRateLimiter {
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        let burst = NonZeroU32::new(burst_size).unwrap_or(rate);
        Self {
            limiter: RateLimiter::keyed(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    pub fn check(&self, key: &str) -> bool {
        let allowed = self.limiter.check_key(&key.to_string()).is_ok();
        if self.limiter.len() > 10_000 {
            self.limiter.retain_recent();
        }
        allowed
    }
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.resilience.rate_limit_enabled {
        let key = req
            .extensions()
            .get::<ApiKey>()
            .map_or(ANONYMOUS, |k| k.0.as_str());
        if !state.rate_limiter.check(key) {
            metrics::counter!("recallbricks_rate_limited_total").increment(1);
            return Err(ApiError::RateLimited);
        }
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_is_enforced_per_key() {
        let limiter = AppRateLimiter::new(1, 3);

        assert!(limiter.check("rb_key_a"));
        assert!(limiter.check("rb_key_a"));
        assert!(limiter.check("rb_key_a"));
        assert!(!limiter.check("rb_key_a"));

        // Separate bucket.
        assert!(limiter.check("rb_key_b"));
    }

    #[test]
    fn zero_rate_falls_back_to_one() {
        let limiter = AppRateLimiter::new(0, 0);
        assert!(limiter.check(ANONYMOUS));
        assert!(!limiter.check(ANONYMOUS));
    }
}
