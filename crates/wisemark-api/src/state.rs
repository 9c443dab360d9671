//! Shared application state.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};

use wisemark_db::Database;

use crate::config::RateLimitConfig;

/// Global rate limiter type (direct quota, no per-client buckets).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Self {
        self.rate_limiter = build_rate_limiter(config).map(Arc::new);
        self
    }
}

/// `None` when disabled or when the configured numbers are zero.
pub fn build_rate_limiter(config: &RateLimitConfig) -> Option<GlobalRateLimiter> {
    if !config.enabled {
        return None;
    }
    let burst = NonZeroU32::new(u32::try_from(config.requests).unwrap_or(u32::MAX))?;
    let quota = Quota::with_period(Duration::from_secs(config.period_secs))?.allow_burst(burst);
    Some(RateLimiter::direct(quota))
}
