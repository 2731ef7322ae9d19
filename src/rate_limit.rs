//! Rate limiting for credential endpoints.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password
//! guessing and signup spam.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{num::NonZeroU32, sync::Arc, time::Duration};
use tracing::warn;

use crate::api::ApiError;
use crate::auth::{ClientIpHeader, extract_client_ip};

const LOGIN_PER_MIN: NonZeroU32 = NonZeroU32::new(10).unwrap();
const LOGIN_BURST: NonZeroU32 = NonZeroU32::new(5).unwrap();
const REGISTER_PER_MIN: NonZeroU32 = NonZeroU32::new(3).unwrap();

/// Interval between sweeps of idle per-IP buckets.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub struct RateLimitConfig {
    /// Login: 10 requests per minute per IP, bursts of 5
    pub login: IpLimiter,
    /// Registration: 3 requests per minute per IP
    pub register: IpLimiter,
    /// Where the client address comes from when running behind a proxy
    pub ip_header: Option<ClientIpHeader>,
}

impl RateLimitConfig {
    pub fn new(ip_header: Option<ClientIpHeader>) -> Self {
        Self {
            login: RateLimiter::keyed(Quota::per_minute(LOGIN_PER_MIN).allow_burst(LOGIN_BURST)),
            register: RateLimiter::keyed(Quota::per_minute(REGISTER_PER_MIN)),
            ip_header,
        }
    }

    /// Forget clients whose buckets have fully refilled.
    pub fn retain_recent(&self) {
        self.login.retain_recent();
        self.login.shrink_to_fit();
        self.register.retain_recent();
        self.register.shrink_to_fit();
    }

    fn check(&self, limiter: &IpLimiter, request: &Request) -> Result<(), ApiError> {
        let ip = extract_client_ip(request, self.ip_header).map_err(|reason| {
            warn!(reason, "Unable to determine client IP");
            ApiError::forbidden("Unable to determine client IP")
        })?;

        limiter.check_key(&ip).map_err(|_| {
            warn!(ip = %ip, path = %request.uri().path(), "Rate limit exceeded");
            ApiError::too_many_requests("Too many requests. Please try again later.")
        })
    }
}

/// Spawn a background task that sweeps idle buckets periodically.
/// The task ends once the limiters have been dropped.
pub fn spawn_cleanup_scheduler(config: &Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    let config = Arc::downgrade(config);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

        loop {
            interval.tick().await;
            let Some(config) = config.upgrade() else {
                break;
            };
            config.retain_recent();
        }
    })
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.check(&config.login, &request) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

/// Middleware for rate limiting registrations.
pub async fn rate_limit_register(
    State(config): State<Arc<RateLimitConfig>>,
    request: Request,
    next: Next,
) -> Response {
    match config.check(&config.register, &request) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
