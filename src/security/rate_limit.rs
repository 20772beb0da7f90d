//! Per-client rate limiting middleware.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::error::ApiError;
use crate::http::request::client_ip;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token buckets keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    enabled: bool,
    rps: f64,
    burst: f64,
    idle: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            enabled: config.enabled,
            rps: f64::from(config.requests_per_second),
            burst: f64::from(config.burst_size),
            idle: Duration::from_secs(config.idle_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Take one token for `key`. Returns false when the bucket is empty.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }
        let mut bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst, now));
        bucket.try_acquire(self.burst, self.rps, now)
    }

    /// Drop buckets not touched within the idle window. Returns how many went.
    pub fn prune_idle(&self) -> usize {
        self.prune_idle_at(Instant::now())
    }

    fn prune_idle_at(&self, now: Instant) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_update) < self.idle);
        before - self.buckets.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Periodically prune idle buckets until shutdown is signalled.
    pub async fn run_janitor(self: Arc<Self>, mut shutdown: ShutdownSignal) {
        if !self.enabled {
            return;
        }
        let period = self.idle.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pruned = self.prune_idle();
                    if pruned > 0 {
                        tracing::debug!(pruned, remaining = self.tracked_clients(), "Pruned idle rate limit buckets");
                    }
                }
                _ = shutdown.wait() => {
                    tracing::debug!("Rate limit janitor stopping");
                    break;
                }
            }
        }
    }
}

/// Middleware rejecting clients that exhausted their bucket.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_ip(&request);

    if limiter.check(&client) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(client = %client, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        Err(ApiError::RateLimited { client })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(rps: u32, burst: u32) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            burst_size: burst,
            idle_secs: 60,
        })
    }

    #[test]
    fn test_burst_then_reject() {
        let limiter = limiter(1, 3);
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(!limiter.check_at("10.0.0.1", now));
        // Other clients have their own bucket.
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn test_refill() {
        let limiter = limiter(2, 1);
        let now = Instant::now();
        assert!(limiter.check_at("c", now));
        assert!(!limiter.check_at("c", now));
        assert!(limiter.check_at("c", now + Duration::from_millis(600)));
    }

    #[test]
    fn test_disabled_allows_everything() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        });
        for _ in 0..1000 {
            assert!(limiter.check("c"));
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_prune_idle() {
        let limiter = limiter(1, 1);
        let now = Instant::now();
        limiter.check_at("old", now);
        limiter.check_at("fresh", now + Duration::from_secs(50));
        assert_eq!(limiter.prune_idle_at(now + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
