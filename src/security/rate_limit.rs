//! Per-client rate limiting middleware.
//!
//! Clients are keyed by the `X-User-ID` set by the authentication layer
//! when present, otherwise by peer IP. Rejections answer 429 before the
//! request reaches routing or the circuit breakers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::forward::X_USER_ID;
use crate::http::response::DispatchError;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

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

    /// True once the bucket would have refilled to `capacity` by `now`.
    fn is_full(&self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens + elapsed * refill_rate >= capacity
    }
}

/// How often idle buckets are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Buckets {
    by_client: HashMap<String, TokenBucket>,
    last_sweep: Instant,
}

/// Token buckets for recently active clients.
///
/// A full bucket behaves exactly like a missing one, so buckets that have
/// refilled completely are dropped on the next sweep.
pub struct RateLimiter {
    buckets: Mutex<Buckets>,
    rps: f64,
    burst: f64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(Buckets {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            rps: f64::from(config.requests_per_second),
            burst: f64::from(config.burst_size),
        }
    }

    /// Take one token from `key`'s bucket.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if buckets.last_sweep.elapsed() >= SWEEP_INTERVAL {
            self.sweep(&mut buckets);
        }

        let bucket = buckets
            .by_client
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.burst));

        bucket.try_acquire(self.burst, self.rps)
    }

    /// Drop every bucket that has refilled completely. Returns how many.
    pub fn evict_idle(&self) -> usize {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        self.sweep(&mut buckets)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_client
            .len()
    }

    fn sweep(&self, buckets: &mut Buckets) -> usize {
        let now = Instant::now();
        let before = buckets.by_client.len();
        buckets
            .by_client
            .retain(|_, bucket| !bucket.is_full(now, self.burst, self.rps));
        buckets.last_sweep = now;

        let evicted = before - buckets.by_client.len();
        if evicted > 0 {
            tracing::debug!(
                evicted,
                remaining = buckets.by_client.len(),
                "Evicted idle rate limit buckets"
            );
        }
        evicted
    }
}

/// Client key for a request: (key, kind) where kind is "user" or "ip".
fn client_key(request: &Request<Body>) -> (String, &'static str) {
    if let Some(user) = request.headers().get(X_USER_ID).and_then(|v| v.to_str().ok()) {
        return (format!("user:{user}"), "user");
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => (format!("ip:{}", addr.ip()), "ip"),
        None => ("ip:unknown".to_string(), "ip"),
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (key, kind) = client_key(&request);

    if limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited(kind);
        DispatchError::RateLimited.into_response()
    }
}
