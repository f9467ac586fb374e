//! Per-client token bucket admission control.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::LimiterConfig;
use crate::error::ApiError;
use crate::observability::metrics;

/// Token bucket state for one client.
#[derive(Debug)]
struct ClientBucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl ClientBucket {
    fn full(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_refill: now,
            last_seen: now,
        }
    }

    fn try_acquire(&mut self, now: Instant, capacity: f64, refill_rate: f64) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
        self.last_seen = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Registry of token buckets, one per client identity.
///
/// Buckets live in a sharded map: admitting one client only locks the shard
/// holding its bucket, and the idle sweep takes the same shard locks, so a
/// bucket is never evicted while an admission on it is in progress.
pub struct ClientRegistry {
    buckets: DashMap<String, ClientBucket>,
    settings: ArcSwap<LimiterConfig>,
}

impl ClientRegistry {
    pub fn new(settings: LimiterConfig) -> Self {
        if settings.enabled && !admits_anything(&settings) {
            tracing::warn!(
                rps = settings.requests_per_second,
                burst = settings.burst,
                "Rate limiter configured with a non-positive rate or burst; every request will be rejected"
            );
        }
        Self {
            buckets: DashMap::new(),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Decide whether `client_id` may proceed, spending one token if so.
    pub fn admit(&self, client_id: &str) -> bool {
        let settings = self.settings.load();
        if !settings.enabled {
            return true;
        }
        if !admits_anything(&settings) {
            return false;
        }

        let capacity = settings.burst as f64;
        let rate = settings.requests_per_second;
        let now = Instant::now();

        if let Some(mut bucket) = self.buckets.get_mut(client_id) {
            return bucket.try_acquire(now, capacity, rate);
        }

        self.buckets
            .entry(client_id.to_owned())
            .or_insert_with(|| ClientBucket::full(capacity, now))
            .try_acquire(now, capacity, rate)
    }

    /// Swap in new limiter settings. Existing buckets are clamped to the new
    /// burst on their next refill.
    pub fn reconfigure(&self, settings: LimiterConfig) {
        let current = self.settings.load();
        if **current == settings {
            return;
        }
        tracing::info!(
            enabled = settings.enabled,
            rps = settings.requests_per_second,
            burst = settings.burst,
            "Rate limiter reconfigured"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Remove buckets that have not been seen for `idle`. Returns how many were removed.
    pub fn sweep(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_seen) < idle);
        let removed = before.saturating_sub(self.buckets.len());

        metrics::record_limiter_clients(self.buckets.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.buckets.len(), "Evicted idle client buckets");
        }
        removed
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Spawn the idle-bucket sweep. It exits when `shutdown` fires.
    pub fn spawn_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let interval = Duration::from_secs(self.settings.load().sweep_interval_secs.max(1));
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let idle = Duration::from_secs(self.settings.load().idle_timeout_secs);
                        self.sweep(idle);
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Client bucket sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

fn admits_anything(settings: &LimiterConfig) -> bool {
    settings.requests_per_second.is_finite() && settings.requests_per_second > 0.0 && settings.burst > 0
}

/// Middleware admitting or rejecting each request by client IP.
pub async fn rate_limit_middleware(
    State(registry): State<Arc<ClientRegistry>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if registry.admit(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimited.into_response()
    }
}
