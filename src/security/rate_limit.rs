//! Fixed-window rate limiting.
//!
//! Counting lives behind [`CounterStore`] so the stage does not care whether
//! counters are in memory or external. The in-memory store keys windows by
//! client identity in a `DashMap`; check-and-increment runs under the shard
//! lock, so concurrent requests from one client cannot both take the last
//! slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderValue;
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::error::ApiError;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::pipeline::{Flow, RequestContext, Stage};

/// Quota applied to every identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub window: Duration,
    pub limit: u32,
}

impl WindowPolicy {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            window: Duration::from_secs(config.window_secs),
            limit: config.max_requests,
        }
    }
}

/// Result of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32, reset_after: Duration },
    Denied { reset_after: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }

    pub fn reset_after(&self) -> Duration {
        match self {
            Decision::Allowed { reset_after, .. } | Decision::Denied { reset_after } => {
                *reset_after
            }
        }
    }
}

/// Storage for per-identity counters.
pub trait CounterStore: Send + Sync {
    /// Count one request for `identity` at `now` and decide whether it passes.
    fn check_and_increment(&self, identity: &str, policy: &WindowPolicy, now: Instant) -> Decision;

    /// Drop windows that ended before `now`. Returns how many were removed.
    fn sweep(&self, policy: &WindowPolicy, now: Instant) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// In-process counter store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    windows: DashMap<String, Window>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl CounterStore for MemoryStore {
    fn check_and_increment(&self, identity: &str, policy: &WindowPolicy, now: Instant) -> Decision {
        let mut entry = self
            .windows
            .entry(identity.to_string())
            .or_insert(Window { started: now, hits: 0 });

        let window = entry.value_mut();
        if now.saturating_duration_since(window.started) >= policy.window {
            *window = Window { started: now, hits: 0 };
        }

        let reset_after = policy
            .window
            .saturating_sub(now.saturating_duration_since(window.started));

        if window.hits >= policy.limit {
            return Decision::Denied { reset_after };
        }

        window.hits += 1;
        Decision::Allowed {
            remaining: policy.limit - window.hits,
            reset_after,
        }
    }

    fn sweep(&self, policy: &WindowPolicy, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < policy.window);
        before.saturating_sub(self.windows.len())
    }
}

/// Pipeline stage enforcing the per-client quota.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policy: WindowPolicy,
    policy_header: HeaderValue,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policy: WindowPolicy) -> Self {
        let policy_header = HeaderValue::from_str(&format!(
            "{};w={}",
            policy.limit,
            policy.window.as_secs()
        ))
        .unwrap_or_else(|_| HeaderValue::from_static("0"));

        Self {
            store,
            policy,
            policy_header,
        }
    }

    /// Stage standard `RateLimit-*` headers. Legacy `X-RateLimit-*` are never sent.
    fn stage_headers(&self, ctx: &mut RequestContext, decision: &Decision) {
        let remaining = match decision {
            Decision::Allowed { remaining, .. } => *remaining,
            Decision::Denied { .. } => 0,
        };
        let reset_secs = decision.reset_after().as_secs_f64().ceil() as u64;

        ctx.stage_header("ratelimit-policy", self.policy_header.clone());
        ctx.stage_header("ratelimit-limit", HeaderValue::from(self.policy.limit));
        ctx.stage_header("ratelimit-remaining", HeaderValue::from(remaining));
        ctx.stage_header("ratelimit-reset", HeaderValue::from(reset_secs));
    }

    /// Evict expired windows every `interval` until shutdown.
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        let policy = self.policy;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let stop = shutdown::wait(shutdown_rx);
            tokio::pin!(stop);

            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    _ = ticker.tick() => {
                        let removed = store.sweep(&policy, Instant::now());
                        if removed > 0 {
                            tracing::debug!(removed, "Swept expired rate limit windows");
                        }
                    }
                }
            }
        })
    }
}

impl Stage for RateLimiter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn handle(&self, ctx: &mut RequestContext) -> Flow {
        let identity = ctx.client_identity();
        let decision = self
            .store
            .check_and_increment(&identity, &self.policy, Instant::now());
        self.stage_headers(ctx, &decision);

        match decision {
            Decision::Allowed { .. } => Flow::Continue,
            Decision::Denied { reset_after } => {
                tracing::warn!(client = %identity, path = %ctx.path, "Rate limit exceeded");
                metrics::record_rate_limited();
                ApiError::RateLimited {
                    retry_after: reset_after,
                }
                .into()
            }
        }
    }
}
