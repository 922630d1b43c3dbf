//! Rate limiter façade
//!
//! Two operations wrap the whole subsystem: [`RateLimiter::hit`] decides
//! admission before an outbound call, [`RateLimiter::refresh`] folds the
//! response headers back into the store afterwards. Every invocation is
//! independent; the struct is cheap to clone and holds no mutable state.

use crate::config::{Config, RateLimitConfig};
use crate::limits::cooldown::CooldownStore;
use crate::limits::entry::{EntrySource, LimitEntry};
use crate::limits::headers;
use crate::limits::policy::PolicyStore;
use crate::limits::routing::RoutingVal;
use crate::limits::Decision;
use crate::storage::redis::RedisPool;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use tracing::debug;

/// Distributed, policy-adaptive rate limiter for the Riot API
#[derive(Debug, Clone)]
pub struct RateLimiter {
    policy: PolicyStore,
    cooldown: CooldownStore,
    max_cooldown_ttl: u64,
}

impl RateLimiter {
    /// Create a limiter on an existing pool
    pub fn new(pool: RedisPool, config: &RateLimitConfig) -> Self {
        Self {
            policy: PolicyStore::new(pool.clone()),
            cooldown: CooldownStore::new(pool),
            max_cooldown_ttl: config.max_cooldown_ttl,
        }
    }

    /// Connect the pool and create a limiter from full configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let pool = RedisPool::new(config.redis()).await?;
        Ok(Self::new(pool, config.rate_limit()))
    }

    /// Decide admission for one outbound call
    ///
    /// Ordered chain: an active cooldown throttles immediately; an unknown
    /// policy admits blindly (the only way a new policy can be learned);
    /// otherwise every window counter is checked and incremented atomically
    /// and that decision is returned verbatim.
    pub async fn hit(&self, routing: RoutingVal, endpoint: &str) -> Result<Decision> {
        if let throttled @ Decision::Throttle(_) =
            self.cooldown.status(routing, endpoint).await?
        {
            debug!(routing = %routing, endpoint = endpoint, "throttled by cooldown");
            return Ok(throttled);
        }

        if !self.policy.known(routing, endpoint).await? {
            debug!(
                routing = %routing,
                endpoint = endpoint,
                "no policy yet, admitting blind request"
            );
            let blind = LimitEntry::builder(routing, EntrySource::Policy)
                .endpoint(endpoint)
                .build()?;
            return Ok(Decision::Allow(vec![blind]));
        }

        let entries = self.policy.fetch(routing, endpoint).await?;
        self.policy.enforce_and_maybe_increment(&entries).await
    }

    /// Fold a response's headers back into the store
    ///
    /// Uses the local wall clock; see [`refresh_at`](Self::refresh_at) for
    /// an injected clock.
    pub async fn refresh(
        &self,
        response_headers: &HeaderMap,
        routing: RoutingVal,
        endpoint: &str,
    ) -> Result<Vec<LimitEntry>> {
        self.refresh_at(response_headers, routing, endpoint, Utc::now())
            .await
    }

    /// Fold a response's headers back into the store at an explicit instant
    ///
    /// The cooldown is written strictly before the policy so that a 429
    /// installs its back-off even when the policy record never completes.
    /// The policy is written only on first observation; replaying the same
    /// headers is a no-op.
    pub async fn refresh_at(
        &self,
        response_headers: &HeaderMap,
        routing: RoutingVal,
        endpoint: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<LimitEntry>> {
        self.cooldown
            .maybe_set(response_headers, routing, endpoint, now, self.max_cooldown_ttl)
            .await?;

        let entries = headers::parse(response_headers, routing, endpoint)?;

        if !self.policy.known(routing, endpoint).await? {
            self.policy.set_parsed(&entries, routing, endpoint).await?;
        }

        Ok(entries)
    }

    /// Upper cap applied to any cooldown TTL, in seconds
    pub fn max_cooldown_ttl(&self) -> u64 {
        self.max_cooldown_ttl
    }
}
