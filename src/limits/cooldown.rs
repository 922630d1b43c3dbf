//! Cooldown store
//!
//! A 429 response carries a unilateral back-off directive that must win over
//! any counter arithmetic. This module persists those directives and answers
//! the "are we inside a back-off window" question ahead of every admission.

use crate::limits::entry::{EntrySource, LimitEntry, LimitType};
use crate::limits::headers;
use crate::limits::keys::StoreKey;
use crate::limits::routing::RoutingVal;
use crate::limits::Decision;
use crate::utils::error::{LimiterError, Result};
use crate::storage::redis::RedisPool;
use chrono::{DateTime, Utc};
use http::HeaderMap;
use tracing::{debug, warn};

/// Store-backed cooldown bookkeeping
#[derive(Debug, Clone)]
pub struct CooldownStore {
    pool: RedisPool,
}

impl CooldownStore {
    /// Create a cooldown store on the shared pool
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Record a server-imposed back-off, if the response directs one
    ///
    /// No-op unless `retry-after`, `x-rate-limit-type`, and `date` are all
    /// present. The written TTL is corrected for clock skew between the
    /// upstream and this node; a TTL outside `(0, max_ttl]` indicates
    /// egregious skew and is logged and dropped rather than written.
    pub async fn maybe_set(
        &self,
        response_headers: &HeaderMap,
        routing: RoutingVal,
        endpoint: &str,
        now: DateTime<Utc>,
        max_ttl: u64,
    ) -> Result<()> {
        if !headers::has_cooldown_directive(response_headers) {
            debug!(routing = %routing, endpoint = endpoint, "no cooldown directive in response");
            return Ok(());
        }

        let entry =
            headers::extract_cooldown(response_headers, routing, endpoint, now, max_ttl)?;
        // The directive check above guarantees these fields
        let request_time = entry.request_time().unwrap_or(now);
        let retry_after = entry.retry_after().unwrap_or(max_ttl);
        let limit_type = entry.limit_type().unwrap_or(LimitType::Service);

        let ttl = adjusted_ttl(request_time, retry_after, now);
        if ttl <= 0 || ttl as u64 > max_ttl {
            warn!(
                routing = %routing,
                endpoint = endpoint,
                error = %LimiterError::TtlInvalid { ttl, max_ttl },
                "dropping cooldown with out-of-range ttl"
            );
            return Ok(());
        }

        let key = StoreKey::cooldown(routing, endpoint, limit_type).encode();
        debug!(key = key.as_str(), ttl = ttl, "installing cooldown");
        self.pool.set_ex(&key, &ttl.to_string(), ttl as u64).await
    }

    /// Report whether a cooldown currently covers `(routing, endpoint)`
    ///
    /// All three key variants are probed in one round trip; the one with the
    /// largest positive TTL dominates. With no live cooldown the decision is
    /// `Allow` with a single synthetic entry.
    pub async fn status(&self, routing: RoutingVal, endpoint: &str) -> Result<Decision> {
        let variants = [
            StoreKey::cooldown(routing, endpoint, LimitType::Application),
            StoreKey::cooldown(routing, endpoint, LimitType::Service),
            StoreKey::cooldown(routing, endpoint, LimitType::Method),
        ];
        let keys: Vec<String> = variants.iter().map(StoreKey::encode).collect();
        let ttls = self.pool.ttls(&keys).await?;

        let dominant = variants
            .iter()
            .zip(&keys)
            .zip(&ttls)
            .filter(|(_, ttl)| **ttl > 0)
            .max_by_key(|(_, ttl)| **ttl);

        match dominant {
            Some(((key, encoded), ttl)) => {
                let mut builder = LimitEntry::builder(routing, EntrySource::Cooldown)
                    .limit_type(key.limit_type)
                    .ttl(*ttl as u64);
                // The key's value is the skew-adjusted TTL maybe_set wrote
                match self.pool.get(encoded).await?.map(|raw| raw.parse::<u64>()) {
                    Some(Ok(adjusted)) => builder = builder.adjusted_ttl(adjusted),
                    Some(Err(_)) => {
                        warn!(key = encoded.as_str(), "cooldown value is not a ttl");
                    }
                    // Expired between the TTL probe and the read; the
                    // remaining ttl above still stands for this decision
                    None => {}
                }
                if let Some(ref key_endpoint) = key.endpoint {
                    builder = builder.endpoint(key_endpoint.clone());
                }
                Ok(Decision::Throttle(vec![builder.build()?]))
            }
            None => {
                let entry = LimitEntry::builder(routing, EntrySource::Cooldown)
                    .endpoint(endpoint)
                    .build()?;
                Ok(Decision::Allow(vec![entry]))
            }
        }
    }
}

/// Locally-actionable back-off seconds, corrected for clock skew
///
/// The upstream's `Date` header anchors when the back-off started; local
/// `now` anchors when it should end here. Subtracting absorbs modest NTP
/// drift; the caller rejects egregious skew via the `max_ttl` cap.
pub(crate) fn adjusted_ttl(
    request_time: DateTime<Utc>,
    retry_after: u64,
    now: DateTime<Utc>,
) -> i64 {
    let expiry = request_time + chrono::Duration::seconds(retry_after as i64);
    (expiry - now).num_seconds()
}
