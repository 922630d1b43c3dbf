//! Policy store
//!
//! The quota policy (window set plus per-window limit) for a
//! `(routing, endpoint)` pair is never configured up front; it is written
//! once from the first observed response headers and read on every
//! subsequent admission. This module also owns the hot-path atomic
//! check-and-increment over the live counters.

use crate::limits::entry::{EntrySource, LimitEntry, LimitType};
use crate::limits::headers;
use crate::limits::keys::StoreKey;
use crate::limits::routing::RoutingVal;
use crate::limits::Decision;
use crate::storage::redis::{CheckAndIncrReply, RedisPool};
use crate::utils::error::{LimiterError, Result};
use http::HeaderMap;
use tracing::debug;

/// Scopes that have a policy representation; service is reactive only
const POLICY_SCOPES: [LimitType; 2] = [LimitType::Application, LimitType::Method];

/// Store-backed quota policy access
#[derive(Debug, Clone)]
pub struct PolicyStore {
    pool: RedisPool,
}

impl PolicyStore {
    /// Create a policy store on the shared pool
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// True iff both the application and method window sets are recorded
    ///
    /// Single existence check over both keys; a half-written policy cannot
    /// exist because [`set`](Self::set) writes atomically.
    pub async fn known(&self, routing: RoutingVal, endpoint: &str) -> Result<bool> {
        let keys: Vec<String> = POLICY_SCOPES
            .iter()
            .map(|scope| StoreKey::policy_windows(routing, endpoint, *scope).encode())
            .collect();
        let found = self.pool.exists_count(&keys).await?;
        Ok(found == keys.len() as i64)
    }

    /// Read the full policy: one entry per `(limit_type, window)`
    pub async fn fetch(&self, routing: RoutingVal, endpoint: &str) -> Result<Vec<LimitEntry>> {
        let not_found = || LimiterError::PolicyNotFound {
            routing,
            endpoint: endpoint.to_string(),
        };

        let windows_keys: Vec<String> = POLICY_SCOPES
            .iter()
            .map(|scope| StoreKey::policy_windows(routing, endpoint, *scope).encode())
            .collect();
        let windows_raw = self.pool.mget(&windows_keys).await?;

        let mut pairs: Vec<(LimitType, u64)> = Vec::new();
        for (scope, raw) in POLICY_SCOPES.iter().zip(windows_raw) {
            let raw = raw.ok_or_else(not_found)?;
            for window in parse_window_list(&raw)? {
                pairs.push((*scope, window));
            }
        }

        let limit_keys: Vec<String> = pairs
            .iter()
            .map(|(scope, window)| {
                StoreKey::policy_limit(routing, endpoint, *scope, *window).encode()
            })
            .collect();
        let limits_raw = self.pool.mget(&limit_keys).await?;

        let mut entries = Vec::with_capacity(pairs.len());
        for ((scope, window), raw) in pairs.iter().zip(limits_raw) {
            let raw = raw.ok_or_else(not_found)?;
            let limit = raw.parse::<u64>().map_err(|_| {
                LimiterError::InvariantViolated(format!(
                    "policy limit value `{raw}` is not an integer"
                ))
            })?;
            entries.push(
                LimitEntry::builder(routing, EntrySource::Policy)
                    .endpoint(endpoint)
                    .limit_type(*scope)
                    .window_sec(*window)
                    .count_limit(limit)
                    .build()?,
            );
        }
        Ok(entries)
    }

    /// Bootstrap the policy from observed response headers
    ///
    /// One atomic multi-key write: per scope, the comma-joined window set
    /// plus one limit key per window. Partial writes are impossible.
    pub async fn set(
        &self,
        response_headers: &HeaderMap,
        routing: RoutingVal,
        endpoint: &str,
    ) -> Result<()> {
        let entries = headers::parse(response_headers, routing, endpoint)?;
        self.set_parsed(&entries, routing, endpoint).await
    }

    /// Write an already-parsed observation as the policy
    pub(crate) async fn set_parsed(
        &self,
        entries: &[LimitEntry],
        routing: RoutingVal,
        endpoint: &str,
    ) -> Result<()> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        for scope in POLICY_SCOPES {
            let windows: Vec<u64> = entries
                .iter()
                .filter(|e| e.limit_type() == Some(scope))
                .filter_map(|e| e.window_sec())
                .collect();
            if windows.is_empty() {
                continue;
            }

            let window_list = windows
                .iter()
                .map(|w| w.to_string())
                .collect::<Vec<_>>()
                .join(",");
            pairs.push((
                StoreKey::policy_windows(routing, endpoint, scope).encode(),
                window_list,
            ));

            for entry in entries.iter().filter(|e| e.limit_type() == Some(scope)) {
                let (Some(window), Some(limit)) = (entry.window_sec(), entry.count_limit())
                else {
                    continue;
                };
                pairs.push((
                    StoreKey::policy_limit(routing, endpoint, scope, window).encode(),
                    limit.to_string(),
                ));
            }
        }

        debug!(
            routing = %routing,
            endpoint = endpoint,
            keys = pairs.len(),
            "installing rate limit policy"
        );
        self.pool.mset_atomic(&pairs).await
    }

    /// Atomically check every live counter and commit one increment each
    ///
    /// The decision comes back verbatim from the store script: `Throttle`
    /// names the first entry (in input order) whose counter breached its
    /// limit; `Allow` carries one live entry per input with the committed
    /// count and remaining TTL.
    pub async fn enforce_and_maybe_increment(
        &self,
        entries: &[LimitEntry],
    ) -> Result<Decision> {
        let mut counter_keys = Vec::with_capacity(entries.len());
        let mut limit_keys = Vec::with_capacity(entries.len());
        let mut windows = Vec::with_capacity(entries.len());
        for entry in entries {
            let (Some(limit_type), Some(window), Some(endpoint)) =
                (entry.limit_type(), entry.window_sec(), entry.endpoint())
            else {
                return Err(LimiterError::InvariantViolated(
                    "admission requires scoped entries with windows".to_string(),
                ));
            };
            counter_keys
                .push(StoreKey::live_counter(entry.routing(), endpoint, limit_type, window).encode());
            limit_keys
                .push(StoreKey::policy_limit(entry.routing(), endpoint, limit_type, window).encode());
            windows.push(window);
        }

        let reply = self
            .pool
            .check_and_increment(&counter_keys, &limit_keys, &windows)
            .await?;

        match reply {
            CheckAndIncrReply::Allowed(counters) => {
                let mut live = Vec::with_capacity(entries.len());
                for (entry, (count, ttl)) in entries.iter().zip(counters) {
                    live.push(
                        entry
                            .to_builder()
                            .source(EntrySource::Live)
                            .count(count.max(0) as u64)
                            .ttl(ttl.max(0) as u64)
                            .build()?,
                    );
                }
                Ok(Decision::Allow(live))
            }
            CheckAndIncrReply::Throttled {
                key,
                count,
                limit,
                ttl,
            } => {
                let offending = StoreKey::decode(&key)?;
                let matched = entries
                    .iter()
                    .find(|e| {
                        e.limit_type() == Some(offending.limit_type)
                            && e.window_sec() == offending.window_sec
                    })
                    .ok_or_else(|| {
                        LimiterError::InvariantViolated(format!(
                            "script reported unknown counter `{key}`"
                        ))
                    })?;
                // The script reads the limit key itself; a 0 means the
                // policy vanished mid-flight, so fall back to the fetched
                // value for the entry we report.
                let count_limit = if limit > 0 {
                    limit as u64
                } else {
                    matched.count_limit().unwrap_or(1)
                };
                let entry = matched
                    .to_builder()
                    .source(EntrySource::Live)
                    .count(count.max(0) as u64)
                    .count_limit(count_limit)
                    .ttl(ttl.max(0) as u64)
                    .build()?;
                Ok(Decision::Throttle(vec![entry]))
            }
        }
    }
}

/// Parse a comma-separated window list stored under a policy-windows key
fn parse_window_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(|part| {
            part.trim().parse::<u64>().map_err(|_| {
                LimiterError::InvariantViolated(format!(
                    "policy windows value `{raw}` is not a window list"
                ))
            })
        })
        .collect()
}
