//! LimitEntry: the canonical record exchanged between limiter components
//!
//! A `LimitEntry` describes a single quota fact (a policy rule, a header
//! observation, a live counter reading, or a cooldown) and is immutable once
//! built. Construction goes through [`LimitEntryBuilder`], which rejects any
//! value that violates the entry invariants.

use crate::limits::routing::RoutingVal;
use crate::utils::error::{LimiterError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quota scope enforced by the upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitType {
    /// Per API key, per routing region
    Application,
    /// Per endpoint family
    Method,
    /// The upstream's opaque grouping; reactive only, no counters
    Service,
}

impl LimitType {
    /// Lowercase token as it appears in headers and store keys
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitType::Application => "application",
            LimitType::Method => "method",
            LimitType::Service => "service",
        }
    }
}

impl fmt::Display for LimitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LimitType {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "application" => Ok(LimitType::Application),
            "method" => Ok(LimitType::Method),
            "service" => Ok(LimitType::Service),
            other => Err(LimiterError::UnknownLimitType(other.to_string())),
        }
    }
}

/// Provenance of a LimitEntry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// Parsed directly from upstream response headers
    Headers,
    /// Read from (or synthesised for) the policy keyspace
    Policy,
    /// Read back from a live counter during admission
    Live,
    /// Read from (or synthesised for) the cooldown keyspace
    Cooldown,
}

/// A single quota fact or observation
#[derive(Debug, Clone, PartialEq)]
pub struct LimitEntry {
    routing: RoutingVal,
    endpoint: Option<String>,
    limit_type: Option<LimitType>,
    window_sec: Option<u64>,
    count_limit: Option<u64>,
    count: u64,
    request_time: Option<DateTime<Utc>>,
    retry_after: Option<u64>,
    ttl: Option<u64>,
    adjusted_ttl: Option<u64>,
    source: EntrySource,
}

impl LimitEntry {
    /// Start building an entry for the given routing value and provenance
    pub fn builder(routing: RoutingVal, source: EntrySource) -> LimitEntryBuilder {
        LimitEntryBuilder {
            routing,
            endpoint: None,
            limit_type: None,
            window_sec: None,
            count_limit: None,
            count: 0,
            request_time: None,
            retry_after: None,
            ttl: None,
            adjusted_ttl: None,
            source,
        }
    }

    /// Re-open this entry for modification; `build()` re-validates
    pub fn to_builder(&self) -> LimitEntryBuilder {
        LimitEntryBuilder {
            routing: self.routing,
            endpoint: self.endpoint.clone(),
            limit_type: self.limit_type,
            window_sec: self.window_sec,
            count_limit: self.count_limit,
            count: self.count,
            request_time: self.request_time,
            retry_after: self.retry_after,
            ttl: self.ttl,
            adjusted_ttl: self.adjusted_ttl,
            source: self.source,
        }
    }

    /// Routing value this entry is scoped to
    pub fn routing(&self) -> RoutingVal {
        self.routing
    }

    /// Normalised endpoint prefix, when scoped to one
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Quota scope, absent on synthetic entries
    pub fn limit_type(&self) -> Option<LimitType> {
        self.limit_type
    }

    /// Sliding window duration in seconds
    pub fn window_sec(&self) -> Option<u64> {
        self.window_sec
    }

    /// Maximum requests permitted in the window
    pub fn count_limit(&self) -> Option<u64> {
        self.count_limit
    }

    /// Current observed or live count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Upstream `Date` header at observation time
    pub fn request_time(&self) -> Option<DateTime<Utc>> {
        self.request_time
    }

    /// Back-off seconds directed by the upstream
    pub fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }

    /// Remaining seconds on the backing store key
    pub fn ttl(&self) -> Option<u64> {
        self.ttl
    }

    /// Cooldown TTL after clock-skew correction
    pub fn adjusted_ttl(&self) -> Option<u64> {
        self.adjusted_ttl
    }

    /// Provenance of this entry
    pub fn source(&self) -> EntrySource {
        self.source
    }
}

/// Validating builder for [`LimitEntry`]
#[derive(Debug, Clone)]
pub struct LimitEntryBuilder {
    routing: RoutingVal,
    endpoint: Option<String>,
    limit_type: Option<LimitType>,
    window_sec: Option<u64>,
    count_limit: Option<u64>,
    count: u64,
    request_time: Option<DateTime<Utc>>,
    retry_after: Option<u64>,
    ttl: Option<u64>,
    adjusted_ttl: Option<u64>,
    source: EntrySource,
}

impl LimitEntryBuilder {
    /// Scope the entry to an endpoint prefix
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the quota scope
    pub fn limit_type(mut self, limit_type: LimitType) -> Self {
        self.limit_type = Some(limit_type);
        self
    }

    /// Set the window duration in seconds
    pub fn window_sec(mut self, window_sec: u64) -> Self {
        self.window_sec = Some(window_sec);
        self
    }

    /// Set the per-window request ceiling
    pub fn count_limit(mut self, count_limit: u64) -> Self {
        self.count_limit = Some(count_limit);
        self
    }

    /// Set the observed or live count
    pub fn count(mut self, count: u64) -> Self {
        self.count = count;
        self
    }

    /// Record the upstream `Date` header value
    pub fn request_time(mut self, request_time: DateTime<Utc>) -> Self {
        self.request_time = Some(request_time);
        self
    }

    /// Record the upstream back-off directive in seconds
    pub fn retry_after(mut self, retry_after: u64) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Record the remaining store-key TTL in seconds
    pub fn ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Record the skew-corrected cooldown TTL in seconds
    pub fn adjusted_ttl(mut self, adjusted_ttl: u64) -> Self {
        self.adjusted_ttl = Some(adjusted_ttl);
        self
    }

    /// Change the provenance, e.g. when a policy fact becomes a live reading
    pub fn source(mut self, source: EntrySource) -> Self {
        self.source = source;
        self
    }

    /// Validate and produce the entry
    pub fn build(self) -> Result<LimitEntry> {
        if let Some(window) = self.window_sec {
            if window == 0 {
                return Err(invariant("window_sec must be positive"));
            }
        }
        if let Some(limit) = self.count_limit {
            if limit == 0 {
                return Err(invariant("count_limit must be positive"));
            }
        }
        if let Some(retry_after) = self.retry_after {
            if retry_after == 0 {
                return Err(invariant("retry_after must be positive"));
            }
        }
        if let Some(ref endpoint) = self.endpoint {
            if endpoint.is_empty() {
                return Err(invariant("endpoint must not be empty"));
            }
            if endpoint.contains(':') {
                return Err(invariant("endpoint must not contain `:`"));
            }
        }

        match self.source {
            EntrySource::Policy => {
                if self.limit_type == Some(LimitType::Service) {
                    return Err(invariant(
                        "service scope has no policy representation",
                    ));
                }
                // Synthetic blind-request entries carry no scope and are
                // exempt from the completeness requirement.
                if self.limit_type.is_some()
                    && (self.window_sec.is_none() || self.count_limit.is_none())
                {
                    return Err(invariant(
                        "policy entries require window_sec and count_limit",
                    ));
                }
            }
            EntrySource::Live => {
                if self.limit_type.is_none()
                    || self.window_sec.is_none()
                    || self.count_limit.is_none()
                    || self.ttl.is_none()
                {
                    return Err(invariant(
                        "live entries require limit_type, window_sec, count_limit, and ttl",
                    ));
                }
            }
            EntrySource::Cooldown => {
                if self.limit_type == Some(LimitType::Method) && self.endpoint.is_none() {
                    return Err(invariant(
                        "method cooldown entries require an endpoint",
                    ));
                }
            }
            EntrySource::Headers => {}
        }

        Ok(LimitEntry {
            routing: self.routing,
            endpoint: self.endpoint,
            limit_type: self.limit_type,
            window_sec: self.window_sec,
            count_limit: self.count_limit,
            count: self.count,
            request_time: self.request_time,
            retry_after: self.retry_after,
            ttl: self.ttl,
            adjusted_ttl: self.adjusted_ttl,
            source: self.source,
        })
    }
}

fn invariant(msg: &str) -> LimiterError {
    LimiterError::InvariantViolated(msg.to_string())
}
