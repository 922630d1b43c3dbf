//! Error types for the rate limiter

use crate::limits::routing::RoutingVal;
use thiserror::Error;

/// Result type alias for the rate limiter
pub type Result<T> = std::result::Result<T, LimiterError>;

/// Main error type for the rate limiter
#[derive(Error, Debug)]
pub enum LimiterError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Redis errors
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Store connection acquisition timed out
    #[error("Store connection not acquired within {seconds}s")]
    StoreTimeout {
        /// Configured acquire timeout in seconds
        seconds: u64,
    },

    /// A recognised header carried an unparseable value
    #[error("Malformed header `{header}`: {reason}")]
    HeaderMalformed {
        /// Header name as received
        header: String,
        /// What failed to parse
        reason: String,
    },

    /// Neither the app nor the method rate limit header was present
    #[error("No rate limit headers present for {routing}:{endpoint}")]
    RateLimitHeadersAbsent {
        /// Routing value of the observed response
        routing: RoutingVal,
        /// Normalised endpoint prefix
        endpoint: String,
    },

    /// Policy fetched before any refresh installed it
    #[error("No rate limit policy recorded for {routing}:{endpoint}")]
    PolicyNotFound {
        /// Routing value the fetch targeted
        routing: RoutingVal,
        /// Normalised endpoint prefix
        endpoint: String,
    },

    /// Cooldown TTL fell outside the accepted range (swallowed by maybe_set)
    #[error("Cooldown TTL {ttl}s outside (0, {max_ttl}]s")]
    TtlInvalid {
        /// Computed skew-adjusted TTL
        ttl: i64,
        /// Configured upper cap
        max_ttl: u64,
    },

    /// Store key did not match any known template
    #[error("Store key `{key}` does not match a known template")]
    KeyMalformed {
        /// The offending key
        key: String,
    },

    /// Routing token not in the known route set
    #[error("Unknown routing value `{0}`")]
    UnknownRouting(String),

    /// Limit type token outside application/method/service
    #[error("Unknown limit type `{0}`")]
    UnknownLimitType(String),

    /// A LimitEntry constructor or updater rejected its input
    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl LimiterError {
    /// True for errors the store layer produced (transport or protocol)
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            LimiterError::Redis(_) | LimiterError::StoreTimeout { .. }
        )
    }
}
