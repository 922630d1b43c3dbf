//! Store configuration

use super::{
    default_acquire_timeout, default_max_overflow, default_pool_name, default_pool_size,
    default_redis_url,
};
use serde::{Deserialize, Serialize};

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Redis configuration
    pub redis: RedisConfig,
}

impl StorageConfig {
    /// Merge storage configurations
    pub fn merge(mut self, other: Self) -> Self {
        self.redis = self.redis.merge(other.redis);
        self
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Identifier for the shared connection pool
    #[serde(default = "default_pool_name")]
    pub pool_name: String,
    /// Base pool concurrency bound
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    /// Additional connections allowed under burst
    #[serde(default = "default_max_overflow")]
    pub max_overflow: u32,
    /// Seconds to wait for a connection before giving up
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_name: default_pool_name(),
            pool_size: default_pool_size(),
            max_overflow: default_max_overflow(),
            acquire_timeout: default_acquire_timeout(),
        }
    }
}

impl RedisConfig {
    /// Merge Redis configurations
    pub fn merge(mut self, other: Self) -> Self {
        if !other.url.is_empty() && other.url != default_redis_url() {
            self.url = other.url;
        }
        if other.pool_name != default_pool_name() {
            self.pool_name = other.pool_name;
        }
        if other.pool_size != default_pool_size() {
            self.pool_size = other.pool_size;
        }
        if other.max_overflow != default_max_overflow() {
            self.max_overflow = other.max_overflow;
        }
        if other.acquire_timeout != default_acquire_timeout() {
            self.acquire_timeout = other.acquire_timeout;
        }
        self
    }
}
