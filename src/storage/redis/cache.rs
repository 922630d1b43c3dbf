//! Basic Redis key operations
//!
//! This module provides the single-key operations the limiter's policy and
//! cooldown stores are built on.

use super::pool::RedisPool;
use crate::utils::error::Result;
use redis::AsyncCommands;

impl RedisPool {
    /// Get a value
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.get(key)).await
    }

    /// Set a key-value pair with a TTL in seconds
    pub async fn set_ex(&self, key: &str, value: &str, ttl: u64) -> Result<()> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.set_ex(key, value, ttl)).await
    }

    /// Count how many of the given keys exist (single EXISTS round trip)
    pub async fn exists_count(&self, keys: &[String]) -> Result<i64> {
        let mut conn = self.get_connection().await?;
        let mut cmd = redis::cmd("EXISTS");
        for key in keys {
            cmd.arg(key);
        }
        self.timed(cmd.query_async(&mut conn)).await
    }

    /// Time to live for a key in seconds (-1 no expiry, -2 missing)
    pub async fn ttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.get_connection().await?;
        self.timed(conn.ttl(key)).await
    }
}
