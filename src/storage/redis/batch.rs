//! Batch Redis operations
//!
//! Pipelined multi-key reads and the atomic multi-key write the policy
//! store relies on for partial-write-free bootstrap.

use super::pool::RedisPool;
use crate::utils::error::Result;

impl RedisPool {
    /// Get multiple keys at once
    pub async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection().await?;
        // MGET with a single key would return a scalar; pipeline instead
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(key);
        }
        self.timed(pipe.query_async(&mut conn)).await
    }

    /// TTLs for multiple keys in one round trip
    pub async fn ttls(&self, keys: &[String]) -> Result<Vec<i64>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.ttl(key);
        }
        self.timed(pipe.query_async(&mut conn)).await
    }

    /// Set multiple key-value pairs in one MULTI/EXEC transaction
    pub async fn mset_atomic(&self, pairs: &[(String, String)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }

        let mut conn = self.get_connection().await?;
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in pairs {
            pipe.set(key, value);
        }
        let _: () = self.timed(pipe.query_async(&mut conn)).await?;
        Ok(())
    }
}
