//! Redis connection pool and core connection management
//!
//! This module provides Redis connectivity, connection acquisition with a
//! bounded timeout, and health checks. The multiplexed connection is shared;
//! acquisition is the single suspension point the limiter exposes.

use crate::config::RedisConfig;
use crate::utils::error::{LimiterError, Result};
use redis::{Client, aio::MultiplexedConnection};
use std::time::Duration;
use tracing::{debug, info};

/// Redis connection pool
#[derive(Debug, Clone)]
pub struct RedisPool {
    /// Redis client
    pub(crate) client: Client,
    /// Shared multiplexed connection
    pub(crate) connection_manager: MultiplexedConnection,
    /// Configuration
    pub(crate) config: RedisConfig,
}

impl RedisPool {
    /// Create a new Redis pool
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        info!("Creating Redis connection pool `{}`", config.pool_name);
        debug!("Redis URL: {}", Self::sanitize_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(LimiterError::Redis)?;

        let connection_manager = tokio::time::timeout(
            Duration::from_secs(config.acquire_timeout),
            client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| LimiterError::StoreTimeout {
            seconds: config.acquire_timeout,
        })?
        .map_err(LimiterError::Redis)?;

        info!("Redis connection pool created successfully");
        Ok(Self {
            client,
            connection_manager,
            config: config.clone(),
        })
    }

    /// Acquire a handle on the shared multiplexed connection
    pub async fn get_connection(&self) -> Result<MultiplexedConnection> {
        Ok(self.connection_manager.clone())
    }

    /// Run a store operation, bounded by the configured acquire timeout
    pub(crate) async fn timed<T>(
        &self,
        op: impl std::future::Future<Output = redis::RedisResult<T>>,
    ) -> Result<T> {
        tokio::time::timeout(Duration::from_secs(self.config.acquire_timeout), op)
            .await
            .map_err(|_| LimiterError::StoreTimeout {
                seconds: self.config.acquire_timeout,
            })?
            .map_err(LimiterError::Redis)
    }

    /// Health check
    pub async fn health_check(&self) -> Result<()> {
        debug!("Performing Redis health check");
        let mut conn = self.get_connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(LimiterError::Redis)?;

        debug!("Redis health check passed");
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) -> Result<()> {
        info!("Closing Redis connection pool `{}`", self.config.pool_name);
        // Connection manager will be dropped automatically
        Ok(())
    }

    /// Configured acquire timeout in seconds
    pub fn acquire_timeout(&self) -> u64 {
        self.config.acquire_timeout
    }

    /// Sanitize Redis URL for logging (hide password)
    pub(crate) fn sanitize_url(url: &str) -> String {
        if let Ok(parsed) = url::Url::parse(url) {
            let mut sanitized = parsed.clone();
            if sanitized.password().is_some() {
                let _ = sanitized.set_password(Some("***"));
            }
            sanitized.to_string()
        } else {
            "invalid_url".to_string()
        }
    }
}
