//! Configuration management for the limiter
//!
//! This module handles loading, validation, and merging of limiter
//! configuration.

pub mod models;

pub use models::*;

use crate::utils::error::{LimiterError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Main configuration struct for the limiter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_yaml::from_str(&content)?;

        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Config::default();
        if let Ok(url) = std::env::var("RIOT_RATELIMIT_REDIS_URL") {
            config.storage.redis.url = url;
        }
        if let Ok(pool_size) = std::env::var("RIOT_RATELIMIT_POOL_SIZE") {
            config.storage.redis.pool_size = pool_size
                .parse()
                .map_err(|_| LimiterError::Config("POOL_SIZE must be an integer".to_string()))?;
        }
        if let Ok(max_ttl) = std::env::var("RIOT_RATELIMIT_MAX_COOLDOWN_TTL") {
            config.rate_limit.max_cooldown_ttl = max_ttl.parse().map_err(|_| {
                LimiterError::Config("MAX_COOLDOWN_TTL must be an integer".to_string())
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get Redis configuration
    pub fn redis(&self) -> &RedisConfig {
        &self.storage.redis
    }

    /// Get rate limiting configuration
    pub fn rate_limit(&self) -> &RateLimitConfig {
        &self.rate_limit
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        if self.storage.redis.url.is_empty() {
            return Err(LimiterError::Config("Redis URL must not be empty".to_string()));
        }
        if self.storage.redis.pool_size == 0 {
            return Err(LimiterError::Config("pool_size must be positive".to_string()));
        }
        if self.storage.redis.acquire_timeout == 0 {
            return Err(LimiterError::Config(
                "acquire_timeout must be positive".to_string(),
            ));
        }
        if self.rate_limit.max_cooldown_ttl == 0 {
            return Err(LimiterError::Config(
                "max_cooldown_ttl must be positive".to_string(),
            ));
        }

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(mut self, other: Self) -> Self {
        self.storage = self.storage.merge(other.storage);
        self.rate_limit = self.rate_limit.merge(other.rate_limit);
        self
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_config_from_file() {
        let config_content = r#"
storage:
  redis:
    url: "redis://cache.internal:6379"
    pool_size: 16
    max_overflow: 8

rate_limit:
  max_cooldown_ttl: 900
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.redis().url, "redis://cache.internal:6379");
        assert_eq!(config.redis().pool_size, 16);
        assert_eq!(config.redis().max_overflow, 8);
        assert_eq!(config.rate_limit().max_cooldown_ttl, 900);
    }

    #[tokio::test]
    async fn test_config_from_file_missing() {
        let result = Config::from_file("/nonexistent/config.yaml").await;
        assert!(matches!(result, Err(LimiterError::Io(_))));
    }

    #[tokio::test]
    async fn test_config_from_file_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"storage: [not, a, mapping").unwrap();

        let result = Config::from_file(temp_file.path()).await;
        assert!(matches!(result, Err(LimiterError::Yaml(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_url() {
        let mut config = Config::default();
        config.storage.redis.url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_pool_size() {
        let mut config = Config::default();
        config.storage.redis.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_cooldown_cap() {
        let mut config = Config::default();
        config.rate_limit.max_cooldown_ttl = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_prefers_other() {
        let base = Config::default();
        let mut other = Config::default();
        other.storage.redis.pool_size = 42;
        other.rate_limit.max_cooldown_ttl = 120;
        let merged = base.merge(other);
        assert_eq!(merged.redis().pool_size, 42);
        assert_eq!(merged.rate_limit().max_cooldown_ttl, 120);
    }
}
