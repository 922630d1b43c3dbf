//! Rate limiting configuration

use super::default_max_cooldown_ttl;
use serde::{Deserialize, Serialize};

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Upper cap on any cooldown TTL, in seconds
    ///
    /// Caps both the `retry-after` fallback and the skew-adjusted TTL; a
    /// cooldown longer than this indicates egregious clock skew and is
    /// dropped rather than written.
    #[serde(default = "default_max_cooldown_ttl")]
    pub max_cooldown_ttl: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_cooldown_ttl: default_max_cooldown_ttl(),
        }
    }
}

impl RateLimitConfig {
    /// Merge rate limit configurations
    pub fn merge(mut self, other: Self) -> Self {
        if other.max_cooldown_ttl != default_max_cooldown_ttl() {
            self.max_cooldown_ttl = other.max_cooldown_ttl;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_config_default() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_cooldown_ttl, 3600);
    }

    #[test]
    fn test_rate_limit_config_deserialization() {
        let config: RateLimitConfig =
            serde_yaml::from_str("max_cooldown_ttl: 600").unwrap();
        assert_eq!(config.max_cooldown_ttl, 600);
    }

    #[test]
    fn test_rate_limit_config_merge() {
        let base = RateLimitConfig::default();
        let other = RateLimitConfig {
            max_cooldown_ttl: 120,
        };
        assert_eq!(base.merge(other).max_cooldown_ttl, 120);
    }
}
