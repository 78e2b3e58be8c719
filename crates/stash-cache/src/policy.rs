//! Expiry policy for cache write-backs.

use stash_config::CacheConfig;
use std::time::Duration;

/// Default TTL for cached items (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// TTL for negative ("not found") entries.
pub const NEGATIVE_TTL: Duration = Duration::from_millis(200);

/// Which expiry a write-back gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Expiry used when the caller has none of its own.
    pub default_ttl: Duration,
    /// Expiry of negative entries, regardless of what the caller asked for.
    pub negative_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            negative_ttl: NEGATIVE_TTL,
        }
    }
}

impl CachePolicy {
    /// Expiry for a write-back of a record that is or is not empty.
    ///
    /// A zero `requested` expiry means the caller has none of its own.
    #[must_use]
    pub const fn expiry_for(&self, requested: Duration, empty: bool) -> Duration {
        if empty {
            self.negative_ttl
        } else if requested.is_zero() {
            self.default_ttl
        } else {
            requested
        }
    }
}

impl From<&CacheConfig> for CachePolicy {
    fn from(config: &CacheConfig) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            negative_ttl: config.negative_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_override() {
        let policy = CachePolicy::default();
        let requested = Duration::from_secs(10);
        assert_eq!(policy.expiry_for(requested, false), requested);
        assert_eq!(policy.expiry_for(requested, true), Duration::from_millis(200));
    }

    #[test]
    fn test_zero_requested_uses_default() {
        let policy = CachePolicy::default();
        assert_eq!(policy.expiry_for(Duration::ZERO, false), DEFAULT_TTL);
        assert_eq!(policy.expiry_for(Duration::ZERO, true), NEGATIVE_TTL);
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            negative_ttl_ms: 500,
            ..Default::default()
        };
        let policy = CachePolicy::from(&config);
        assert_eq!(policy.negative_ttl, Duration::from_millis(500));
        assert_eq!(policy.default_ttl, config.default_ttl());
    }
}
