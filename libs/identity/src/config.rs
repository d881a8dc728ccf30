//! Identity engine configuration

use anyhow::Result;
use chrono::Duration;
use tracing::warn;

/// Lifetimes and cache policy for issued credentials.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Login session lifetime in seconds (default: 14 days)
    pub session_lifetime_secs: i64,
    /// One-time (verification/reset) session lifetime in seconds (default: 1 hour)
    pub onetime_lifetime_secs: i64,
    /// Verified-token cache entry lifetime in seconds (default: 15 minutes)
    pub cache_ttl_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        IdentityConfig {
            session_lifetime_secs: 1_209_600,
            onetime_lifetime_secs: 3_600,
            cache_ttl_secs: 900,
        }
    }
}

impl IdentityConfig {
    /// Create a new IdentityConfig from environment variables
    ///
    /// # Environment Variables
    /// - `IDENTITY_SESSION_LIFETIME`: login session lifetime in seconds (default: 1209600)
    /// - `IDENTITY_ONETIME_LIFETIME`: verification/reset session lifetime in seconds (default: 3600)
    /// - `IDENTITY_CACHE_TTL`: verified-token cache TTL in seconds (default: 900)
    pub fn from_env() -> Result<Self> {
        let defaults = IdentityConfig::default();

        let session_lifetime_secs = std::env::var("IDENTITY_SESSION_LIFETIME")
            .unwrap_or_else(|_| defaults.session_lifetime_secs.to_string())
            .parse()
            .unwrap_or(defaults.session_lifetime_secs);

        let onetime_lifetime_secs = std::env::var("IDENTITY_ONETIME_LIFETIME")
            .unwrap_or_else(|_| defaults.onetime_lifetime_secs.to_string())
            .parse()
            .unwrap_or(defaults.onetime_lifetime_secs);

        let cache_ttl_secs = std::env::var("IDENTITY_CACHE_TTL")
            .unwrap_or_else(|_| defaults.cache_ttl_secs.to_string())
            .parse()
            .unwrap_or(defaults.cache_ttl_secs);

        Ok(IdentityConfig {
            session_lifetime_secs,
            onetime_lifetime_secs,
            cache_ttl_secs,
        }
        .clamped())
    }

    /// Caps the cache TTL at the shortest token lifetime, so a cache entry
    /// can never outlive the token it vouches for.
    fn clamped(mut self) -> Self {
        let shortest = self
            .session_lifetime_secs
            .min(self.onetime_lifetime_secs)
            .max(0) as u64;
        if self.cache_ttl_secs > shortest {
            warn!(
                cache_ttl = self.cache_ttl_secs,
                shortest_lifetime = shortest,
                "cache TTL exceeds shortest token lifetime; capping it"
            );
            self.cache_ttl_secs = shortest;
        }
        self
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::seconds(self.session_lifetime_secs)
    }

    pub fn onetime_lifetime(&self) -> Duration {
        Duration::seconds(self.onetime_lifetime_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        unsafe {
            std::env::remove_var("IDENTITY_SESSION_LIFETIME");
            std::env::remove_var("IDENTITY_ONETIME_LIFETIME");
            std::env::remove_var("IDENTITY_CACHE_TTL");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();

        let config = IdentityConfig::from_env().unwrap();
        assert_eq!(config.session_lifetime_secs, 1_209_600);
        assert_eq!(config.onetime_lifetime_secs, 3_600);
        assert_eq!(config.cache_ttl_secs, 900);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("IDENTITY_SESSION_LIFETIME", "86400");
            std::env::set_var("IDENTITY_ONETIME_LIFETIME", "600");
            std::env::set_var("IDENTITY_CACHE_TTL", "120");
        }

        let config = IdentityConfig::from_env().unwrap();
        assert_eq!(config.session_lifetime_secs, 86_400);
        assert_eq!(config.onetime_lifetime_secs, 600);
        assert_eq!(config.cache_ttl_secs, 120);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_cache_ttl_capped_at_shortest_lifetime() {
        clear_env();
        unsafe {
            std::env::set_var("IDENTITY_ONETIME_LIFETIME", "300");
            std::env::set_var("IDENTITY_CACHE_TTL", "900");
        }

        let config = IdentityConfig::from_env().unwrap();
        assert_eq!(config.cache_ttl_secs, 300);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_values_fall_back_to_defaults() {
        clear_env();
        unsafe {
            std::env::set_var("IDENTITY_SESSION_LIFETIME", "not-a-number");
        }

        let config = IdentityConfig::from_env().unwrap();
        assert_eq!(config.session_lifetime_secs, 1_209_600);

        clear_env();
    }
}
