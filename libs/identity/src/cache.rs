//! Verified-token cache
//!
//! Resolving a token the slow way costs two store lookups plus a signature
//! check, so once a token has been fully verified the resulting
//! [`Principal`] is cached under the raw token string. Only verified
//! outcomes are ever written here; a forged token can therefore never seed
//! the cache. Entries live at most the configured TTL, which is capped at
//! the shortest token lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::models::Principal;
use common::cache::RedisPool;

/// Versioned key prefix; bump the version when the serialized principal
/// layout changes so stale entries from an older build read as misses.
const CACHE_PREFIX: &str = "identity-v1";

fn cache_key(token: &str) -> String {
    format!("{CACHE_PREFIX}:token:{token}")
}

/// Storage for verified-token lookups, keyed by the raw token string.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get(&self, token: &str) -> Result<Option<Principal>>;
    async fn set(&self, token: &str, principal: &Principal) -> Result<()>;
    async fn delete(&self, token: &str) -> Result<()>;
}

/// Redis-backed cache shared across instances.
#[derive(Clone)]
pub struct RedisSessionCache {
    redis_pool: RedisPool,
    ttl_secs: u64,
}

impl RedisSessionCache {
    pub fn new(redis_pool: RedisPool, ttl_secs: u64) -> Self {
        Self {
            redis_pool,
            ttl_secs,
        }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, token: &str) -> Result<Option<Principal>> {
        let Some(raw) = self.redis_pool.get(&cache_key(token)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(principal) => Ok(Some(principal)),
            Err(e) => {
                // Layout drift from an older build; treat as a miss.
                warn!(error = %e, "dropping undecodable cache entry");
                let _ = self.redis_pool.delete(&cache_key(token)).await;
                Ok(None)
            }
        }
    }

    async fn set(&self, token: &str, principal: &Principal) -> Result<()> {
        if self.ttl_secs == 0 {
            return Ok(());
        }
        let raw = serde_json::to_string(principal)?;
        self.redis_pool
            .set(&cache_key(token), &raw, Some(self.ttl_secs))
            .await?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.redis_pool.delete(&cache_key(token)).await?;
        Ok(())
    }
}

/// In-memory cache for development, tests, and single-instance deployments.
/// Entries are dropped lazily when read after their deadline.
#[derive(Clone)]
pub struct MemorySessionCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, (DateTime<Utc>, Principal)>>>,
}

impl MemorySessionCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_secs as i64),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of live entries (stale ones included until read).
    pub fn len(&self) -> usize {
        self.entries.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new(900)
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn get(&self, token: &str) -> Result<Option<Principal>> {
        let deadline = {
            let entries = self
                .entries
                .read()
                .map_err(|_| anyhow::anyhow!("session cache lock poisoned"))?;
            match entries.get(token) {
                Some((deadline, principal)) => {
                    if *deadline > Utc::now() {
                        return Ok(Some(principal.clone()));
                    }
                    *deadline
                }
                None => return Ok(None),
            }
        };

        // Stale; drop it unless a writer already replaced it.
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow::anyhow!("session cache lock poisoned"))?;
        if let Some((current, _)) = entries.get(token) {
            if *current == deadline {
                entries.remove(token);
            }
        }
        Ok(None)
    }

    async fn set(&self, token: &str, principal: &Principal) -> Result<()> {
        if self.ttl <= Duration::zero() {
            return Ok(());
        }
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("session cache lock poisoned"))?
            .insert(token.to_owned(), (Utc::now() + self.ttl, principal.clone()));
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| anyhow::anyhow!("session cache lock poisoned"))?
            .remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Session, User};
    use uuid::Uuid;

    fn sample_principal() -> Principal {
        let user = User {
            uuid: Uuid::now_v7(),
            username: "someone@example.com".to_string(),
            password_digest: String::new(),
            role: Role::USER,
            api_key: "key".to_string(),
            verification_token: None,
            reset_token: None,
            verified: true,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let session = Session::issue(&user, Duration::hours(1)).unwrap();
        Principal {
            role: user.role,
            session: Some(session),
            user,
        }
    }

    #[tokio::test]
    async fn test_memory_cache_hits_within_ttl() {
        let cache = MemorySessionCache::new(900);
        let principal = sample_principal();
        let token = principal.session.as_ref().unwrap().token.clone();

        cache.set(&token, &principal).await.unwrap();
        let hit = cache.get(&token).await.unwrap().unwrap();
        assert_eq!(hit.user.uuid, principal.user.uuid);
        assert_eq!(hit.role, principal.role);
    }

    #[tokio::test]
    async fn test_memory_cache_misses_unknown_tokens() {
        let cache = MemorySessionCache::new(900);
        assert!(cache.get("never-seen").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_expires_entries() {
        let cache = MemorySessionCache::new(0);
        let principal = sample_principal();

        // Zero TTL means nothing is retained at all.
        cache.set("token", &principal).await.unwrap();
        assert!(cache.get("token").await.unwrap().is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_memory_cache_delete_and_clear() {
        let cache = MemorySessionCache::new(900);
        let principal = sample_principal();

        cache.set("a", &principal).await.unwrap();
        cache.set("b", &principal).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.delete("a").await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_some());

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cached_principal_round_trip_drops_secret_material() {
        // The Redis path stores serialized principals; make sure nothing
        // secret survives the round trip.
        let principal = sample_principal();
        let raw = serde_json::to_string(&principal).unwrap();
        assert!(!raw.contains(&principal.session.as_ref().unwrap().secret));

        let back: Principal = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.user.uuid, principal.user.uuid);
        assert_eq!(back.session.as_ref().unwrap().secret, "");
        assert_eq!(back.user.password_digest, "");
    }
}
