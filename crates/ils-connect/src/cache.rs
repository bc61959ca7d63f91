//! In-memory access token cache.
//!
//! Tokens are cached per `(client_id, environment)` so independently
//! configured credential sets and environments never collide. Every write
//! replaces the whole entry; readers can never observe a token paired with
//! an expiry from a different exchange. Nothing is persisted; the cache is
//! rebuilt on process start.

use std::collections::HashMap;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::environment::Environment;

/// Safety margin before a token's declared expiry. A token inside the buffer
/// is treated as stale and refreshed proactively.
pub const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Cache key: one entry per client per environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// OAuth2 client identifier.
    pub client_id: String,
    /// Target environment.
    pub environment: Environment,
}

/// A cached access token with its absolute expiry.
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The bearer access token.
    pub access_token: String,
    /// Token type reported by the gateway.
    pub token_type: String,
    /// Absolute expiry instant.
    pub expires_at: OffsetDateTime,
}

impl CachedToken {
    /// Returns `true` if the token is still usable at `now`, leaving the
    /// given buffer before the declared expiry.
    #[must_use]
    pub fn is_fresh_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
        now + buffer < self.expires_at
    }
}

/// Concurrent token cache.
///
/// Concurrent misses may each trigger their own exchange; the last full
/// entry written wins. Duplicate exchanges are wasteful but harmless, so no
/// single-flight de-duplication is done here.
#[derive(Default)]
pub struct TokenCache {
    entries: RwLock<HashMap<CacheKey, CachedToken>>,
}

impl TokenCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the entry for `key` if it is still fresh at `now`.
    pub async fn get_fresh(
        &self,
        key: &CacheKey,
        now: OffsetDateTime,
        buffer: Duration,
    ) -> Option<CachedToken> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|token| token.is_fresh_at(now, buffer))
            .cloned()
    }

    /// Stores a full replacement entry for `key`.
    pub async fn insert(&self, key: CacheKey, token: CachedToken) {
        let mut entries = self.entries.write().await;
        entries.insert(key, token);
    }

    /// Drops all entries (credential rotation, explicit invalidation).
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        tracing::debug!("Cleared token cache");
    }

    /// Returns the number of cached entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the cache is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(client_id: &str, environment: Environment) -> CacheKey {
        CacheKey {
            client_id: client_id.to_string(),
            environment,
        }
    }

    fn token(value: &str, expires_at: OffsetDateTime) -> CachedToken {
        CachedToken {
            access_token: value.to_string(),
            token_type: "Bearer".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_freshness_respects_buffer() {
        let now = OffsetDateTime::now_utc();
        let entry = token("tok-1", now + Duration::from_secs(600));

        assert!(entry.is_fresh_at(now, EXPIRY_BUFFER));
        // Inside the buffer: stale even though not yet expired.
        assert!(!entry.is_fresh_at(now + Duration::from_secs(541), EXPIRY_BUFFER));
        // Past the declared expiry: stale.
        assert!(!entry.is_fresh_at(now + Duration::from_secs(601), EXPIRY_BUFFER));
    }

    #[tokio::test]
    async fn test_get_fresh_filters_stale_entries() {
        let cache = TokenCache::new();
        let now = OffsetDateTime::now_utc();
        let k = key("abc123", Environment::Sandbox);

        cache
            .insert(k.clone(), token("tok-1", now + Duration::from_secs(30)))
            .await;

        // 30s of life left is inside the 60s buffer.
        assert!(cache.get_fresh(&k, now, EXPIRY_BUFFER).await.is_none());

        cache
            .insert(k.clone(), token("tok-2", now + Duration::from_secs(600)))
            .await;
        let hit = cache.get_fresh(&k, now, EXPIRY_BUFFER).await.unwrap();
        assert_eq!(hit.access_token, "tok-2");
    }

    #[tokio::test]
    async fn test_keys_partition_by_client_and_environment() {
        let cache = TokenCache::new();
        let now = OffsetDateTime::now_utc();
        let expires_at = now + Duration::from_secs(600);

        cache
            .insert(key("a", Environment::Sandbox), token("tok-a", expires_at))
            .await;
        cache
            .insert(key("a", Environment::Production), token("tok-p", expires_at))
            .await;
        cache
            .insert(key("b", Environment::Sandbox), token("tok-b", expires_at))
            .await;

        assert_eq!(cache.len().await, 3);
        let hit = cache
            .get_fresh(&key("a", Environment::Production), now, EXPIRY_BUFFER)
            .await
            .unwrap();
        assert_eq!(hit.access_token, "tok-p");
    }

    #[tokio::test]
    async fn test_insert_replaces_whole_entry() {
        let cache = TokenCache::new();
        let now = OffsetDateTime::now_utc();
        let k = key("abc123", Environment::Sandbox);

        cache
            .insert(k.clone(), token("tok-1", now + Duration::from_secs(600)))
            .await;
        cache
            .insert(k.clone(), token("tok-2", now + Duration::from_secs(1200)))
            .await;

        assert_eq!(cache.len().await, 1);
        let hit = cache.get_fresh(&k, now, EXPIRY_BUFFER).await.unwrap();
        assert_eq!(hit.access_token, "tok-2");
        assert_eq!(hit.expires_at, now + Duration::from_secs(1200));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache = TokenCache::new();
        let now = OffsetDateTime::now_utc();

        cache
            .insert(
                key("a", Environment::Sandbox),
                token("tok-a", now + Duration::from_secs(600)),
            )
            .await;
        assert!(!cache.is_empty().await);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
