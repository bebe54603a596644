//! Cache storage: the `Cache` contract and the in-process implementation.
//!
//! Entries are opaque serialized snapshots with an absolute expiry. An absent
//! or expired entry is a miss, never an error.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use thiserror::Error;
use time::OffsetDateTime;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Key-value contract the coordinator depends on.
///
/// Implementations must be individually safe for concurrent use; the
/// coordinator takes no lock across operations.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Unconditionally overwrite the entry under `key`.
    async fn put(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch an entry; `None` on absence or expiry.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Remove an entry; deleting an absent key is not an error.
    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;
}

struct Entry {
    value: Bytes,
    expires_at: OffsetDateTime,
}

/// In-process cache with LRU capacity bound and per-entry absolute expiry.
///
/// A `put` replaces the whole entry under a single write lock, so readers
/// observe either the previous snapshot or the new one, never a partial write.
pub struct MemoryCache {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.entry_limit_non_zero())),
        }
    }

    /// Number of live entries, counting expired-but-unreaped ones.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Cached state is expendable by contract, so this is
    /// always safe.
    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn put(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = OffsetDateTime::now_utc() + ttl;
        rw_write(&self.entries, SOURCE, "put")
            .put(key.as_str().to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key.as_str()) {
            Some(entry) if entry.expires_at > OffsetDateTime::now_utc() => {
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                // Expired: reap on observation.
                entries.pop(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        rw_write(&self.entries, SOURCE, "delete").pop(key.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    fn cache() -> MemoryCache {
        MemoryCache::new(&CacheConfig::default())
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let cache = cache();
        let key = CacheKey::from_path("/samples/1");

        assert!(cache.get(&key).await.unwrap().is_none());

        cache
            .put(&key, Bytes::from_static(b"{\"id\":1}"), Duration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get(&key).await.unwrap().expect("cached value");
        assert_eq!(hit, Bytes::from_static(b"{\"id\":1}"));
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let cache = cache();
        let key = CacheKey::from_path("/samples");

        cache
            .put(&key, Bytes::from_static(b"old"), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .put(&key, Bytes::from_static(b"new"), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get(&key).await.unwrap().unwrap(),
            Bytes::from_static(b"new")
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = cache();
        let key = CacheKey::from_path("/samples/2");

        cache
            .put(&key, Bytes::from_static(b"x"), Duration::ZERO)
            .await
            .unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
        // Reaped on observation, not merely hidden.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = cache();
        let key = CacheKey::from_path("/samples/3");

        cache.delete(&key).await.unwrap();

        cache
            .put(&key, Bytes::from_static(b"x"), Duration::from_secs(60))
            .await
            .unwrap();
        cache.delete(&key).await.unwrap();
        cache.delete(&key).await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lru_eviction_respects_entry_limit() {
        let cache = MemoryCache::new(&CacheConfig {
            entry_limit: 2,
            ..Default::default()
        });

        for id in 1..=3 {
            cache
                .put(
                    &CacheKey::from_path(&format!("/samples/{id}")),
                    Bytes::from_static(b"x"),
                    Duration::from_secs(60),
                )
                .await
                .unwrap();
        }

        assert!(
            cache
                .get(&CacheKey::from_path("/samples/1"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            cache
                .get(&CacheKey::from_path("/samples/3"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn recovers_from_poisoned_lock() {
        let cache = cache();
        let key = CacheKey::from_path("/samples");

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = cache.entries.write().expect("entries lock");
            panic!("poison entries lock");
        }));

        cache
            .put(&key, Bytes::from_static(b"x"), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());
    }
}
