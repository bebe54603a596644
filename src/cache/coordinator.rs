//! Cache-aside coordinator.
//!
//! Orchestrates the two halves of the pattern around caller-supplied store
//! operations: reads populate the cache after responding, writes purge every
//! key that could hold a stale view. Both cache legs are detached background
//! tasks with their own deadlines; their failures are logged and swallowed,
//! never surfaced to the caller and never rolled back into the store.
//!
//! Consistency is eventual: an invalidation from one request is unordered
//! relative to populations and invalidations from concurrent requests, so a
//! read-through hit may be stale for up to the invalidation task's completion
//! latency. It can never be partial, because `Cache::put` is atomic.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::store::Cache;
use super::tasks::TaskTracker;

const SOURCE: &str = "cache::coordinator";

/// The coordinator. Cheap to clone through `Arc`; holds no cross-operation
/// lock.
pub struct CacheAside {
    config: CacheConfig,
    cache: Arc<dyn Cache>,
    tasks: TaskTracker,
}

impl CacheAside {
    pub fn new(config: CacheConfig, cache: Arc<dyn Cache>, tasks: TaskTracker) -> Self {
        Self {
            config,
            cache,
            tasks,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    /// Read path: fetch from the store, respond, then populate the cache in
    /// the background.
    ///
    /// Any fetch error (including not-found) returns without touching the
    /// cache.
    pub async fn read_with_cache<T, E, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T, E>
    where
        T: Serialize + Clone + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let value = fetch().await?;
        if self.config.enabled {
            self.schedule_population(key, value.clone());
        }
        Ok(value)
    }

    /// Write path: mutate the store, respond, then purge `keys` in the
    /// background.
    ///
    /// A failed mutation leaves the cache untouched.
    pub async fn write_with_invalidation<T, E, F, Fut>(
        &self,
        mutate: F,
        keys: Vec<CacheKey>,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = mutate().await?;
        self.schedule_invalidation(keys);
        Ok(result)
    }

    /// Read-through short-circuit: return the cached bytes for `key` if
    /// present.
    ///
    /// Misses, errors, and timeouts all fall through as `None`; the cache is
    /// never allowed to fail a read.
    pub async fn read_through(&self, key: &CacheKey) -> Option<bytes::Bytes> {
        if !self.config.enabled {
            return None;
        }

        match timeout(self.config.op_timeout(), self.cache.get(key)).await {
            Ok(Ok(Some(bytes))) => {
                counter!("cachet_cache_hit_total").increment(1);
                debug!(target: SOURCE, key = %key, outcome = "hit", "read-through");
                Some(bytes)
            }
            Ok(Ok(None)) => {
                counter!("cachet_cache_miss_total").increment(1);
                debug!(target: SOURCE, key = %key, outcome = "miss", "read-through");
                None
            }
            Ok(Err(err)) => {
                counter!("cachet_cache_miss_total").increment(1);
                warn!(target: SOURCE, key = %key, error = %err, "cache read failed, falling through");
                None
            }
            Err(_) => {
                counter!("cachet_cache_miss_total").increment(1);
                warn!(target: SOURCE, key = %key, "cache read timed out, falling through");
                None
            }
        }
    }

    /// Block until outstanding population/invalidation tasks finish, up to
    /// `limit`. Called once at shutdown.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.tasks.drain(limit).await
    }

    fn schedule_population<T>(&self, key: CacheKey, value: T)
    where
        T: Serialize + Send + 'static,
    {
        if !self.config.enabled {
            return;
        }

        let cache = self.cache.clone();
        let ttl = self.config.entry_ttl();
        let deadline = self.config.op_timeout();

        self.tasks.spawn(async move {
            counter!("cachet_cache_population_total").increment(1);

            let bytes = match serde_json::to_vec(&value) {
                Ok(bytes) => bytes::Bytes::from(bytes),
                Err(err) => {
                    counter!("cachet_cache_population_failure_total").increment(1);
                    warn!(target: SOURCE, key = %key, error = %err, "population serialize failed");
                    return;
                }
            };

            match timeout(deadline, cache.put(&key, bytes, ttl)).await {
                Ok(Ok(())) => {
                    debug!(target: SOURCE, key = %key, "populated cache entry");
                }
                Ok(Err(err)) => {
                    counter!("cachet_cache_population_failure_total").increment(1);
                    warn!(target: SOURCE, key = %key, error = %err, "population put failed");
                }
                Err(_) => {
                    counter!("cachet_cache_population_failure_total").increment(1);
                    warn!(target: SOURCE, key = %key, "population put timed out");
                }
            }
        });
    }

    fn schedule_invalidation(&self, keys: Vec<CacheKey>) {
        if !self.config.enabled || keys.is_empty() {
            return;
        }

        let cache = self.cache.clone();
        let deadline = self.config.op_timeout();

        self.tasks.spawn(async move {
            counter!("cachet_cache_invalidation_total").increment(1);

            for key in keys {
                match timeout(deadline, cache.delete(&key)).await {
                    Ok(Ok(())) => {
                        debug!(target: SOURCE, key = %key, "invalidated cache entry");
                    }
                    Ok(Err(err)) => {
                        counter!("cachet_cache_invalidation_failure_total").increment(1);
                        warn!(target: SOURCE, key = %key, error = %err, "invalidation delete failed");
                    }
                    Err(_) => {
                        counter!("cachet_cache_invalidation_failure_total").increment(1);
                        warn!(target: SOURCE, key = %key, "invalidation delete timed out");
                    }
                }
            }
        });
    }
}
