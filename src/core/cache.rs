pub mod memory_cache;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use crate::core::cache::memory_cache::{InMemoryCache, NoopCache};
use crate::core::domain::Configuration;
use crate::core::library::LibraryResult;

// Key of the cached collection returned by get-all operations.
pub const ALL_KEY: &str = "all";

// Cache is a best-effort, namespaced key/value store. It is never authoritative, so
// its operations cannot fail: a broken backend simply behaves like a miss.
#[async_trait]
pub trait Cache: Sync + Send {
    fn namespace(&self) -> &str;
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, value: String);
    async fn evict(&self, key: &str);
}

pub fn create_cache(config: &Configuration, namespace: &str) -> Box<dyn Cache> {
    if config.cache_enabled {
        Box::new(InMemoryCache::new(namespace, config.cache_ttl_secs.map(Duration::from_secs)))
    } else {
        Box::new(NoopCache::new(namespace))
    }
}

/// Explicit cache-aside access over a [`Cache`]. Values are kept as JSON so a single
/// namespace can hold both the collection entry and per-id entries.
///
/// Every explicit `put` or `evict` bumps a generation counter before touching the backend.
/// A value computed on a miss is only stored when no write happened while it was being
/// computed, so a slow reader never resurrects an entry a writer already replaced.
pub struct CacheAside {
    cache: Box<dyn Cache>,
    generation: AtomicU64,
}

impl CacheAside {
    pub fn new(cache: Box<dyn Cache>) -> Self {
        Self {
            cache,
            generation: AtomicU64::new(0),
        }
    }

    pub fn namespace(&self) -> &str {
        self.cache.namespace()
    }

    /// Returns the cached value for `key`, or runs `supplier` and caches what it returns.
    /// Errors from `supplier` are propagated and never cached.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, supplier: F) -> LibraryResult<T>
        where T: Serialize + DeserializeOwned,
              F: FnOnce() -> Fut,
              Fut: Future<Output=LibraryResult<T>> {
        if let Some(json) = self.cache.get(key).await {
            match serde_json::from_str::<T>(json.as_str()) {
                Ok(value) => {
                    debug!(cache = self.namespace(), key, "cache hit");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(cache = self.namespace(), key, error = %err, "dropping undecodable cache entry");
                    self.cache.evict(key).await;
                }
            }
        }
        debug!(cache = self.namespace(), key, "cache miss");
        let observed = self.generation.load(Ordering::SeqCst);
        let value = supplier().await?;
        if self.generation.load(Ordering::SeqCst) != observed {
            debug!(cache = self.namespace(), key, "skipping cache fill after concurrent write");
            return Ok(value);
        }
        self.store(key, &value).await;
        // a write racing with the fill above may have been overtaken by it
        if self.generation.load(Ordering::SeqCst) != observed {
            self.cache.evict(key).await;
        }
        Ok(value)
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store(key, value).await
    }

    pub async fn evict(&self, key: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.evict(key).await
    }

    pub async fn evict_collection(&self) {
        self.evict(ALL_KEY).await
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.cache.put(key, json).await,
            Err(err) => {
                warn!(cache = self.namespace(), key, error = %err, "failed to encode cache entry");
                self.cache.evict(key).await;
            }
        }
    }
}
