use std::time::{Duration, Instant};
use async_trait::async_trait;
use dashmap::DashMap;
use crate::core::cache::Cache;

struct CacheEntry {
    value: String,
    stored_at: Instant,
}

// InMemoryCache is a process-local cache with an optional time-to-live.
// Expired entries are dropped lazily when they are read.
pub struct InMemoryCache {
    namespace: String,
    ttl: Option<Duration>,
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCache {
    pub fn new(namespace: &str, ttl: Option<Duration>) -> Self {
        Self {
            namespace: namespace.to_string(),
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        match self.ttl {
            Some(ttl) => entry.stored_at.elapsed() >= ttl,
            None => false,
        }
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    async fn get(&self, key: &str) -> Option<String> {
        let hit = self.entries.get(key).map(|r| {
            let entry = r.value();
            (entry.value.clone(), self.is_expired(entry))
        });
        match hit {
            Some((value, false)) => Some(value),
            Some((_, true)) => {
                self.entries.remove_if(key, |_, entry| self.is_expired(entry));
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, value: String) {
        self.entries.insert(key.to_string(), CacheEntry { value, stored_at: Instant::now() });
    }

    async fn evict(&self, key: &str) {
        self.entries.remove(key);
    }
}

// NoopCache is used when caching is disabled; every read is a miss.
pub struct NoopCache {
    namespace: String,
}

impl NoopCache {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl Cache for NoopCache {
    fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn put(&self, _key: &str, _value: String) {}

    async fn evict(&self, _key: &str) {}
}
