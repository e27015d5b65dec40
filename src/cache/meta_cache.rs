//! TTL cache for opaque metadata values.

use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;

use crate::config::CacheConfig;

/// Small TTL-bounded store keyed by arbitrary strings. Values are opaque to
/// the cache; callers serialize whatever they need.
#[derive(Debug)]
pub struct MetaCache {
    cache: Cache<String, Arc<String>>,
}

impl MetaCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(16 * 1024)
            .time_to_live(Duration::from_secs(config.meta_ttl_secs))
            .build();
        Self { cache }
    }

    pub fn get(&self, key: &str) -> Option<Arc<String>> {
        self.cache.get(key)
    }

    pub fn set(&self, key: &str, value: Arc<String>) {
        self.cache.insert(key.to_owned(), value);
    }

    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
