//! TTL cache of rendered directory listings, stamped with the directory
//! mtime observed at capture time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use moka::sync::Cache;

use crate::config::CacheConfig;

/// A rendered listing plus the mtime it was captured against.
#[derive(Debug, Clone)]
struct DirListing {
    rendered: Arc<String>,
    mtime_at_capture: SystemTime,
}

/// Directory listing cache.
///
/// Readers supply the directory's current mtime; a mismatch means some
/// external process touched the directory, so the entry is dropped and the
/// lookup reports a miss.
#[derive(Debug)]
pub struct DirCache {
    cache: Cache<PathBuf, DirListing>,
}

impl DirCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(4096)
            .time_to_live(Duration::from_secs(config.dir_ttl_secs))
            .build();
        Self { cache }
    }

    /// Returns the cached listing iff its captured mtime still matches.
    pub fn get(&self, path: &Path, current_mtime: SystemTime) -> Option<Arc<String>> {
        let entry = self.cache.get(path)?;
        if entry.mtime_at_capture != current_mtime {
            self.cache.invalidate(path);
            return None;
        }
        Some(entry.rendered)
    }

    /// Stores a listing captured against the given mtime.
    pub fn set(&self, path: &Path, rendered: Arc<String>, mtime: SystemTime) {
        self.cache.insert(
            path.to_path_buf(),
            DirListing { rendered, mtime_at_capture: mtime },
        );
    }

    /// Removes the entry for `path`, if present.
    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}
