//! Three-tier in-memory cache: file bytes, directory listings, metadata.
//!
//! The cache is best-effort. Failures during set or invalidate are logged
//! and never become operation failures; readers that miss simply fall back
//! to the strategy layer. Everything here is cold on startup and torn down
//! with the process.

mod dir_cache;
mod file_cache;
mod meta_cache;
mod prefetch;

#[cfg(test)]
mod tests;

pub use dir_cache::DirCache;
pub use file_cache::FileCache;
pub use meta_cache::MetaCache;
pub use prefetch::{spawn_worker as spawn_prefetch_worker, Prefetcher};

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::config::CacheConfig;

/// Aggregated view over the three sub-caches.
#[derive(Debug)]
pub struct CacheTier {
    pub files: FileCache,
    pub dirs: DirCache,
    pub meta: MetaCache,
    prefetcher: Option<Arc<Prefetcher>>,
}

impl CacheTier {
    /// Builds all three sub-caches from the operator configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let prefetcher = config
            .prefetch
            .then(|| Arc::new(Prefetcher::new(config.prefetch_queue_len)));
        Self {
            files: FileCache::new(config),
            dirs: DirCache::new(config),
            meta: MetaCache::new(config),
            prefetcher,
        }
    }

    /// Records a file access and, past the hot threshold, suggests the
    /// file's directory for sibling prefetching.
    pub fn note_access(&self, path: &Path) {
        if let Some(prefetcher) = &self.prefetcher {
            prefetcher.note_access(path);
        }
    }

    /// Hands the prefetcher reference to the background worker.
    pub fn prefetcher(&self) -> Option<Arc<Prefetcher>> {
        self.prefetcher.clone()
    }

    /// Drops every entry derived from `path`: the file entry itself and the
    /// parent directory's listing. Called at the end of any mutation.
    pub fn invalidate_path(&self, path: &Path) {
        self.files.invalidate(path);
        if let Some(parent) = path.parent() {
            self.dirs.invalidate(parent);
        }
        self.dirs.invalidate(path);
    }

    /// Point-in-time counters for the telemetry summary.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            file_hits: self.files.hits(),
            file_misses: self.files.misses(),
            file_entries: self.files.entry_count(),
            file_bytes: self.files.weighted_size(),
            dir_entries: self.dirs.entry_count(),
            meta_entries: self.meta.entry_count(),
        }
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub file_hits: u64,
    pub file_misses: u64,
    pub file_entries: u64,
    pub file_bytes: u64,
    pub dir_entries: u64,
    pub meta_entries: u64,
}
