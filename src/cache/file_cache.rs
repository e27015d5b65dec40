//! Byte-budgeted file content cache, stamped with the file mtime observed
//! at capture time.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use moka::sync::Cache;
use tracing::debug;

use crate::config::CacheConfig;

/// Cached bytes plus the mtime they were captured against.
#[derive(Debug, Clone)]
struct CachedFile {
    bytes: Arc<Vec<u8>>,
    mtime_at_capture: SystemTime,
}

/// File content store bounded by an aggregate byte budget.
///
/// Readers supply the file's current mtime; a mismatch means some external
/// process rewrote the file, so the entry is dropped and the lookup reports
/// a miss. Entries idle past the configured window become eviction
/// candidates; under budget pressure moka's admission policy evicts within
/// that bound. Files larger than the per-entry cap bypass the cache.
#[derive(Debug)]
pub struct FileCache {
    cache: Cache<PathBuf, CachedFile>,
    entry_max: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FileCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.file_capacity_bytes)
            .weigher(|_key: &PathBuf, value: &CachedFile| {
                value.bytes.len().try_into().unwrap_or(u32::MAX)
            })
            .time_to_idle(Duration::from_secs(config.file_idle_secs))
            .build();
        Self {
            cache,
            entry_max: config.file_entry_max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached bytes iff their captured mtime still matches.
    pub fn get(&self, path: &Path, current_mtime: SystemTime) -> Option<Arc<Vec<u8>>> {
        match self.cache.get(path) {
            Some(entry) if entry.mtime_at_capture == current_mtime => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.bytes)
            }
            Some(_) => {
                // Externally rewritten; the stale copy must never serve.
                self.cache.invalidate(path);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores bytes captured against the given mtime, unless the entry
    /// exceeds the per-entry cap.
    pub fn set(&self, path: &Path, bytes: Arc<Vec<u8>>, mtime: SystemTime) {
        if bytes.len() as u64 > self.entry_max {
            debug!(path = %path.display(), size = bytes.len(), "file too large to cache");
            return;
        }
        self.cache.insert(path.to_path_buf(), CachedFile { bytes, mtime_at_capture: mtime });
    }

    /// Removes the entry for `path`, if present.
    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn weighted_size(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.weighted_size()
    }
}
