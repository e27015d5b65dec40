//! Hot-file sibling prefetching.
//!
//! Files accessed three or more times mark their directory as hot. A
//! background worker drains a bounded queue of hot directories and pulls
//! their small sibling files into the file cache. Queue overflow drops the
//! suggestion; prefetching is purely opportunistic.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_queue::ArrayQueue;
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use super::CacheTier;

/// Accesses after which a file's directory becomes a prefetch candidate.
const HOT_THRESHOLD: u32 = 3;

/// Tracks per-file access counts and queues hot directories.
#[derive(Debug)]
pub struct Prefetcher {
    counts: DashMap<PathBuf, u32>,
    queue: ArrayQueue<PathBuf>,
}

impl Prefetcher {
    pub fn new(queue_len: usize) -> Self {
        Self { counts: DashMap::new(), queue: ArrayQueue::new(queue_len.max(1)) }
    }

    /// Bumps the access counter; on crossing the hot threshold, suggests the
    /// parent directory for prefetching.
    pub fn note_access(&self, path: &Path) {
        let mut entry = self.counts.entry(path.to_path_buf()).or_insert(0);
        *entry += 1;
        if *entry != HOT_THRESHOLD {
            return;
        }
        drop(entry);
        if let Some(parent) = path.parent() {
            if self.queue.push(parent.to_path_buf()).is_err() {
                debug!(dir = %parent.display(), "prefetch queue full, dropping suggestion");
            }
        }
    }

    /// Takes the next suggested directory, if any.
    pub fn pop_suggestion(&self) -> Option<PathBuf> {
        self.queue.pop()
    }
}

/// Spawns the background worker that services prefetch suggestions.
pub fn spawn_worker(tier: Arc<CacheTier>, max_bytes: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        loop {
            ticker.tick().await;
            let Some(prefetcher) = tier.prefetcher() else { return };
            while let Some(dir) = prefetcher.pop_suggestion() {
                prefetch_directory(&tier, &dir, max_bytes).await;
            }
        }
    })
}

/// Reads small sibling files of a hot directory into the file cache.
async fn prefetch_directory(tier: &CacheTier, dir: &Path, max_bytes: u64) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(meta) = entry.metadata().await else { continue };
        if !meta.is_file() || meta.len() > max_bytes {
            continue;
        }
        let path = entry.path();
        let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        if tier.files.get(&path, mtime).is_some() {
            continue;
        }
        match tokio::fs::read(&path).await {
            Ok(bytes) => tier.files.set(&path, Arc::new(bytes), mtime),
            Err(err) => debug!(path = %path.display(), %err, "prefetch read failed"),
        }
    }
}
