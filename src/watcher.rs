//! Filesystem watcher feeding cache invalidation.
//!
//! External processes can mutate files behind the server's back; watching
//! the allowed roots keeps the cache tier from serving their stale ghosts.
//! The watcher is best-effort: losing it degrades to TTL/mtime expiry.

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::CacheTier;

/// Keeps the OS watcher and its forwarding task alive.
pub struct WatchGuard {
    _watcher: RecommendedWatcher,
    _task: JoinHandle<()>,
}

/// Watches the given roots recursively and invalidates cache entries for
/// every reported path.
pub fn spawn(roots: &[PathBuf], cache: Arc<CacheTier>) -> notify::Result<WatchGuard> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })?;
    for root in roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
    }

    let task = tokio::spawn(async move {
        while let Some(result) = rx.recv().await {
            match result {
                Ok(event) => {
                    for path in &event.paths {
                        debug!(path = %path.display(), "external change, invalidating cache");
                        cache.invalidate_path(path);
                    }
                }
                Err(err) => warn!(%err, "watcher error"),
            }
        }
    });

    Ok(WatchGuard { _watcher: watcher, _task: task })
}
