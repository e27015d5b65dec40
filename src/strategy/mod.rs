//! I/O execution strategies: direct, streaming write, chunked read.
//!
//! Every mutation funnels through an atomic replace: content goes to a
//! sibling temporary file with a cryptographically random name and
//! owner-only permissions, is fsynced, and then renamed over the target.
//! Overwrites preserve the destination's existing permission bits.

pub mod chunked;
pub mod direct;
pub mod streaming;


use std::fs::Permissions;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::rng::random_token;
use crate::sizing::SizeClass;

/// Reads a whole file through the route its size class selects.
pub async fn read_for_class(path: &Path, class: SizeClass) -> io::Result<Vec<u8>> {
    if class.is_direct() {
        direct::read(path).await
    } else {
        chunked::read_all(path).await
    }
}

/// Writes a whole file through the route its size class selects.
pub async fn write_for_class(path: &Path, bytes: &[u8], class: SizeClass) -> io::Result<()> {
    if class.is_direct() {
        direct::atomic_write(path, bytes).await
    } else {
        streaming::write(path, bytes).await
    }
}

/// Sibling temporary path with a random, unpredictable name.
pub(crate) fn temp_path_for(path: &Path) -> PathBuf {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("file");
    parent.join(format!(".{}.{}.tmp", name, random_token(12)))
}

/// Opens a fresh temporary file with owner-only permissions.
pub(crate) async fn open_temp(tmp: &Path) -> io::Result<File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        options.mode(0o600);
    }
    options.open(tmp).await
}

/// Captures the permission bits of an existing target, if any.
pub(crate) async fn existing_permissions(path: &Path) -> Option<Permissions> {
    tokio::fs::metadata(path).await.ok().map(|meta| meta.permissions())
}

/// Fsyncs the temporary file and renames it over the target, restoring the
/// target's previous permission bits when it already existed.
pub(crate) async fn commit_temp(
    mut file: File,
    tmp: &Path,
    path: &Path,
    previous: Option<Permissions>,
) -> io::Result<()> {
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    if let Some(perms) = previous {
        tokio::fs::set_permissions(tmp, perms).await?;
    }
    match tokio::fs::rename(tmp, path).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = tokio::fs::remove_file(tmp).await;
            Err(err)
        }
    }
}
