//! Whole-file direct I/O.

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use super::{commit_temp, existing_permissions, open_temp, temp_path_for};

/// Reads the entire file into memory.
pub async fn read(path: &Path) -> io::Result<Vec<u8>> {
    tokio::fs::read(path).await
}

/// Atomically replaces `path` with `bytes`.
///
/// The content is written to a sibling temporary file, fsynced, and renamed
/// over the target, so a crash mid-write never leaves a torn file behind.
pub async fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path_for(path);
    let previous = existing_permissions(path).await;
    let mut file = open_temp(&tmp).await?;
    if let Err(err) = file.write_all(bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }
    commit_temp(file, &tmp, path, previous).await
}
