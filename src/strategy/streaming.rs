//! Streaming write: fixed-size chunks into the atomic-replace funnel.

use std::io;
use std::path::Path;

use tokio::io::AsyncWriteExt;

use super::{commit_temp, existing_permissions, open_temp, temp_path_for};

/// Chunk size for streaming writes.
pub const CHUNK_SIZE: usize = 256 * 1024;

/// Writes `bytes` to `path` in fixed-size chunks through a temporary file.
///
/// Semantics match [`super::direct::atomic_write`]; only the write pattern
/// differs, keeping peak buffer pressure bounded for very large payloads.
pub async fn write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = temp_path_for(path);
    let previous = existing_permissions(path).await;
    let mut file = open_temp(&tmp).await?;
    for chunk in bytes.chunks(CHUNK_SIZE) {
        if let Err(err) = file.write_all(chunk).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }
    }
    commit_temp(file, &tmp, path, previous).await
}
