//! Chunked reads with bounded buffers.

use std::io::{self, SeekFrom};
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

/// Buffer size for chunked reads.
const READ_CHUNK: usize = 256 * 1024;

/// Reads the whole file with a bounded buffer.
pub async fn read_all(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path).await?;
    let size = file.metadata().await.map(|m| m.len() as usize).unwrap_or(0);
    let mut reader = BufReader::with_capacity(READ_CHUNK, file);
    let mut out = Vec::with_capacity(size);
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

/// Reads at most the first `max_bytes` of the file.
pub async fn read_head(path: &Path, max_bytes: usize) -> io::Result<Vec<u8>> {
    let file = File::open(path).await?;
    let mut reader = BufReader::with_capacity(READ_CHUNK.min(max_bytes.max(1)), file);
    let mut out = Vec::with_capacity(max_bytes.min(READ_CHUNK));
    let mut chunk = vec![0u8; READ_CHUNK];
    while out.len() < max_bytes {
        let want = (max_bytes - out.len()).min(chunk.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

/// Reads `len` bytes starting at byte `offset`. Short reads at end-of-file
/// return whatever was available.
pub async fn read_range_bytes(path: &Path, offset: u64, len: usize) -> io::Result<Vec<u8>> {
    let mut file = File::open(path).await?;
    file.seek(SeekFrom::Start(offset)).await?;
    let mut reader = BufReader::with_capacity(READ_CHUNK, file);
    let mut out = Vec::with_capacity(len.min(READ_CHUNK));
    let mut chunk = vec![0u8; READ_CHUNK];
    while out.len() < len {
        let want = (len - out.len()).min(chunk.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            break;
        }
        out.extend_from_slice(&chunk[..n]);
    }
    Ok(out)
}

/// Returns lines `start..=end` (1-based, inclusive) through a buffered line
/// reader. The file is never slurped; reading stops at `end`.
pub async fn read_line_range(path: &Path, start: usize, end: usize) -> io::Result<Vec<String>> {
    let file = File::open(path).await?;
    let reader = BufReader::with_capacity(READ_CHUNK, file);
    let mut lines = reader.lines();
    let mut out = Vec::new();
    let mut number = 0usize;
    while let Some(line) = lines.next_line().await? {
        number += 1;
        if number < start {
            continue;
        }
        if number > end {
            break;
        }
        out.push(line);
    }
    Ok(out)
}
