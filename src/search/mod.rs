//! Search substrate: line scanning with coordinate tracking, directory
//! walking, and the compiled-pattern cache.
//!
//! All search operations funnel through [`scanner::scan_lines`]; matches
//! carry 1-based line numbers and 0-based byte offsets within the line.

pub mod scanner;

#[cfg(test)]
mod tests;

pub use scanner::{ScanOptions, SearchMatch};

use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::OpResult;

/// Recursively collects regular files under `root`, depth-first.
///
/// Hidden entries (dot-prefixed) are skipped, as are files whose extension
/// is not in `extensions` when a filter is supplied. Traversal stops early
/// once `limit` files are collected or the token fires.
pub async fn collect_files(
    root: &Path,
    extensions: Option<&[String]>,
    limit: usize,
    cancel: &CancelToken,
) -> OpResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk(root, extensions, limit, cancel, &mut out).await?;
    Ok(out)
}

fn walk<'a>(
    dir: &'a Path,
    extensions: Option<&'a [String]>,
    limit: usize,
    cancel: &'a CancelToken,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = OpResult<()>> + Send + 'a>> {
    Box::pin(async move {
        if out.len() >= limit {
            return Ok(());
        }
        cancel.check()?;
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if out.len() >= limit {
                return Ok(());
            }
            let name = entry.file_name();
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            let meta = entry.metadata().await?;
            let path = entry.path();
            if meta.is_dir() {
                walk(&path, extensions, limit, cancel, out).await?;
            } else if meta.is_file() && extension_matches(&path, extensions) {
                out.push(path);
            }
        }
        Ok(())
    })
}

fn extension_matches(path: &Path, extensions: Option<&[String]>) -> bool {
    let Some(wanted) = extensions else { return true };
    if wanted.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    wanted.iter().any(|w| w.trim_start_matches('.').eq_ignore_ascii_case(ext))
}
