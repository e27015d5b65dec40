//! File read and write operations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

use super::Engine;
use crate::cancel::CancelToken;
use crate::edit::pipeline::{Occurrence, Replacement};
use crate::edit::{EditResult, WriteResult};
use crate::error::{OpError, OpResult};
use crate::sizing::{choose_route, OpKind, SizeClass};
use crate::strategy::{self, chunked};

/// Which part of the file `read_file` returns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    #[default]
    All,
    Head,
    Tail,
}

/// Result document for `read_file`.
#[derive(Debug, Clone, Serialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
    pub total_lines: usize,
    pub returned_lines: usize,
    pub truncated: bool,
    pub from_cache: bool,
}

/// Result document for `chunked_read_file`.
#[derive(Debug, Clone, Serialize)]
pub struct FileChunk {
    pub path: String,
    pub content: String,
    pub offset: u64,
    pub bytes_returned: usize,
    pub eof: bool,
}

/// Result document for `read_file_range`.
#[derive(Debug, Clone, Serialize)]
pub struct LineRange {
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub lines: Vec<String>,
}

/// Result document for `get_file_info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub size_class: SizeClass,
    pub is_file: bool,
    pub is_dir: bool,
    pub readonly: bool,
    pub modified_epoch_secs: Option<i64>,
}

impl Engine {
    /// Reads a file, serving from the content cache when possible.
    pub async fn read_file(
        &self,
        raw_path: &str,
        max_lines: Option<usize>,
        mode: ReadMode,
        cancel: &CancelToken,
    ) -> OpResult<FileContent> {
        cancel.check()?;
        let (path, class) = self.admit_file(raw_path).await?;
        choose_route(OpKind::Read, class)?;

        self.cache.note_access(&path);
        let mtime = tokio::fs::metadata(&path)
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(UNIX_EPOCH);
        let (bytes, from_cache) = match self.cache.files.get(&path, mtime) {
            Some(cached) => (cached, true),
            None => {
                let fresh = Arc::new(strategy::read_for_class(&path, class).await?);
                self.cache.files.set(&path, Arc::clone(&fresh), mtime);
                (fresh, false)
            }
        };
        cancel.check()?;

        let content = String::from_utf8_lossy(&bytes);
        let total_lines = content.lines().count();
        let (selected, truncated) = select_lines(&content, max_lines, mode);
        let returned_lines = selected.lines().count();
        Ok(FileContent {
            path: path.to_string_lossy().into_owned(),
            content: selected,
            total_lines,
            returned_lines,
            truncated,
            from_cache,
        })
    }

    /// Reads a byte range with a bounded buffer.
    pub async fn chunked_read_file(
        &self,
        raw_path: &str,
        offset: u64,
        max_bytes: Option<usize>,
        cancel: &CancelToken,
    ) -> OpResult<FileChunk> {
        cancel.check()?;
        let (path, _) = self.admit_file(raw_path).await?;
        let total = tokio::fs::metadata(&path).await?.len();
        let budget = max_bytes.unwrap_or(self.config.limits.max_response_bytes);
        let bytes = chunked::read_range_bytes(&path, offset, budget).await?;
        let eof = offset + bytes.len() as u64 >= total;
        Ok(FileChunk {
            path: path.to_string_lossy().into_owned(),
            content: String::from_utf8_lossy(&bytes).into_owned(),
            offset,
            bytes_returned: bytes.len(),
            eof,
        })
    }

    /// Returns lines `start_line..=end_line` through a buffered line reader.
    pub async fn read_file_range(
        &self,
        raw_path: &str,
        start_line: usize,
        end_line: usize,
        cancel: &CancelToken,
    ) -> OpResult<LineRange> {
        if start_line == 0 {
            return Err(OpError::validation("start_line is 1-based and must be positive"));
        }
        if end_line < start_line {
            return Err(OpError::validation("end_line must not be less than start_line"));
        }
        cancel.check()?;
        let (path, _) = self.admit_file(raw_path).await?;
        let lines = chunked::read_line_range(&path, start_line, end_line).await?;
        Ok(LineRange {
            path: path.to_string_lossy().into_owned(),
            start_line,
            end_line,
            lines,
        })
    }

    /// Stat-level information, served from the metadata cache when warm.
    pub async fn get_file_info(&self, raw_path: &str) -> OpResult<FileInfo> {
        let path = self.gate.admit(raw_path).await?;
        let key = format!("info:{}", path.display());
        if let Some(cached) = self.cache.meta.get(&key) {
            if let Ok(info) = serde_json::from_str::<FileInfo>(&cached) {
                return Ok(info);
            }
        }

        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("path not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;
        let info = FileInfo {
            path: path.to_string_lossy().into_owned(),
            size: meta.len(),
            size_class: SizeClass::classify(meta.len(), &self.config.sizing),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            readonly: meta.permissions().readonly(),
            modified_epoch_secs: meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
        };
        if let Ok(doc) = serde_json::to_string(&info) {
            self.cache.meta.set(&key, Arc::new(doc));
        }
        Ok(info)
    }

    /// Writes full content through the size-routed strategy.
    pub async fn write_file(
        &self,
        raw_path: &str,
        content: &str,
        cancel: &CancelToken,
    ) -> OpResult<WriteResult> {
        self.pipeline.write_file(raw_path, content.as_bytes(), false, cancel).await
    }

    /// Writes full content through the streaming strategy unconditionally.
    pub async fn streaming_write_file(
        &self,
        raw_path: &str,
        content: &str,
        cancel: &CancelToken,
    ) -> OpResult<WriteResult> {
        self.pipeline.write_file(raw_path, content.as_bytes(), true, cancel).await
    }

    /// Replaces every occurrence of `old_text` with `new_text`.
    pub async fn edit_file(
        &self,
        raw_path: &str,
        old_text: &str,
        new_text: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        self.pipeline.edit_file(raw_path, old_text, new_text, force, cancel).await
    }

    /// Applies a list of replacements as one mutation.
    pub async fn multi_edit(
        &self,
        raw_path: &str,
        edits: &[Replacement],
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        self.pipeline.multi_edit(raw_path, edits, force, cancel).await
    }

    /// Large-file edit entry point. The pipeline routes large and very-large
    /// files through chunked reads and streaming writes on its own; this
    /// alias keeps the operation surface explicit.
    pub async fn smart_edit_file(
        &self,
        raw_path: &str,
        old_text: &str,
        new_text: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        self.pipeline.edit_file(raw_path, old_text, new_text, force, cancel).await
    }

    /// Replaces the selected occurrence of a literal pattern.
    #[allow(clippy::too_many_arguments)]
    pub async fn replace_nth_occurrence(
        &self,
        raw_path: &str,
        pattern: &str,
        replacement: &str,
        occurrence: i64,
        whole_word: bool,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        let occurrence = Occurrence::from_wire(occurrence)?;
        self.pipeline
            .replace_nth_occurrence(
                raw_path,
                pattern,
                replacement,
                occurrence,
                whole_word,
                force,
                cancel,
            )
            .await
    }

    /// Admits a path and requires it to be a regular file; returns the size
    /// class alongside.
    pub(crate) async fn admit_file(&self, raw_path: &str) -> OpResult<(PathBuf, SizeClass)> {
        let path = self.gate.admit(raw_path).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("file not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;
        if !meta.is_file() {
            return Err(OpError::validation(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        Ok((path, SizeClass::classify(meta.len(), &self.config.sizing)))
    }
}

/// Applies the head/tail/all selection to decoded content.
fn select_lines(content: &str, max_lines: Option<usize>, mode: ReadMode) -> (String, bool) {
    let Some(limit) = max_lines else {
        return (content.to_owned(), false);
    };
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() <= limit {
        return (content.to_owned(), false);
    }
    let selected: Vec<&str> = match mode {
        ReadMode::All | ReadMode::Head => lines[..limit].to_vec(),
        ReadMode::Tail => lines[lines.len() - limit..].to_vec(),
    };
    (selected.join("\n"), true)
}
