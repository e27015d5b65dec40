//! Search operations over the line-scanning substrate.

use std::path::Path;

use serde::Serialize;

use super::Engine;
use crate::cancel::CancelToken;
use crate::edit::impact::count_occurrences;
use crate::edit::EditResult;
use crate::error::{OpError, OpResult};
use crate::search::scanner::{compiled, scan_lines, ScanOptions, SearchMatch};
use crate::search::collect_files;

/// Upper bound on files visited by a directory-wide search.
const WALK_LIMIT: usize = 10_000;
/// Files above this size are skipped by content search.
const CONTENT_SEARCH_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Result document for `smart_search`.
#[derive(Debug, Clone, Serialize)]
pub struct SmartSearchResult {
    pub pattern: String,
    /// Files whose name contains the pattern.
    pub name_matches: Vec<String>,
    /// Content hits, present when content search was requested.
    pub content_matches: Vec<SearchMatch>,
    pub files_scanned: usize,
    pub truncated: bool,
}

/// Result document for `advanced_text_search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub pattern: String,
    pub matches: Vec<SearchMatch>,
    pub files_scanned: usize,
    pub truncated: bool,
}

/// Result document for `count_occurrences`.
#[derive(Debug, Clone, Serialize)]
pub struct CountResult {
    pub path: String,
    pub pattern: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<SearchMatch>>,
}

impl Engine {
    /// Finds files by name substring, optionally also scanning content.
    pub async fn smart_search(
        &self,
        raw_path: &str,
        pattern: &str,
        include_content: bool,
        file_types: Option<Vec<String>>,
        cancel: &CancelToken,
    ) -> OpResult<SmartSearchResult> {
        if pattern.is_empty() {
            return Err(OpError::validation("search pattern must not be empty"));
        }
        let root = self.gate.admit(raw_path).await?;
        let files = self.files_under(&root, file_types.as_deref(), cancel).await?;

        let needle = pattern.to_ascii_lowercase();
        let name_matches: Vec<String> = files
            .iter()
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().to_ascii_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
            .map(|path| path.to_string_lossy().into_owned())
            .collect();

        let mut content_matches = Vec::new();
        let mut truncated = false;
        if include_content {
            let regex = compiled(&regex::escape(pattern), false, false)?;
            let options = ScanOptions {
                max_matches: self.config.limits.max_search_results,
                ..ScanOptions::default()
            };
            for file in &files {
                cancel.check()?;
                let Some(content) = read_searchable(file).await else { continue };
                let label = file.to_string_lossy();
                let remaining =
                    self.config.limits.max_search_results.saturating_sub(content_matches.len());
                if remaining == 0 {
                    truncated = true;
                    break;
                }
                let per_file = ScanOptions { max_matches: remaining, ..options.clone() };
                content_matches.extend(scan_lines(&label, &content, &regex, &per_file, cancel)?);
            }
        }

        Ok(SmartSearchResult {
            pattern: pattern.to_owned(),
            name_matches,
            content_matches,
            files_scanned: files.len(),
            truncated,
        })
    }

    /// Regex search with case, whole-word, and context options.
    #[allow(clippy::too_many_arguments)]
    pub async fn advanced_text_search(
        &self,
        raw_path: &str,
        pattern: &str,
        case_sensitive: bool,
        whole_word: bool,
        include_context: bool,
        context_lines: usize,
        cancel: &CancelToken,
    ) -> OpResult<SearchOutcome> {
        if pattern.is_empty() {
            return Err(OpError::validation("search pattern must not be empty"));
        }
        let root = self.gate.admit(raw_path).await?;
        let regex = compiled(pattern, case_sensitive, whole_word)?;
        let options = ScanOptions {
            case_sensitive,
            whole_word,
            context_lines: if include_context { context_lines.max(1) } else { 0 },
            max_matches: self.config.limits.max_search_results,
        };

        let files = self.files_under(&root, None, cancel).await?;
        let mut matches = Vec::new();
        let mut truncated = false;
        for file in &files {
            cancel.check()?;
            let Some(content) = read_searchable(file).await else { continue };
            let remaining =
                self.config.limits.max_search_results.saturating_sub(matches.len());
            if remaining == 0 {
                truncated = true;
                break;
            }
            let per_file = ScanOptions { max_matches: remaining, ..options.clone() };
            let label = file.to_string_lossy();
            matches.extend(scan_lines(&label, &content, &regex, &per_file, cancel)?);
        }

        Ok(SearchOutcome {
            pattern: pattern.to_owned(),
            matches,
            files_scanned: files.len(),
            truncated,
        })
    }

    /// Literal search-and-replace across one file, through the edit pipeline
    /// (validation, risk gate, backup, atomic write).
    pub async fn search_and_replace(
        &self,
        raw_path: &str,
        pattern: &str,
        replacement: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        if pattern.is_empty() {
            return Err(OpError::validation("search pattern must not be empty"));
        }
        self.pipeline.edit_file(raw_path, pattern, replacement, force, cancel).await
    }

    /// Counts literal occurrences in one file.
    pub async fn count_occurrences(
        &self,
        raw_path: &str,
        pattern: &str,
        return_lines: bool,
        cancel: &CancelToken,
    ) -> OpResult<CountResult> {
        if pattern.is_empty() {
            return Err(OpError::validation("pattern must not be empty"));
        }
        let (path, class) = self.admit_file(raw_path).await?;
        let bytes = crate::strategy::read_for_class(&path, class).await?;
        let content = String::from_utf8_lossy(&bytes);
        let count = count_occurrences(&content, pattern);

        let lines = if return_lines && count > 0 {
            let regex = compiled(&regex::escape(pattern), true, false)?;
            let options = ScanOptions {
                max_matches: self.config.limits.max_search_results,
                ..ScanOptions::default()
            };
            let label = path.to_string_lossy();
            Some(scan_lines(&label, &content, &regex, &options, cancel)?)
        } else {
            None
        };

        Ok(CountResult {
            path: path.to_string_lossy().into_owned(),
            pattern: pattern.to_owned(),
            count,
            lines,
        })
    }

    /// Either the single admitted file, or every searchable file below the
    /// admitted directory.
    async fn files_under(
        &self,
        root: &Path,
        file_types: Option<&[String]>,
        cancel: &CancelToken,
    ) -> OpResult<Vec<std::path::PathBuf>> {
        let meta = tokio::fs::metadata(root).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("path not found: {}", root.display()))
            } else {
                OpError::Io(err)
            }
        })?;
        if meta.is_file() {
            return Ok(vec![root.to_path_buf()]);
        }
        collect_files(root, file_types, WALK_LIMIT, cancel).await
    }
}

/// Reads a file for content search, skipping oversized and non-text files.
async fn read_searchable(path: &Path) -> Option<String> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if meta.len() > CONTENT_SEARCH_MAX_BYTES {
        return None;
    }
    let bytes = tokio::fs::read(path).await.ok()?;
    String::from_utf8(bytes).ok()
}
