//! The mutation pipeline.
//!
//! Every content mutation runs the same sequence: admit the path, classify
//! the file, read current content (cache first), validate the edit against
//! it, analyze impact, gate on risk, snapshot to the backup store, write
//! atomically, then invalidate caches and record telemetry. A backup
//! failure stops the mutation before any byte changes; a write failure
//! rolls the file back from the snapshot just taken.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::impact;
use super::telemetry::Telemetry;
use super::validate::{self, CheckOutcome, LineEndingKind, MatchConfidence};
use crate::backup::{BackupRecord, BackupStore};
use crate::cache::CacheTier;
use crate::cancel::CancelToken;
use crate::config::{RiskThresholds, SizingConfig};
use crate::error::{OpError, OpResult};
use crate::gate::PathGate;
use crate::sizing::{choose_route, OpKind, SizeClass};
use crate::strategy;

/// One old-text/new-text replacement request.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Replacement {
    pub old_text: String,
    pub new_text: String,
}

/// Result document for a successful edit.
#[derive(Debug, Clone, Serialize)]
pub struct EditResult {
    pub success: bool,
    pub replacement_count: usize,
    pub lines_affected: usize,
    pub match_confidence: MatchConfidence,
    pub backup_id: Option<String>,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

/// Result document for a successful write.
#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub path: String,
    pub bytes_written: u64,
    /// Present when the write replaced an existing file.
    pub backup_id: Option<String>,
    pub created: bool,
}

/// Position of the occurrence to replace in
/// [`EditPipeline::replace_nth_occurrence`].
#[derive(Debug, Copy, Clone)]
pub enum Occurrence {
    Nth(usize),
    Last,
}

impl Occurrence {
    /// Interprets the wire encoding: `-1` is the last match, positive `n`
    /// the nth (1-based). Zero and other negatives are invalid.
    pub fn from_wire(raw: i64) -> OpResult<Self> {
        match raw {
            -1 => Ok(Self::Last),
            n if n >= 1 => Ok(Self::Nth(n as usize)),
            other => Err(OpError::validation(format!("invalid occurrence selector: {other}"))),
        }
    }
}

/// The orchestrator for every content mutation.
#[derive(Debug)]
pub struct EditPipeline {
    gate: Arc<PathGate>,
    cache: Arc<CacheTier>,
    backups: Arc<BackupStore>,
    sizing: SizingConfig,
    risk: RiskThresholds,
    telemetry: Arc<Telemetry>,
}

/// A fully validated edit, ready to write.
struct PlannedEdit {
    new_content: String,
    replacement_count: usize,
    lines_affected: usize,
    confidence: MatchConfidence,
    /// Total replacement-text bytes, for the telemetry classifier.
    new_text_bytes: usize,
}

impl EditPipeline {
    pub fn new(
        gate: Arc<PathGate>,
        cache: Arc<CacheTier>,
        backups: Arc<BackupStore>,
        sizing: SizingConfig,
        risk: RiskThresholds,
        telemetry: Arc<Telemetry>,
    ) -> Self {
        Self { gate, cache, backups, sizing, risk, telemetry }
    }

    /// Replaces every disjoint occurrence of `old_text` with `new_text`.
    pub async fn edit_file(
        &self,
        raw_path: &str,
        old_text: &str,
        new_text: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        let replacements =
            [Replacement { old_text: old_text.to_owned(), new_text: new_text.to_owned() }];
        self.run_edit(raw_path, &replacements, force, cancel, true).await
    }

    /// Applies a sequence of replacements as one mutation with one backup.
    pub async fn multi_edit(
        &self,
        raw_path: &str,
        replacements: &[Replacement],
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        if replacements.is_empty() {
            return Err(OpError::validation("multi_edit requires at least one replacement"));
        }
        self.run_edit(raw_path, replacements, force, cancel, true).await
    }

    /// Edit variant for batch sub-operations: the batch layer owns the group
    /// backup and the rollback, so no per-edit record is taken here.
    pub(crate) async fn edit_unbacked(
        &self,
        raw_path: &str,
        replacements: &[Replacement],
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        self.run_edit(raw_path, replacements, force, cancel, false).await
    }

    /// Replaces one selected occurrence of `pattern`.
    pub async fn replace_nth_occurrence(
        &self,
        raw_path: &str,
        pattern: &str,
        replacement: &str,
        occurrence: Occurrence,
        whole_word: bool,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        if pattern.is_empty() {
            return Err(OpError::validation("pattern must not be empty"));
        }
        let (path, class, mut content, from_cache) = self.admit_and_read(raw_path, cancel).await?;

        let mut positions = match_positions(&content, pattern, whole_word);
        let mut target = select_position(&positions, occurrence);
        if target.is_none() && from_cache {
            // Same staleness guarantee as run_edit: a cached copy that
            // fails to match gets one retry against the disk state.
            debug!(path = %path.display(), "no match in cached content, bypassing cache");
            self.cache.files.invalidate(&path);
            let bytes = strategy::read_for_class(&path, class).await?;
            content = decode_utf8(bytes, &path)?;
            positions = match_positions(&content, pattern, whole_word);
            target = select_position(&positions, occurrence);
        }
        let bytes_before = content.len() as u64;

        let Some(start) = target else {
            return Err(OpError::edit_with_suggestion(
                format!(
                    "pattern matched {} occurrence(s); the requested one does not exist",
                    positions.len()
                ),
                "re-read the file to confirm the pattern and occurrence index",
            ));
        };

        // A single splice: the gate judges just this replacement.
        let report = impact::grade(content.len(), 1, replacement.len(), &self.risk);
        if report.is_risky && !force {
            return Err(OpError::risky(
                "replacement refused by the risk gate; pass force to proceed",
                report,
            ));
        }

        let mut new_content = String::with_capacity(content.len() + replacement.len());
        new_content.push_str(&content[..start]);
        new_content.push_str(replacement);
        new_content.push_str(&content[start + pattern.len()..]);

        let planned = PlannedEdit {
            lines_affected: count_affected_lines(&content, &new_content),
            new_content,
            replacement_count: 1,
            confidence: MatchConfidence::High,
            new_text_bytes: replacement.len(),
        };
        self.commit_edit(&path, class, planned, bytes_before, cancel).await
    }

    /// The shared edit path: read, validate (with one cache-bypass retry),
    /// gate, snapshot, write, invalidate.
    async fn run_edit(
        &self,
        raw_path: &str,
        replacements: &[Replacement],
        force: bool,
        cancel: &CancelToken,
        take_backup: bool,
    ) -> OpResult<EditResult> {
        let (path, class, content, from_cache) = self.admit_and_read(raw_path, cancel).await?;
        let bytes_before = content.len() as u64;

        let planned = match self.plan_edits(&content, replacements, force) {
            Ok(planned) => planned,
            Err(OpError::Edit { .. }) if from_cache => {
                // The cached copy may be stale; retry exactly once against
                // the disk state before reporting the failure.
                debug!(path = %path.display(), "validator rejected cached content, bypassing cache");
                self.cache.files.invalidate(&path);
                let bytes = strategy::read_for_class(&path, class).await?;
                let fresh = decode_utf8(bytes, &path)?;
                self.plan_edits(&fresh, replacements, force)?
            }
            Err(err) => return Err(err),
        };

        self.commit_edit_with(&path, class, planned, bytes_before, cancel, take_backup).await
    }

    /// Admits the path, classifies the file for editing, and reads content.
    async fn admit_and_read(
        &self,
        raw_path: &str,
        cancel: &CancelToken,
    ) -> OpResult<(PathBuf, SizeClass, String, bool)> {
        cancel.check()?;
        let path = self.gate.admit(raw_path).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("file not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;
        if !meta.is_file() {
            return Err(OpError::validation(format!("not a regular file: {}", path.display())));
        }
        let class = SizeClass::classify(meta.len(), &self.sizing);
        // Over-limit files refuse edits up front.
        choose_route(OpKind::Edit, class)?;

        self.cache.note_access(&path);
        let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        if let Some(bytes) = self.cache.files.get(&path, mtime) {
            let content = decode_utf8(bytes.as_ref().clone(), &path)?;
            return Ok((path, class, content, true));
        }
        let bytes = strategy::read_for_class(&path, class).await?;
        let content = decode_utf8(bytes, &path)?;
        Ok((path, class, content, false))
    }

    /// Validates and applies every replacement in memory, gating on risk.
    fn plan_edits(
        &self,
        content: &str,
        replacements: &[Replacement],
        force: bool,
    ) -> OpResult<PlannedEdit> {
        let original_endings = validate::detect_line_endings(content);
        let mut working = content.to_owned();
        let mut normalized_any = false;
        let mut total_replacements = 0usize;
        let mut confidence = MatchConfidence::High;

        for replacement in replacements {
            let check = validate::check(&working, &replacement.old_text, &replacement.new_text);
            let (occurrences, step_confidence, normalized) = match check.outcome {
                CheckOutcome::Ok { occurrences, confidence, normalized } => {
                    (occurrences, confidence, normalized)
                }
                CheckOutcome::Drift => {
                    return Err(OpError::edit_with_suggestion(
                        "the surrounding context exists but the exact text has drifted",
                        "re-read the file; it appears to have changed since it was last read",
                    ));
                }
                CheckOutcome::NotFound => {
                    return Err(OpError::edit_with_suggestion(
                        format!(
                            "old_text not found (file {} bytes, digest {})",
                            check.diagnostics.file_size, check.diagnostics.content_digest
                        ),
                        "re-read the file and copy the target text exactly",
                    ));
                }
            };

            let (effective_content, effective_old) = if normalized {
                normalized_any = true;
                (working.replace("\r\n", "\n"), replacement.old_text.replace("\r\n", "\n"))
            } else {
                (working.clone(), replacement.old_text.clone())
            };

            let report = impact::analyze(
                &effective_content,
                &effective_old,
                &replacement.new_text,
                &self.risk,
            );
            if report.is_risky && !force {
                return Err(OpError::risky(
                    "edit refused by the risk gate; pass force to proceed",
                    report,
                ));
            }

            working = effective_content.replace(&effective_old, &replacement.new_text);
            total_replacements += occurrences;
            if step_confidence == MatchConfidence::Medium {
                confidence = MatchConfidence::Medium;
            }
        }

        // A normalized match ran on LF content; write the file back in its
        // original convention so an edit never converts line endings.
        if normalized_any && original_endings == LineEndingKind::CrLf {
            working = working.replace('\n', "\r\n");
        }

        Ok(PlannedEdit {
            lines_affected: count_affected_lines(content, &working),
            new_content: working,
            replacement_count: total_replacements,
            confidence,
            new_text_bytes: replacements.iter().map(|r| r.new_text.len()).sum(),
        })
    }

    async fn commit_edit(
        &self,
        path: &Path,
        class: SizeClass,
        planned: PlannedEdit,
        bytes_before: u64,
        cancel: &CancelToken,
    ) -> OpResult<EditResult> {
        self.commit_edit_with(path, class, planned, bytes_before, cancel, true).await
    }

    /// Backup, write, verify, invalidate, count. The cancellation token is
    /// honored up to the write step and not after.
    async fn commit_edit_with(
        &self,
        path: &Path,
        class: SizeClass,
        planned: PlannedEdit,
        bytes_before: u64,
        cancel: &CancelToken,
        take_backup: bool,
    ) -> OpResult<EditResult> {
        cancel.check()?;
        let record = if take_backup {
            Some(self.backups.create(&[path.to_path_buf()], "edit", None).await?)
        } else {
            None
        };

        cancel.check()?;
        let new_bytes = planned.new_content.as_bytes();
        let write_class = SizeClass::classify(new_bytes.len() as u64, &self.sizing);
        if let Err(err) = strategy::write_for_class(path, new_bytes, write_class).await {
            if let Some(record) = &record {
                self.rollback(record, path).await;
            }
            return Err(err.into());
        }
        self.verify_written(path, new_bytes.len() as u64, record.as_ref()).await?;

        // Past the write there is no cancellation: cache consistency is not
        // optional.
        self.cache.invalidate_path(path);
        if let Ok(meta) = tokio::fs::metadata(path).await {
            let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
            self.cache.files.set(path, Arc::new(new_bytes.to_vec()), mtime);
        }
        self.telemetry.record_edit(planned.new_text_bytes);

        info!(
            path = %path.display(),
            replacements = planned.replacement_count,
            class = ?class,
            "edit applied"
        );
        Ok(EditResult {
            success: true,
            replacement_count: planned.replacement_count,
            lines_affected: planned.lines_affected,
            match_confidence: planned.confidence,
            backup_id: record.map(|r| r.backup_id),
            bytes_before,
            bytes_after: new_bytes.len() as u64,
        })
    }

    /// Writes full content to a path, backing up an existing target first.
    /// `streaming` forces the chunked write route regardless of size class.
    pub async fn write_file(
        &self,
        raw_path: &str,
        content: &[u8],
        streaming: bool,
        cancel: &CancelToken,
    ) -> OpResult<WriteResult> {
        self.write_file_with(raw_path, content, streaming, cancel, true).await
    }

    /// Write variant for batch sub-operations: no per-write backup.
    pub(crate) async fn write_unbacked(
        &self,
        raw_path: &str,
        content: &[u8],
        cancel: &CancelToken,
    ) -> OpResult<WriteResult> {
        self.write_file_with(raw_path, content, false, cancel, false).await
    }

    async fn write_file_with(
        &self,
        raw_path: &str,
        content: &[u8],
        streaming: bool,
        cancel: &CancelToken,
        take_backup: bool,
    ) -> OpResult<WriteResult> {
        cancel.check()?;
        let path = self.gate.admit(raw_path).await?;
        let exists = tokio::fs::metadata(&path).await.is_ok();

        let record = if exists && take_backup {
            Some(self.backups.create(&[path.clone()], "write", None).await?)
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            None
        };

        cancel.check()?;
        let class = SizeClass::classify(content.len() as u64, &self.sizing);
        let write_result = if streaming {
            strategy::streaming::write(&path, content).await
        } else {
            choose_route(OpKind::Write, class)?;
            strategy::write_for_class(&path, content, class).await
        };
        if let Err(err) = write_result {
            if let Some(record) = &record {
                self.rollback(record, &path).await;
            }
            return Err(err.into());
        }
        self.verify_written(&path, content.len() as u64, record.as_ref()).await?;

        self.cache.invalidate_path(&path);
        info!(path = %path.display(), bytes = content.len(), created = !exists, "file written");
        Ok(WriteResult {
            path: path.to_string_lossy().into_owned(),
            bytes_written: content.len() as u64,
            backup_id: record.map(|r| r.backup_id),
            created: !exists,
        })
    }

    /// Post-condition: the file now holds exactly the requested bytes.
    async fn verify_written(
        &self,
        path: &Path,
        expected_len: u64,
        record: Option<&BackupRecord>,
    ) -> OpResult<()> {
        let written = tokio::fs::metadata(path).await?.len();
        if written != expected_len {
            warn!(
                path = %path.display(),
                expected = expected_len,
                written,
                "post-condition failed, rolling back"
            );
            if let Some(record) = record {
                self.rollback(record, path).await;
            }
            return Err(OpError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("wrote {written} bytes, expected {expected_len}"),
            )));
        }
        Ok(())
    }

    /// Best-effort rollback from the snapshot taken by this operation. The
    /// backup record is retained either way for recovery.
    async fn rollback(&self, record: &BackupRecord, path: &Path) {
        if record.entry_for(&path.to_string_lossy()).is_none() {
            return;
        }
        if let Err(err) = self.backups.restore_file(record, path).await {
            warn!(
                path = %path.display(),
                backup_id = %record.backup_id,
                %err,
                "rollback failed; backup retained"
            );
        }
        self.cache.invalidate_path(path);
    }
}

/// Decodes file bytes as UTF-8 or refuses the edit.
fn decode_utf8(bytes: Vec<u8>, path: &Path) -> OpResult<String> {
    String::from_utf8(bytes).map_err(|_| {
        OpError::validation(format!("{} is not valid UTF-8 text", path.display()))
    })
}

/// Picks the requested occurrence from the ordered match positions.
fn select_position(positions: &[usize], occurrence: Occurrence) -> Option<usize> {
    match occurrence {
        Occurrence::Last => positions.last().copied(),
        Occurrence::Nth(n) => positions.get(n - 1).copied(),
    }
}

/// Byte offsets of disjoint matches, optionally restricted to whole words.
fn match_positions(content: &str, pattern: &str, whole_word: bool) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut index = 0;
    while let Some(found) = content[index..].find(pattern) {
        let start = index + found;
        let end = start + pattern.len();
        if !whole_word || is_word_boundary(content, start, end) {
            positions.push(start);
        }
        index = end;
    }
    positions
}

fn is_word_boundary(content: &str, start: usize, end: usize) -> bool {
    let before = content[..start].chars().next_back();
    let after = content[end..].chars().next();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    !before.map_or(false, is_word) && !after.map_or(false, is_word)
}

/// Number of line positions that differ between two versions of a file.
fn count_affected_lines(before: &str, after: &str) -> usize {
    let old_lines: Vec<&str> = before.lines().collect();
    let new_lines: Vec<&str> = after.lines().collect();
    let rows = old_lines.len().max(new_lines.len());
    (0..rows).filter(|&i| old_lines.get(i) != new_lines.get(i)).count()
}
