//! Batch execution: grouped sub-operations with optional atomicity.
//!
//! An atomic batch takes one backup record covering the pre-state of every
//! affected path, applies sub-operations in submission order, and on the
//! first failure rolls prior successes back in reverse order — restoring
//! files that existed from the group record and removing files the batch
//! created. Rollback failures are reported alongside the original error,
//! never instead of it.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::Engine;
use crate::backup::BackupRecord;
use crate::cancel::CancelToken;
use crate::edit::impact::{self, RiskLevel};
use crate::edit::pipeline::Replacement;
use crate::edit::validate::{self, CheckOutcome};
use crate::error::{OpError, OpResult};

/// One sub-operation of a batch request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOperation {
    WriteFile { path: String, content: String },
    EditFile { path: String, old_text: String, new_text: String },
    DeleteFile { path: String },
}

impl BatchOperation {
    fn kind(&self) -> &'static str {
        match self {
            Self::WriteFile { .. } => "write_file",
            Self::EditFile { .. } => "edit_file",
            Self::DeleteFile { .. } => "delete_file",
        }
    }

    fn raw_path(&self) -> &str {
        match self {
            Self::WriteFile { path, .. }
            | Self::EditFile { path, .. }
            | Self::DeleteFile { path } => path,
        }
    }
}

/// Outcome of one sub-operation.
#[derive(Debug, Clone, Serialize)]
pub struct SubOpOutcome {
    pub op: String,
    pub path: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_count: Option<usize>,
}

/// Result document for `batch_operations`.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub atomic: bool,
    pub validate_only: bool,
    /// Sub-operations that had completed when the batch ended.
    pub completed: usize,
    pub outcomes: Vec<SubOpOutcome>,
    pub backup_id: Option<String>,
    /// The first failure, when the batch did not succeed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// Rollback problems, reported in addition to the original error.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rollback_errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_risk: Option<RiskLevel>,
}

impl Engine {
    /// Runs a batch of sub-operations.
    ///
    /// `atomic` makes the group all-or-nothing. `create_backup` controls the
    /// group snapshot for non-atomic batches (atomic batches always take
    /// one; rollback depends on it). `validate_only` analyzes every
    /// sub-operation and reports aggregate risk without mutating anything.
    pub async fn batch_operations(
        &self,
        operations: &[BatchOperation],
        atomic: bool,
        create_backup: bool,
        validate_only: bool,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<BatchResult> {
        if operations.is_empty() {
            return Err(OpError::validation("batch requires at least one operation"));
        }

        // Admit every path up front; a denied path fails the whole batch
        // before any side effect.
        let mut paths = Vec::with_capacity(operations.len());
        for op in operations {
            paths.push(self.gate.admit(op.raw_path()).await?);
        }

        if validate_only {
            return self.validate_batch(operations, &paths).await;
        }

        let mut pre_existing: HashSet<PathBuf> = HashSet::new();
        for path in &paths {
            if tokio::fs::metadata(path).await.is_ok() {
                pre_existing.insert(path.clone());
            }
        }

        let record = if atomic || create_backup {
            Some(self.backups.create(&paths, "batch", None).await?)
        } else {
            None
        };

        let mut outcomes: Vec<SubOpOutcome> = Vec::with_capacity(operations.len());
        for (index, op) in operations.iter().enumerate() {
            let result = match cancel.check() {
                Ok(()) => self.apply_sub_op(op, force, cancel).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(replacements) => outcomes.push(SubOpOutcome {
                    op: op.kind().to_owned(),
                    path: paths[index].to_string_lossy().into_owned(),
                    ok: true,
                    error: None,
                    replacement_count: replacements,
                }),
                Err(err) => {
                    let error_doc = err.to_document();
                    outcomes.push(SubOpOutcome {
                        op: op.kind().to_owned(),
                        path: paths[index].to_string_lossy().into_owned(),
                        ok: false,
                        error: Some(error_doc.clone()),
                        replacement_count: None,
                    });
                    if atomic {
                        let applied = outcomes.len() - 1;
                        let rollback_errors = self
                            .rollback_batch(
                                &outcomes[..applied],
                                operations,
                                &paths,
                                &pre_existing,
                                record.as_ref(),
                            )
                            .await;
                        return Ok(BatchResult {
                            success: false,
                            atomic,
                            validate_only: false,
                            completed: 0,
                            outcomes,
                            backup_id: record.map(|r| r.backup_id),
                            error: Some(error_doc),
                            rollback_errors,
                            max_risk: None,
                        });
                    }
                }
            }
        }

        let success = outcomes.iter().all(|o| o.ok);
        let completed = outcomes.iter().filter(|o| o.ok).count();
        info!(operations = operations.len(), completed, atomic, "batch finished");
        Ok(BatchResult {
            success,
            atomic,
            validate_only: false,
            completed,
            outcomes,
            backup_id: record.map(|r| r.backup_id),
            error: None,
            rollback_errors: Vec::new(),
            max_risk: None,
        })
    }

    async fn apply_sub_op(
        &self,
        op: &BatchOperation,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<Option<usize>> {
        match op {
            BatchOperation::WriteFile { path, content } => {
                self.pipeline.write_unbacked(path, content.as_bytes(), cancel).await?;
                Ok(None)
            }
            BatchOperation::EditFile { path, old_text, new_text } => {
                let replacements = [Replacement {
                    old_text: old_text.clone(),
                    new_text: new_text.clone(),
                }];
                let result =
                    self.pipeline.edit_unbacked(path, &replacements, force, cancel).await?;
                Ok(Some(result.replacement_count))
            }
            BatchOperation::DeleteFile { path } => {
                let canonical = self.gate.admit(path).await?;
                let meta = tokio::fs::metadata(&canonical).await.map_err(|err| {
                    if err.kind() == std::io::ErrorKind::NotFound {
                        OpError::path(format!("path not found: {}", canonical.display()))
                    } else {
                        OpError::Io(err)
                    }
                })?;
                if !meta.is_file() {
                    return Err(OpError::validation(
                        "batch delete_file only removes regular files",
                    ));
                }
                tokio::fs::remove_file(&canonical).await?;
                self.cache.invalidate_path(&canonical);
                Ok(None)
            }
        }
    }

    /// Reverse-order rollback of completed sub-operations.
    async fn rollback_batch(
        &self,
        completed: &[SubOpOutcome],
        operations: &[BatchOperation],
        paths: &[PathBuf],
        pre_existing: &HashSet<PathBuf>,
        record: Option<&BackupRecord>,
    ) -> Vec<String> {
        let mut errors = Vec::new();
        for index in (0..completed.len()).rev() {
            let path = &paths[index];
            let op = &operations[index];
            let outcome = if pre_existing.contains(path) {
                match record {
                    Some(record) => self.backups.restore_file(record, path).await,
                    None => Err(OpError::validation(format!(
                        "no group backup to restore {}",
                        path.display()
                    ))),
                }
            } else {
                tokio::fs::remove_file(path).await.map_err(OpError::Io)
            };
            if let Err(err) = outcome {
                warn!(path = %path.display(), op = op.kind(), %err, "batch rollback step failed");
                errors.push(format!("{}: {err}", path.display()));
            }
            self.cache.invalidate_path(path);
        }
        errors
    }

    /// Validation-only mode: impact analysis per sub-operation, aggregate
    /// risk, no mutation.
    async fn validate_batch(
        &self,
        operations: &[BatchOperation],
        paths: &[PathBuf],
    ) -> OpResult<BatchResult> {
        let mut outcomes = Vec::with_capacity(operations.len());
        let mut max_risk = RiskLevel::Low;
        let mut all_ok = true;

        for (index, op) in operations.iter().enumerate() {
            let path = &paths[index];
            let (ok, risk, error) = match op {
                BatchOperation::WriteFile { content, .. } => {
                    let existing = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
                    let report = impact::grade(
                        existing as usize,
                        1,
                        content.len(),
                        &self.config.risk,
                    );
                    (true, report.risk_level, None)
                }
                BatchOperation::EditFile { old_text, new_text, .. } => {
                    match tokio::fs::read_to_string(path).await {
                        Ok(content) => {
                            let check = validate::check(&content, old_text, new_text);
                            match check.outcome {
                                CheckOutcome::Ok { .. } => {
                                    let report = impact::analyze(
                                        &content,
                                        old_text,
                                        new_text,
                                        &self.config.risk,
                                    );
                                    (true, report.risk_level, None)
                                }
                                CheckOutcome::Drift | CheckOutcome::NotFound => (
                                    false,
                                    RiskLevel::Low,
                                    Some(
                                        OpError::edit("old_text would not match").to_document(),
                                    ),
                                ),
                            }
                        }
                        Err(err) => {
                            (false, RiskLevel::Low, Some(OpError::Io(err).to_document()))
                        }
                    }
                }
                BatchOperation::DeleteFile { .. } => {
                    let exists = tokio::fs::metadata(path).await.is_ok();
                    if exists {
                        (true, RiskLevel::High, None)
                    } else {
                        (
                            false,
                            RiskLevel::Low,
                            Some(OpError::path("path not found").to_document()),
                        )
                    }
                }
            };
            max_risk = max_risk.max(risk);
            all_ok &= ok;
            outcomes.push(SubOpOutcome {
                op: op.kind().to_owned(),
                path: path.to_string_lossy().into_owned(),
                ok,
                error,
                replacement_count: None,
            });
        }

        Ok(BatchResult {
            success: all_ok,
            atomic: false,
            validate_only: true,
            completed: 0,
            outcomes,
            backup_id: None,
            error: None,
            rollback_errors: Vec::new(),
            max_risk: Some(max_risk),
        })
    }
}
