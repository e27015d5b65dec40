//! Dry-run analysis operations.
//!
//! These call the same analysis subroutines as the mutating operations and
//! return the risk report without touching the filesystem.

use serde::Serialize;

use super::Engine;
use crate::edit::impact::{self, ImpactReport, RiskLevel};
use crate::edit::validate::{self, CheckOutcome};
use crate::error::{OpError, OpResult};
use crate::strategy;

/// Result document for the analyze family.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub operation: String,
    pub path: String,
    pub impact: ImpactReport,
    /// Whether the corresponding mutation would pass validation and the
    /// risk gate without `force`.
    pub can_proceed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub would_create: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_affected: Option<usize>,
}

impl Engine {
    /// Analyzes an edit without applying it. The reported occurrence count
    /// equals the `replacement_count` the real edit would return.
    pub async fn analyze_edit(
        &self,
        raw_path: &str,
        old_text: &str,
        new_text: &str,
    ) -> OpResult<AnalysisReport> {
        let (path, class) = self.admit_file(raw_path).await?;
        let bytes = strategy::read_for_class(&path, class).await?;
        let content = String::from_utf8(bytes).map_err(|_| {
            OpError::validation(format!("{} is not valid UTF-8 text", path.display()))
        })?;

        let check = validate::check(&content, old_text, new_text);
        let (impact, can_proceed, note) = match check.outcome {
            CheckOutcome::Ok { normalized, .. } => {
                let effective = if normalized { content.replace("\r\n", "\n") } else { content };
                let effective_old =
                    if normalized { old_text.replace("\r\n", "\n") } else { old_text.to_owned() };
                let report = impact::analyze(&effective, &effective_old, new_text, &self.config.risk);
                let gated = report.is_risky;
                (report, !gated, check.diagnostics.note)
            }
            CheckOutcome::Drift => (
                impact::grade(check.diagnostics.file_size, 0, new_text.len(), &self.config.risk),
                false,
                Some("context found but exact text has drifted".to_owned()),
            ),
            CheckOutcome::NotFound => (
                impact::grade(check.diagnostics.file_size, 0, new_text.len(), &self.config.risk),
                false,
                Some("old_text not found".to_owned()),
            ),
        };

        Ok(AnalysisReport {
            operation: "edit".to_owned(),
            path: path.to_string_lossy().into_owned(),
            impact,
            can_proceed,
            note,
            would_create: None,
            files_affected: None,
        })
    }

    /// Analyzes a full-content write without applying it.
    pub async fn analyze_write(&self, raw_path: &str, content: &str) -> OpResult<AnalysisReport> {
        let path = self.gate.admit(raw_path).await?;
        let existing_len = match tokio::fs::metadata(&path).await {
            Ok(meta) => Some(meta.len() as usize),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };

        let impact = impact::grade(existing_len.unwrap_or(0), 1, content.len(), &self.config.risk);
        Ok(AnalysisReport {
            operation: "write".to_owned(),
            path: path.to_string_lossy().into_owned(),
            impact,
            // Writes are not ratio-gated; the report is advisory.
            can_proceed: true,
            note: None,
            would_create: Some(existing_len.is_none()),
            files_affected: None,
        })
    }

    /// Analyzes a delete without applying it.
    pub async fn analyze_delete(&self, raw_path: &str) -> OpResult<AnalysisReport> {
        let path = self.gate.admit(raw_path).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("path not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;

        let (files_affected, risk_level, factors) = if meta.is_dir() {
            let count = count_files(&path).await?;
            (
                count,
                RiskLevel::Critical,
                vec![format!("recursive delete of a directory with {count} files")],
            )
        } else {
            (1, RiskLevel::High, vec!["whole-file delete".to_owned()])
        };

        let impact = ImpactReport {
            occurrences: files_affected,
            change_ratio_percent: 100.0,
            risk_level,
            is_risky: true,
            factors,
        };
        Ok(AnalysisReport {
            operation: "delete".to_owned(),
            path: path.to_string_lossy().into_owned(),
            impact,
            can_proceed: meta.is_file(),
            note: meta.is_dir().then(|| "directory deletion requires force".to_owned()),
            would_create: None,
            files_affected: Some(files_affected),
        })
    }
}

async fn count_files(root: &std::path::Path) -> OpResult<usize> {
    let mut count = 0usize;
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                count += 1;
            }
        }
    }
    Ok(count)
}
