//! Backup-facing operations: list, inspect, restore, compare, cleanup.
//!
//! Backup creation itself is internal; it happens inside the mutating
//! operations and the restore safety net.

use std::path::Path;

use super::Engine;
use crate::backup::{BackupFilter, BackupId, BackupRecord, CleanupReport, FileDiff, RestoreResult};
use crate::error::OpResult;

impl Engine {
    /// Lists backup records, newest first.
    pub async fn list_backups(
        &self,
        operation_kind: Option<String>,
        path_contains: Option<String>,
        max_age_days: Option<u64>,
        limit: Option<usize>,
    ) -> OpResult<Vec<BackupRecord>> {
        let filter = BackupFilter {
            operation_kind,
            path_contains,
            max_age_days,
            limit: Some(limit.unwrap_or(self.config.limits.max_list_items)),
        };
        self.backups.list(&filter).await
    }

    /// Fetches one record by identifier.
    pub async fn get_backup_info(&self, raw_id: &str) -> OpResult<BackupRecord> {
        let id = BackupId::parse(raw_id)?;
        self.backups.get(&id).await
    }

    /// Restores a backup, optionally a single file, optionally preview-only.
    ///
    /// Every restore target is re-checked against the access policy before
    /// any write: a record from a previous, broader policy cannot be used to
    /// write outside the current roots.
    pub async fn restore_backup(
        &self,
        raw_id: &str,
        file_path: Option<&str>,
        preview: bool,
    ) -> OpResult<RestoreResult> {
        let id = BackupId::parse(raw_id)?;
        let specific = match file_path {
            Some(raw) => Some(self.gate.admit(raw).await?.to_string_lossy().into_owned()),
            None => None,
        };

        let record = self.backups.get(&id).await?;
        for entry in &record.files {
            self.gate.check_allowed(Path::new(&entry.original_path)).await?;
        }

        let result = self.backups.restore(&id, specific.as_deref(), preview).await?;
        if !preview {
            for restored in &result.restored {
                self.cache.invalidate_path(Path::new(restored));
            }
        }
        Ok(result)
    }

    /// Diffs one backed-up file against its current state.
    pub async fn compare_with_backup(
        &self,
        raw_id: &str,
        raw_file_path: &str,
    ) -> OpResult<FileDiff> {
        let id = BackupId::parse(raw_id)?;
        let canonical = self.gate.admit(raw_file_path).await?;
        self.backups.compare(&id, &canonical.to_string_lossy()).await
    }

    /// Applies the eviction policies; `dry_run` only reports.
    pub async fn cleanup_backups(
        &self,
        older_than_days: Option<u64>,
        dry_run: bool,
    ) -> OpResult<CleanupReport> {
        self.backups.cleanup(older_than_days, dry_run).await
    }
}
