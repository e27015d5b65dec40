//! Backup record metadata, serialized as `metadata.json` beside the copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One backed-up file within a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFileEntry {
    /// Canonical path the file was copied from.
    pub original_path: String,
    /// Location of the copy, relative to the record directory.
    pub stored_path: String,
    pub size: u64,
    pub sha256: String,
    /// Source mtime in seconds since the epoch.
    pub mtime: i64,
}

/// Metadata document describing one backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub backup_id: String,
    /// RFC 3339 creation time.
    pub timestamp: DateTime<Utc>,
    /// Which mutation created the record (`edit`, `write`, `delete`, ...).
    pub operation_kind: String,
    pub user_context: Option<String>,
    pub files: Vec<BackupFileEntry>,
    pub total_size: u64,
}

impl BackupRecord {
    /// Age of the record in whole days.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.timestamp).num_days()
    }

    /// Looks up the entry for a given original path.
    pub fn entry_for(&self, original_path: &str) -> Option<&BackupFileEntry> {
        self.files.iter().find(|entry| entry.original_path == original_path)
    }
}
