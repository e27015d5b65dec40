//! The on-disk backup store and its in-memory listing index.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::{BackupFileEntry, BackupId, BackupRecord};
use crate::config::BackupConfig;
use crate::error::{OpError, OpResult};
use crate::strategy::direct;

/// Listing index lifetime before a forced rescan.
const INDEX_REFRESH: Duration = Duration::from_secs(300);
const METADATA_FILE: &str = "metadata.json";
const FILES_DIR: &str = "files";
/// Upper bound on diff sample lines returned to the client.
const DIFF_SAMPLE_LIMIT: usize = 40;

/// Filter for [`BackupStore::list`].
#[derive(Debug, Clone, Default)]
pub struct BackupFilter {
    pub operation_kind: Option<String>,
    pub path_contains: Option<String>,
    pub max_age_days: Option<u64>,
    pub limit: Option<usize>,
}

/// Outcome of a restore request.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResult {
    pub backup_id: String,
    pub preview: bool,
    /// Paths overwritten by the restore. Empty in preview mode.
    pub restored: Vec<String>,
    /// Safety-net backup of the pre-restore state, when one was taken.
    pub safety_backup_id: Option<String>,
    pub diffs: Vec<FileDiff>,
}

/// Difference between a backed-up copy and the file's current state.
#[derive(Debug, Clone, Serialize)]
pub struct FileDiff {
    pub file: String,
    /// True iff the current file is byte-identical to the stored copy.
    pub identical: bool,
    pub backup_size: u64,
    /// Missing when the file no longer exists.
    pub current_size: Option<u64>,
    pub changed_lines: usize,
    /// Up to [`DIFF_SAMPLE_LIMIT`] `-`/`+` prefixed lines.
    pub sample: Vec<String>,
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub count: usize,
    pub bytes: u64,
    pub dry_run: bool,
    pub removed: Vec<String>,
}

#[derive(Debug, Default)]
struct Index {
    records: Vec<BackupRecord>,
    refreshed_at: Option<Instant>,
    root_mtime: Option<SystemTime>,
}

impl Index {
    fn is_fresh(&self, current_mtime: Option<SystemTime>) -> bool {
        match self.refreshed_at {
            None => false,
            Some(at) => at.elapsed() < INDEX_REFRESH && self.root_mtime == current_mtime,
        }
    }
}

/// Persistent backup store rooted at one directory.
#[derive(Debug)]
pub struct BackupStore {
    root: PathBuf,
    max_age_days: u64,
    max_count: usize,
    index: RwLock<Index>,
}

impl BackupStore {
    pub fn new(root: PathBuf, config: &BackupConfig) -> Self {
        Self {
            root,
            max_age_days: config.max_age_days,
            max_count: config.max_count,
            index: RwLock::new(Index::default()),
        }
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Snapshots the current state of `paths` into a fresh record.
    ///
    /// Fails closed: if any part of the snapshot cannot be written the
    /// partial record directory is removed and the caller must not proceed
    /// with its mutation. Paths that do not exist yet are recorded by
    /// absence; directories are captured recursively.
    pub async fn create(
        &self,
        paths: &[PathBuf],
        operation_kind: &str,
        user_context: Option<String>,
    ) -> OpResult<BackupRecord> {
        self.ensure_root().await?;
        let id = BackupId::generate();
        let dir = self.root.join(id.as_str());

        match self.populate(&id, &dir, paths, operation_kind, user_context).await {
            Ok(record) => {
                let mut index = self.index.write().await;
                index.records.insert(0, record.clone());
                index.root_mtime =
                    tokio::fs::metadata(&self.root).await.ok().and_then(|m| m.modified().ok());
                info!(backup_id = %id, files = record.files.len(), "backup created");
                Ok(record)
            }
            Err(err) => {
                let _ = tokio::fs::remove_dir_all(&dir).await;
                Err(err)
            }
        }
    }

    async fn populate(
        &self,
        id: &BackupId,
        dir: &Path,
        paths: &[PathBuf],
        operation_kind: &str,
        user_context: Option<String>,
    ) -> OpResult<BackupRecord> {
        tokio::fs::create_dir_all(dir).await?;
        restrict_dir(dir).await?;

        let mut entries = Vec::new();
        let mut total_size = 0u64;
        for path in collect_files(paths).await? {
            let bytes = tokio::fs::read(&path).await?;
            let meta = tokio::fs::metadata(&path).await?;
            let sha256 = hex::encode(Sha256::digest(&bytes));
            let mtime = meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);

            let stored_rel = Path::new(FILES_DIR).join(stored_rel_path(&path));
            let stored_abs = dir.join(&stored_rel);
            if let Some(parent) = stored_abs.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&stored_abs, &bytes).await?;
            restrict_file(&stored_abs).await?;

            total_size += bytes.len() as u64;
            entries.push(BackupFileEntry {
                original_path: path.to_string_lossy().into_owned(),
                stored_path: stored_rel.to_string_lossy().into_owned(),
                size: bytes.len() as u64,
                sha256,
                mtime,
            });
        }

        let record = BackupRecord {
            backup_id: id.as_str().to_owned(),
            timestamp: Utc::now(),
            operation_kind: operation_kind.to_owned(),
            user_context,
            files: entries,
            total_size,
        };

        let metadata_path = dir.join(METADATA_FILE);
        let doc = serde_json::to_vec_pretty(&record)
            .map_err(|err| OpError::Io(std::io::Error::new(std::io::ErrorKind::Other, err)))?;
        tokio::fs::write(&metadata_path, doc).await?;
        restrict_file(&metadata_path).await?;
        Ok(record)
    }

    /// Fetches one record by validated identifier.
    pub async fn get(&self, id: &BackupId) -> OpResult<BackupRecord> {
        self.ensure_index().await?;
        let index = self.index.read().await;
        index
            .records
            .iter()
            .find(|record| record.backup_id == id.as_str())
            .cloned()
            .ok_or_else(|| OpError::path(format!("backup {id} not found")))
    }

    /// Lists records matching the filter, newest first.
    pub async fn list(&self, filter: &BackupFilter) -> OpResult<Vec<BackupRecord>> {
        self.ensure_index().await?;
        let now = Utc::now();
        let index = self.index.read().await;
        let mut out: Vec<BackupRecord> = index
            .records
            .iter()
            .filter(|record| {
                filter
                    .operation_kind
                    .as_deref()
                    .map_or(true, |kind| record.operation_kind == kind)
            })
            .filter(|record| {
                filter.path_contains.as_deref().map_or(true, |needle| {
                    record.files.iter().any(|f| f.original_path.contains(needle))
                })
            })
            .filter(|record| {
                filter.max_age_days.map_or(true, |days| record.age_days(now) <= days as i64)
            })
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    /// Restores files from a record, taking a safety-net backup of the
    /// current state first. `specific` limits the restore to one file;
    /// `preview` returns diffs without writing anything.
    pub async fn restore(
        &self,
        id: &BackupId,
        specific: Option<&str>,
        preview: bool,
    ) -> OpResult<RestoreResult> {
        let record = self.get(id).await?;
        let targets: Vec<BackupFileEntry> = record
            .files
            .iter()
            .filter(|entry| specific.map_or(true, |wanted| entry.original_path == wanted))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Err(OpError::path(match specific {
                Some(wanted) => format!("{wanted} is not part of backup {id}"),
                None => format!("backup {id} contains no files"),
            }));
        }

        if preview {
            let mut diffs = Vec::new();
            for entry in &targets {
                diffs.push(self.diff_entry(&record, entry).await?);
            }
            return Ok(RestoreResult {
                backup_id: record.backup_id,
                preview: true,
                restored: Vec::new(),
                safety_backup_id: None,
                diffs,
            });
        }

        // Safety net: capture what is about to be overwritten.
        let current: Vec<PathBuf> = targets
            .iter()
            .map(|entry| PathBuf::from(&entry.original_path))
            .collect();
        let safety = self
            .create(&current, "restore", Some(format!("safety net before restoring {id}")))
            .await?;

        let dir = self.root.join(&record.backup_id);
        let mut restored = Vec::new();
        for entry in &targets {
            let stored = dir.join(&entry.stored_path);
            let bytes = tokio::fs::read(&stored).await?;
            let original = PathBuf::from(&entry.original_path);
            if let Some(parent) = original.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            direct::atomic_write(&original, &bytes).await?;
            restored.push(entry.original_path.clone());
        }
        info!(backup_id = %id, files = restored.len(), "backup restored");

        Ok(RestoreResult {
            backup_id: record.backup_id,
            preview: false,
            restored,
            safety_backup_id: Some(safety.backup_id),
            diffs: Vec::new(),
        })
    }

    /// Diffs one file of a record against its current on-disk state.
    pub async fn compare(&self, id: &BackupId, file_path: &str) -> OpResult<FileDiff> {
        let record = self.get(id).await?;
        let entry = record
            .entry_for(file_path)
            .ok_or_else(|| OpError::path(format!("{file_path} is not part of backup {id}")))?;
        self.diff_entry(&record, entry).await
    }

    async fn diff_entry(
        &self,
        record: &BackupRecord,
        entry: &BackupFileEntry,
    ) -> OpResult<FileDiff> {
        let stored = self.root.join(&record.backup_id).join(&entry.stored_path);
        let backup_bytes = tokio::fs::read(&stored).await?;
        let current_bytes = match tokio::fs::read(&entry.original_path).await {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => return Err(err.into()),
        };
        Ok(compute_diff(&entry.original_path, &backup_bytes, current_bytes.as_deref()))
    }

    /// Rolls one file back to its backed-up content. Used by the pipeline's
    /// failure path and by batch rollback.
    pub async fn restore_file(
        &self,
        record: &BackupRecord,
        original_path: &Path,
    ) -> OpResult<()> {
        let key = original_path.to_string_lossy();
        let entry = record.entry_for(&key).ok_or_else(|| {
            OpError::path(format!("{key} is not part of backup {}", record.backup_id))
        })?;
        let stored = self.root.join(&record.backup_id).join(&entry.stored_path);
        let bytes = tokio::fs::read(&stored).await?;
        direct::atomic_write(original_path, &bytes).await?;
        Ok(())
    }

    /// Applies the age and count eviction policies, oldest records first.
    pub async fn cleanup(
        &self,
        older_than_days: Option<u64>,
        dry_run: bool,
    ) -> OpResult<CleanupReport> {
        self.ensure_index().await?;
        let now = Utc::now();
        let age_limit = older_than_days.unwrap_or(self.max_age_days) as i64;

        let records: Vec<BackupRecord> = { self.index.read().await.records.clone() };
        let mut doomed: Vec<&BackupRecord> = records
            .iter()
            .filter(|record| record.age_days(now) >= age_limit.max(0))
            .collect();
        // Count policy: records are newest-first, so everything past the
        // bound is the oldest tail.
        for record in records.iter().skip(self.max_count) {
            if !doomed.iter().any(|r| r.backup_id == record.backup_id) {
                doomed.push(record);
            }
        }

        let count = doomed.len();
        let bytes = doomed.iter().map(|record| record.total_size).sum();
        let removed: Vec<String> = doomed.iter().map(|r| r.backup_id.clone()).collect();

        if !dry_run {
            for id in &removed {
                if let Err(err) = tokio::fs::remove_dir_all(self.root.join(id)).await {
                    warn!(backup_id = %id, %err, "failed to remove backup");
                }
            }
            let mut index = self.index.write().await;
            index.records.retain(|record| !removed.contains(&record.backup_id));
            index.root_mtime =
                tokio::fs::metadata(&self.root).await.ok().and_then(|m| m.modified().ok());
        }

        Ok(CleanupReport { count, bytes, dry_run, removed })
    }

    async fn ensure_root(&self) -> OpResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        restrict_dir(&self.root).await?;
        Ok(())
    }

    /// Rebuilds the listing index when it is stale: older than the refresh
    /// window, or the store root's mtime has advanced.
    async fn ensure_index(&self) -> OpResult<()> {
        let current_mtime =
            tokio::fs::metadata(&self.root).await.ok().and_then(|m| m.modified().ok());
        {
            let index = self.index.read().await;
            if index.is_fresh(current_mtime) {
                return Ok(());
            }
        }
        let mut index = self.index.write().await;
        if index.is_fresh(current_mtime) {
            return Ok(());
        }
        index.records = self.scan_records().await;
        index.refreshed_at = Some(Instant::now());
        index.root_mtime = current_mtime;
        Ok(())
    }

    async fn scan_records(&self) -> Vec<BackupRecord> {
        let mut records = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return records;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if BackupId::parse(name).is_err() {
                continue;
            }
            let metadata_path = entry.path().join(METADATA_FILE);
            match tokio::fs::read(&metadata_path).await {
                Ok(doc) => match serde_json::from_slice::<BackupRecord>(&doc) {
                    Ok(record) => records.push(record),
                    Err(err) => warn!(backup_id = name, %err, "malformed backup metadata"),
                },
                Err(err) => warn!(backup_id = name, %err, "unreadable backup metadata"),
            }
        }
        // Newest first. Identifier strings only carry second precision, so
        // the metadata timestamp breaks same-second ties.
        records.sort_by(|a, b| {
            b.timestamp.cmp(&a.timestamp).then_with(|| b.backup_id.cmp(&a.backup_id))
        });
        records
    }
}

/// Flattens the requested paths into the list of existing files to copy.
async fn collect_files(paths: &[PathBuf]) -> OpResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };
        if meta.is_file() {
            out.push(path.clone());
        } else if meta.is_dir() {
            collect_dir(path, &mut out).await?;
        }
    }
    Ok(out)
}

fn collect_dir<'a>(
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = OpResult<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_file() {
                out.push(entry.path());
            } else if meta.is_dir() {
                collect_dir(&entry.path(), out).await?;
            }
        }
        Ok(())
    })
}

/// Maps an absolute original path to a relative location under `files/`.
fn stored_rel_path(original: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in original.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::Prefix(prefix) => {
                let cleaned: String = prefix
                    .as_os_str()
                    .to_string_lossy()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                if !cleaned.is_empty() {
                    out.push(cleaned);
                }
            }
            _ => {}
        }
    }
    out
}

/// Line-oriented difference with a bounded sample.
fn compute_diff(file: &str, backup: &[u8], current: Option<&[u8]>) -> FileDiff {
    let identical = current.map_or(false, |bytes| bytes == backup);
    let backup_text = String::from_utf8_lossy(backup);
    let current_text = current.map(String::from_utf8_lossy).unwrap_or_default();

    let backup_lines: Vec<&str> = backup_text.lines().collect();
    let current_lines: Vec<&str> = current_text.lines().collect();

    let mut changed_lines = 0usize;
    let mut sample = Vec::new();
    let rows = backup_lines.len().max(current_lines.len());
    for i in 0..rows {
        let old = backup_lines.get(i);
        let new = current_lines.get(i);
        if old == new {
            continue;
        }
        changed_lines += 1;
        if sample.len() + 2 <= DIFF_SAMPLE_LIMIT {
            if let Some(line) = old {
                sample.push(format!("- {line}"));
            }
            if let Some(line) = new {
                sample.push(format!("+ {line}"));
            }
        }
    }

    FileDiff {
        file: file.to_owned(),
        identical,
        backup_size: backup.len() as u64,
        current_size: current.map(|bytes| bytes.len() as u64),
        changed_lines,
        sample,
    }
}

async fn restrict_file(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

async fn restrict_dir(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700)).await?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
