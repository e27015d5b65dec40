//! Directory and file-management operations.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::Engine;
use crate::cancel::CancelToken;
use crate::error::{OpError, OpResult};
use crate::rng::random_token;

/// Name of the in-tree trash directory used by soft deletes.
const TRASH_DIR: &str = ".trash";

/// Result document for `list_directory`.
#[derive(Debug, Clone, Serialize)]
pub struct DirListing {
    pub path: String,
    /// Rendered listing, one entry per line.
    pub listing: String,
    pub cached: bool,
}

/// Result document for rename / move / copy.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub from: String,
    pub to: String,
    pub backup_id: Option<String>,
}

/// Result document for `delete_file`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResult {
    pub path: String,
    pub backup_id: String,
    pub was_directory: bool,
}

/// Result document for `soft_delete_file`.
#[derive(Debug, Clone, Serialize)]
pub struct SoftDeleteResult {
    pub path: String,
    pub trashed_to: String,
    pub backup_id: String,
}

impl Engine {
    /// Renders a directory listing, served from the listing cache while the
    /// directory's mtime is unchanged.
    pub async fn list_directory(&self, raw_path: &str) -> OpResult<DirListing> {
        let path = self.gate.admit(raw_path).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("directory not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;
        if !meta.is_dir() {
            return Err(OpError::validation(format!("not a directory: {}", path.display())));
        }

        let mtime = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        if let Some(cached) = self.cache.dirs.get(&path, mtime) {
            return Ok(DirListing {
                path: path.to_string_lossy().into_owned(),
                listing: cached.as_str().to_owned(),
                cached: true,
            });
        }

        let rendered = self.render_listing(&path).await?;
        let rendered = Arc::new(rendered);
        self.cache.dirs.set(&path, Arc::clone(&rendered), mtime);
        Ok(DirListing {
            path: path.to_string_lossy().into_owned(),
            listing: rendered.as_str().to_owned(),
            cached: false,
        })
    }

    async fn render_listing(&self, path: &Path) -> OpResult<String> {
        let mut rows: Vec<(String, String)> = Vec::new();
        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            let row = if meta.is_dir() {
                format!("d          - {name}")
            } else {
                format!("f {:>10} {name}", meta.len())
            };
            rows.push((name, row));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let max = self.config.limits.max_list_items;
        let total = rows.len();
        let mut lines: Vec<String> = rows.into_iter().take(max).map(|(_, row)| row).collect();
        if total > max {
            lines.push(format!("... {} more entries", total - max));
        }
        Ok(lines.join("\n"))
    }

    /// Creates a directory (and missing parents).
    pub async fn create_directory(&self, raw_path: &str) -> OpResult<serde_json::Value> {
        let path = self.gate.admit(raw_path).await?;
        let existed = tokio::fs::metadata(&path).await.is_ok();
        tokio::fs::create_dir_all(&path).await?;
        self.cache.invalidate_path(&path);
        Ok(serde_json::json!({
            "path": path.to_string_lossy(),
            "created": !existed,
        }))
    }

    /// Renames a file within the tree, backing up the source content first.
    pub async fn rename_file(
        &self,
        raw_from: &str,
        raw_to: &str,
        cancel: &CancelToken,
    ) -> OpResult<TransferResult> {
        cancel.check()?;
        let from = self.gate.admit(raw_from).await?;
        let to = self.gate.admit(raw_to).await?;
        self.require_exists(&from).await?;

        let record = self.backups.create(&[from.clone(), to.clone()], "rename", None).await?;
        cancel.check()?;
        tokio::fs::rename(&from, &to).await?;

        self.cache.invalidate_path(&from);
        self.cache.invalidate_path(&to);
        info!(from = %from.display(), to = %to.display(), "renamed");
        Ok(TransferResult {
            from: from.to_string_lossy().into_owned(),
            to: to.to_string_lossy().into_owned(),
            backup_id: Some(record.backup_id),
        })
    }

    /// Moves a file, falling back to copy-and-remove across devices.
    pub async fn move_file(
        &self,
        raw_from: &str,
        raw_to: &str,
        cancel: &CancelToken,
    ) -> OpResult<TransferResult> {
        cancel.check()?;
        let from = self.gate.admit(raw_from).await?;
        let to = self.gate.admit(raw_to).await?;
        self.require_exists(&from).await?;

        let record = self.backups.create(&[from.clone(), to.clone()], "move", None).await?;
        cancel.check()?;
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if tokio::fs::rename(&from, &to).await.is_err() {
            tokio::fs::copy(&from, &to).await?;
            tokio::fs::remove_file(&from).await?;
        }

        self.cache.invalidate_path(&from);
        self.cache.invalidate_path(&to);
        info!(from = %from.display(), to = %to.display(), "moved");
        Ok(TransferResult {
            from: from.to_string_lossy().into_owned(),
            to: to.to_string_lossy().into_owned(),
            backup_id: Some(record.backup_id),
        })
    }

    /// Copies a file, backing up a pre-existing destination.
    pub async fn copy_file(
        &self,
        raw_from: &str,
        raw_to: &str,
        cancel: &CancelToken,
    ) -> OpResult<TransferResult> {
        cancel.check()?;
        let from = self.gate.admit(raw_from).await?;
        let to = self.gate.admit(raw_to).await?;
        self.require_exists(&from).await?;

        let record = if tokio::fs::metadata(&to).await.is_ok() {
            Some(self.backups.create(&[to.clone()], "copy", None).await?)
        } else {
            if let Some(parent) = to.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            None
        };
        cancel.check()?;
        tokio::fs::copy(&from, &to).await?;

        self.cache.invalidate_path(&to);
        Ok(TransferResult {
            from: from.to_string_lossy().into_owned(),
            to: to.to_string_lossy().into_owned(),
            backup_id: record.map(|r| r.backup_id),
        })
    }

    /// Permanently deletes a file, or a directory when forced. The backup
    /// taken beforehand is the recovery path.
    pub async fn delete_file(
        &self,
        raw_path: &str,
        force: bool,
        cancel: &CancelToken,
    ) -> OpResult<DeleteResult> {
        cancel.check()?;
        let path = self.gate.admit(raw_path).await?;
        let meta = tokio::fs::metadata(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                OpError::path(format!("path not found: {}", path.display()))
            } else {
                OpError::Io(err)
            }
        })?;

        if meta.is_dir() && !force {
            return Err(OpError::validation(
                "deleting a directory requires force; its entire subtree will be removed",
            ));
        }

        let record = self.backups.create(&[path.clone()], "delete", None).await?;
        cancel.check()?;
        if meta.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
        } else {
            tokio::fs::remove_file(&path).await?;
        }

        self.cache.invalidate_path(&path);
        info!(path = %path.display(), backup_id = %record.backup_id, "deleted");
        Ok(DeleteResult {
            path: path.to_string_lossy().into_owned(),
            backup_id: record.backup_id,
            was_directory: meta.is_dir(),
        })
    }

    /// Moves a file into the in-tree trash directory instead of deleting it.
    /// Reversible by renaming the trashed entry back.
    pub async fn soft_delete_file(
        &self,
        raw_path: &str,
        cancel: &CancelToken,
    ) -> OpResult<SoftDeleteResult> {
        cancel.check()?;
        let path = self.gate.admit(raw_path).await?;
        self.require_exists(&path).await?;

        let parent = path
            .parent()
            .ok_or_else(|| OpError::validation("cannot soft-delete a filesystem root"))?;
        let trash = parent.join(TRASH_DIR);
        tokio::fs::create_dir_all(&trash).await?;

        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let mut dest = trash.join(&name);
        if tokio::fs::metadata(&dest).await.is_ok() {
            dest = trash.join(format!("{name}.{}", random_token(8)));
        }

        let record = self.backups.create(&[path.clone()], "soft_delete", None).await?;
        cancel.check()?;
        tokio::fs::rename(&path, &dest).await?;

        self.cache.invalidate_path(&path);
        info!(path = %path.display(), trashed_to = %dest.display(), "soft-deleted");
        Ok(SoftDeleteResult {
            path: path.to_string_lossy().into_owned(),
            trashed_to: dest.to_string_lossy().into_owned(),
            backup_id: record.backup_id,
        })
    }

    pub(crate) async fn require_exists(&self, path: &Path) -> OpResult<()> {
        if tokio::fs::metadata(path).await.is_err() {
            return Err(OpError::path(format!("path not found: {}", path.display())));
        }
        Ok(())
    }
}
