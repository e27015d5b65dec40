//! Server configuration: a TOML document merged with command-line overrides.
//!
//! Every tunable the operator controls lives here; components borrow the
//! sections they need at construction time and never re-read them afterward.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Complete server configuration with operator defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allowed root paths. Empty means unrestricted.
    pub allowed_paths: Vec<PathBuf>,
    /// Concurrent operation limit. `0` selects `2 x logical CPUs`, capped at 16.
    pub parallel_ops: usize,
    /// Trims verbose fields from success documents. Semantics are unchanged.
    pub compact_responses: bool,
    pub cache: CacheConfig,
    pub sizing: SizingConfig,
    pub risk: RiskThresholds,
    pub backup: BackupConfig,
    pub limits: LimitsConfig,
}

/// Cache tier tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Aggregate byte budget of the file sub-cache.
    pub file_capacity_bytes: u64,
    /// Per-entry cap; larger files bypass the cache.
    pub file_entry_max_bytes: u64,
    /// Idle window after which file entries become eviction candidates.
    pub file_idle_secs: u64,
    /// Directory listing TTL.
    pub dir_ttl_secs: u64,
    /// Metadata TTL.
    pub meta_ttl_secs: u64,
    /// Enables sibling prefetching for hot files.
    pub prefetch: bool,
    /// Siblings above this size are never prefetched.
    pub prefetch_max_bytes: u64,
    /// Bounded prefetch queue length; overflow drops the suggestion.
    pub prefetch_queue_len: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            file_capacity_bytes: 100 * 1024 * 1024,
            file_entry_max_bytes: 1024 * 1024,
            file_idle_secs: 180,
            dir_ttl_secs: 180,
            meta_ttl_secs: 180,
            prefetch: false,
            prefetch_max_bytes: 100 * 1024,
            prefetch_queue_len: 64,
        }
    }
}

/// Size-class boundaries. Lower bounds are inclusive.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub small_max_bytes: u64,
    pub medium_max_bytes: u64,
    pub large_max_bytes: u64,
    pub very_large_max_bytes: u64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            small_max_bytes: 100 * 1024,
            medium_max_bytes: 500 * 1024,
            large_max_bytes: 5 * 1024 * 1024,
            very_large_max_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Risk-gate thresholds for the impact analyzer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub medium_percent: f64,
    pub high_percent: f64,
    pub critical_percent: f64,
    pub medium_occurrences: usize,
    pub high_occurrences: usize,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium_percent: 30.0,
            high_percent: 50.0,
            critical_percent: 90.0,
            medium_occurrences: 50,
            high_occurrences: 100,
        }
    }
}

/// Backup store tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Root directory of the store. Defaults to a per-user temp location.
    pub root: Option<PathBuf>,
    /// Age-based eviction horizon in days.
    pub max_age_days: u64,
    /// Count-based eviction bound; oldest records go first.
    pub max_count: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { root: None, max_age_days: 30, max_count: 200 }
    }
}

/// Output bounds applied by the response layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_response_bytes: usize,
    pub max_search_results: usize,
    pub max_list_items: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: 1024 * 1024,
            max_search_results: 500,
            max_list_items: 2000,
        }
    }
}

impl ServerConfig {
    /// Parses a TOML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Unreadable { path: path.to_path_buf(), err })?;
        toml::from_str(&text).map_err(|err| ConfigError::Malformed { path: path.to_path_buf(), err })
    }

    /// Resolved worker-pool bound: `parallel_ops` if set, else `2 x CPUs` capped at 16.
    pub fn effective_parallel_ops(&self) -> usize {
        if self.parallel_ops > 0 {
            return self.parallel_ops;
        }
        let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        (cpus * 2).min(16)
    }

    /// Backup root, falling back to the per-user temp location.
    pub fn backup_root(&self) -> PathBuf {
        self.backup
            .root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("fs-warden-backups"))
    }
}

/// Failures while loading the configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path:?}: {err}")]
    Unreadable { path: PathBuf, err: std::io::Error },
    #[error("cannot parse config {path:?}: {err}")]
    Malformed { path: PathBuf, err: toml::de::Error },
}
