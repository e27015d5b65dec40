//! The operation engine.
//!
//! One [`Engine`] owns every component — gate, caches, backup store, edit
//! pipeline, telemetry — and exposes the whole operation surface as typed
//! async methods. The RPC layer stays thin: it parses parameters, calls one
//! method here, and serializes the result.

mod analyze;
mod backup_ops;
mod batch;
mod dir_ops;
mod file_ops;
mod search_ops;

pub use analyze::AnalysisReport;
pub use batch::{BatchOperation, BatchResult, SubOpOutcome};
pub use dir_ops::{DeleteResult, DirListing, SoftDeleteResult, TransferResult};
pub use file_ops::{FileChunk, FileContent, FileInfo, LineRange, ReadMode};
pub use search_ops::{CountResult, SearchOutcome, SmartSearchResult};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Semaphore;

use crate::backup::BackupStore;
use crate::cache::{CacheStats, CacheTier};
use crate::config::ServerConfig;
use crate::edit::{EditPipeline, Telemetry, TelemetrySummary};
use crate::gate::{HostKind, PathGate};

/// The fully wired operation engine.
#[derive(Debug)]
pub struct Engine {
    pub(crate) config: ServerConfig,
    pub(crate) gate: Arc<PathGate>,
    pub(crate) cache: Arc<CacheTier>,
    pub(crate) backups: Arc<BackupStore>,
    pub(crate) pipeline: EditPipeline,
    pub(crate) telemetry: Arc<Telemetry>,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Wires every component from the operator configuration. Background
    /// workers (prefetch, watcher) are spawned by the server loop, not here.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_host(config, HostKind::detect())
    }

    /// Constructor with an explicit host kind, for tests that exercise the
    /// path translation table.
    pub fn with_host(config: ServerConfig, host: HostKind) -> Self {
        let gate = Arc::new(PathGate::new(&config.allowed_paths, host));
        let cache = Arc::new(CacheTier::new(&config.cache));
        let backups = Arc::new(BackupStore::new(config.backup_root(), &config.backup));
        let telemetry = Arc::new(Telemetry::new());
        let pipeline = EditPipeline::new(
            Arc::clone(&gate),
            Arc::clone(&cache),
            Arc::clone(&backups),
            config.sizing.clone(),
            config.risk.clone(),
            Arc::clone(&telemetry),
        );
        let semaphore = Arc::new(Semaphore::new(config.effective_parallel_ops()));
        Self { config, gate, cache, backups, pipeline, telemetry, semaphore }
    }

    /// The counting semaphore bounding concurrent operations.
    pub fn semaphore(&self) -> Arc<Semaphore> {
        Arc::clone(&self.semaphore)
    }

    /// Shared cache tier, for the background workers.
    pub fn cache(&self) -> Arc<CacheTier> {
        Arc::clone(&self.cache)
    }

    /// Operator configuration the engine was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Telemetry summary: edit counters plus cache statistics.
    pub fn telemetry_summary(&self) -> EngineTelemetry {
        EngineTelemetry { edits: self.telemetry.summary(), cache: self.cache.stats() }
    }
}

/// Combined counters exposed by the telemetry operation.
#[derive(Debug, Clone, Serialize)]
pub struct EngineTelemetry {
    pub edits: TelemetrySummary,
    pub cache: CacheStats,
}
