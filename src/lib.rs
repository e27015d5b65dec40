//! fs-warden - a filesystem RPC server for LLM agent workflows.
//!
//! The server exposes filesystem operations over a line-delimited stdio
//! protocol. Every mutation runs through the edit pipeline: access control,
//! size routing, safety validation, impact analysis, risk gating, automatic
//! backup, atomic write, cache invalidation.

pub mod backup;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod edit;
pub mod engine;
pub mod error;
pub mod gate;
pub mod rpc;
pub mod search;
pub mod sizing;
pub mod strategy;
pub mod watcher;

mod engine_task;
mod message_types;
mod read_task;
mod rng;
mod stream_writer;

use std::sync::Arc;

use tokio::io::BufReader;
use tracing::warn;

use crate::engine::Engine;
use crate::engine_task::EngineTask;
use crate::message_types::{create_proc_channel, create_reply_channel};
use crate::read_task::ReadTask;
use crate::stream_writer::StreamWriter;

/// Serves the engine over stdin/stdout until the transport closes.
///
/// Spawns the background workers (prefetch, watcher) and the three-task
/// pipeline: read task → engine task → stream writer.
pub async fn serve_stdio(engine: Engine) -> std::io::Result<()> {
    let engine = Arc::new(engine);

    let _watch_guard = if engine.config().allowed_paths.is_empty() {
        None
    } else {
        match watcher::spawn(&engine.config().allowed_paths, engine.cache()) {
            Ok(guard) => Some(guard),
            Err(err) => {
                warn!(%err, "file watcher unavailable, relying on TTL expiry");
                None
            }
        }
    };
    if engine.config().cache.prefetch {
        cache::spawn_prefetch_worker(engine.cache(), engine.config().cache.prefetch_max_bytes);
    }

    let (proc_send, proc_recv) = create_proc_channel();
    let (reply_send, reply_recv) = create_reply_channel();

    ReadTask::spawn(BufReader::new(tokio::io::stdin()), proc_send, reply_send.clone());
    EngineTask::spawn(Arc::clone(&engine), proc_recv, reply_send);
    let writer = StreamWriter::spawn(tokio::io::stdout(), reply_recv);

    // The writer exits once every sender is gone and the queue is drained.
    writer.await.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
}
