//! Executes procedures against the engine and sends replies to the
//! [`crate::stream_writer::StreamWriter`].

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::engine::Engine;
use crate::message_types::{ProcRecv, ReplySender};
use crate::rpc;

/// The dispatcher loop. Operations run concurrently under the engine's
/// counting semaphore; this task itself never touches the filesystem.
pub struct EngineTask {
    engine: Arc<Engine>,
    proc_recv: ProcRecv,
    reply_send: ReplySender,
}

impl EngineTask {
    /// Creates a new instance of [`EngineTask`] and spawns its loop.
    pub fn spawn(
        engine: Arc<Engine>,
        proc_recv: ProcRecv,
        reply_send: ReplySender,
    ) -> JoinHandle<()> {
        tokio::spawn(Self { engine, proc_recv, reply_send }.run())
    }

    async fn run(mut self) {
        while let Some(procedure) = self.proc_recv.recv().await {
            let permit = match self.engine.semaphore().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let engine = Arc::clone(&self.engine);
            let reply_send = self.reply_send.clone();
            tokio::spawn(async move {
                let cancel = CancelToken::new();
                let reply = match rpc::dispatch(
                    &engine,
                    &procedure.op,
                    procedure.params,
                    &cancel,
                )
                .await
                {
                    Ok(result) => rpc::success(procedure.id, result),
                    Err(err) => {
                        debug!(op = %procedure.op, kind = err.kind(), "operation failed");
                        rpc::failure(procedure.id, &err)
                    }
                };
                let _ = reply_send.send(reply);
                drop(permit);
            });
        }
    }
}
