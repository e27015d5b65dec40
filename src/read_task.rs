//! Reads request lines from the transport, parses them, and forwards them
//! to the [`crate::engine_task::EngineTask`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::message_types::{ProcSender, Procedure, ReplySender};
use crate::rpc::{self, Request};

/// The transport-facing reader. Performs no file I/O of its own.
pub struct ReadTask<R> {
    reader: R,
    proc_send: ProcSender,
    reply_send: ReplySender,
}

impl<R: AsyncBufRead + Unpin + Send + 'static> ReadTask<R> {
    /// Creates a new instance of [`ReadTask`] and spawns its loop.
    pub fn spawn(reader: R, proc_send: ProcSender, reply_send: ReplySender) -> JoinHandle<()> {
        tokio::spawn(Self { reader, proc_send, reply_send }.run())
    }

    async fn run(mut self) {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(%err, "transport read failed");
                    break;
                }
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Request>(trimmed) {
                Ok(request) => {
                    let procedure =
                        Procedure { id: request.id, op: request.op, params: request.params };
                    if self.proc_send.send(procedure).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let reply = rpc::parse_failure(&format!("malformed request: {err}"));
                    if self.reply_send.send(reply).is_err() {
                        break;
                    }
                }
            }
        }
    }
}
