//! Writes reply documents to the transport, one JSON line each.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::message_types::Reply;

/// The transport-facing writer.
pub struct StreamWriter<W> {
    writer: W,
    reply_recv: UnboundedReceiver<Reply>,
}

impl<W: AsyncWrite + Unpin + Send + 'static> StreamWriter<W> {
    /// Creates a new instance of [`StreamWriter`] and spawns its loop.
    pub fn spawn(writer: W, reply_recv: UnboundedReceiver<Reply>) -> JoinHandle<()> {
        tokio::spawn(Self { writer, reply_recv }.run())
    }

    async fn run(mut self) {
        while let Some(reply) = self.reply_recv.recv().await {
            let mut line = reply.body.to_string();
            line.push('\n');
            if let Err(err) = self.writer.write_all(line.as_bytes()).await {
                debug!(%err, "transport write failed");
                break;
            }
            if let Err(err) = self.writer.flush().await {
                debug!(%err, "transport flush failed");
                break;
            }
        }
    }
}
