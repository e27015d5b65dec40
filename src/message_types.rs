//! Channel message types wiring the read task, the engine task, and the
//! stream writer.

use serde_json::Value;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// A parsed request on its way to the engine task.
#[derive(Debug)]
pub struct Procedure {
    pub id: Value,
    pub op: String,
    pub params: Value,
}

/// A response document on its way to the stream writer.
#[derive(Debug)]
pub struct Reply {
    pub body: Value,
}

/// Sender half for procedures.
#[derive(Debug, Clone)]
pub struct ProcSender {
    sender: UnboundedSender<Procedure>,
}

impl ProcSender {
    /// Forwards a parsed request to the engine task.
    pub fn send(&self, procedure: Procedure) -> Result<(), SendError<Procedure>> {
        self.sender.send(procedure)
    }
}

/// Receiver half for procedures.
#[derive(Debug)]
pub struct ProcRecv {
    recv: UnboundedReceiver<Procedure>,
}

impl ProcRecv {
    /// Receives the next procedure, or `None` once the reader is gone.
    pub async fn recv(&mut self) -> Option<Procedure> {
        self.recv.recv().await
    }
}

/// Sender half for replies.
#[derive(Debug, Clone)]
pub struct ReplySender {
    sender: UnboundedSender<Reply>,
}

impl ReplySender {
    /// Queues a response document for the stream writer.
    pub fn send(&self, body: Value) -> Result<(), SendError<Reply>> {
        self.sender.send(Reply { body })
    }
}

/// Creates the procedure channel.
pub fn create_proc_channel() -> (ProcSender, ProcRecv) {
    let (sender, recv) = tokio::sync::mpsc::unbounded_channel::<Procedure>();
    (ProcSender { sender }, ProcRecv { recv })
}

/// Creates the reply channel.
pub fn create_reply_channel() -> (ReplySender, UnboundedReceiver<Reply>) {
    let (sender, recv) = tokio::sync::mpsc::unbounded_channel::<Reply>();
    (ReplySender { sender }, recv)
}
