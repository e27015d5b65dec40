//! Line-delimited JSON request and response documents.
//!
//! One request per line on stdin, one response per line on stdout. The
//! framing is deliberately thin; the engine API is the product.

mod dispatch;

pub use dispatch::dispatch;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::OpError;

/// One request line.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    /// Client-chosen identifier, echoed back verbatim.
    pub id: Value,
    pub op: String,
    #[serde(default)]
    pub params: Value,
}

/// Success document.
pub fn success(id: Value, result: Value) -> Value {
    json!({ "id": id, "ok": true, "result": result })
}

/// Error document.
pub fn failure(id: Value, err: &OpError) -> Value {
    json!({ "id": id, "ok": false, "error": err.to_document() })
}

/// Error document for a line that did not parse as a request at all.
pub fn parse_failure(message: &str) -> Value {
    json!({
        "id": Value::Null,
        "ok": false,
        "error": { "kind": "validation_error", "message": message },
    })
}
