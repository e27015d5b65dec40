//! Error taxonomy shared by every engine operation.
//!
//! Each variant maps to one wire `kind`. Cache failures never appear here:
//! the cache tier recovers by bypassing itself and logging.

use serde_json::json;

use crate::edit::impact::ImpactReport;

/// Result alias used by all engine operations.
pub type OpResult<T> = std::result::Result<T, OpError>;

/// Structured operation failure.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// Normalization failed, the ACL denied the path, or a required path is missing.
    #[error("{message}")]
    Path { message: String },

    /// The request is structurally invalid, or the risk gate refused it.
    #[error("{message}")]
    Validation { message: String, impact: Option<ImpactReport> },

    /// `old_text` was not found, or the file drifted between read and write.
    #[error("{message}")]
    Edit { message: String, suggestion: Option<String> },

    /// The operating system refused an I/O step.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,
}

impl OpError {
    /// Builds a [`OpError::Path`] from anything printable.
    pub fn path(message: impl Into<String>) -> Self {
        Self::Path { message: message.into() }
    }

    /// Builds a plain [`OpError::Validation`] without an impact report.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), impact: None }
    }

    /// Builds the risk-gate refusal carrying the full impact report.
    pub fn risky(message: impl Into<String>, impact: ImpactReport) -> Self {
        Self::Validation { message: message.into(), impact: Some(impact) }
    }

    /// Builds a [`OpError::Edit`] without a suggestion.
    pub fn edit(message: impl Into<String>) -> Self {
        Self::Edit { message: message.into(), suggestion: None }
    }

    /// Builds a [`OpError::Edit`] with a recovery suggestion for the caller.
    pub fn edit_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Edit { message: message.into(), suggestion: Some(suggestion.into()) }
    }

    /// Wire `kind` string for the error document.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Path { .. } => "path_error",
            Self::Validation { .. } => "validation_error",
            Self::Edit { .. } => "edit_error",
            Self::Io(_) => "io_error",
            Self::Cancelled => "cancelled",
        }
    }

    /// Renders the single structured error document sent to the client.
    pub fn to_document(&self) -> serde_json::Value {
        let mut doc = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            Self::Validation { impact: Some(report), .. } => {
                doc["impact"] = serde_json::to_value(report).unwrap_or_default();
            }
            Self::Edit { suggestion: Some(text), .. } => {
                doc["suggestion"] = json!(text);
            }
            _ => {}
        }
        doc
    }
}
