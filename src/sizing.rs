//! File size classification and execution-path routing.

use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;
use crate::error::{OpError, OpResult};

/// Size class of a file. Lower bounds are inclusive: a file sitting exactly
/// on a boundary belongs to the larger class.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    VeryLarge,
    OverLimit,
}

impl SizeClass {
    /// Classifies a byte length against the configured boundaries.
    pub fn classify(len: u64, config: &SizingConfig) -> Self {
        if len < config.small_max_bytes {
            Self::Small
        } else if len < config.medium_max_bytes {
            Self::Medium
        } else if len < config.large_max_bytes {
            Self::Large
        } else if len < config.very_large_max_bytes {
            Self::VeryLarge
        } else {
            Self::OverLimit
        }
    }

    /// True for the classes served by whole-file direct I/O.
    pub fn is_direct(self) -> bool {
        matches!(self, Self::Small | Self::Medium)
    }
}

/// The kind of operation being routed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpKind {
    Read,
    Write,
    Edit,
}

/// Execution path chosen for an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Route {
    Direct,
    StreamingWrite,
    ChunkedRead,
    SmartEdit,
}

/// Maps an operation and size class to its execution path.
///
/// Edits on over-limit files are structurally refused; reads always have a
/// path (chunked), and writes above the direct classes stream.
pub fn choose_route(op: OpKind, class: SizeClass) -> OpResult<Route> {
    let route = match (op, class) {
        (OpKind::Read, c) if c.is_direct() => Route::Direct,
        (OpKind::Read, _) => Route::ChunkedRead,
        (OpKind::Write, c) if c.is_direct() => Route::Direct,
        (OpKind::Write, _) => Route::StreamingWrite,
        (OpKind::Edit, c) if c.is_direct() => Route::Direct,
        (OpKind::Edit, SizeClass::OverLimit) => {
            return Err(OpError::validation(
                "file exceeds the edit size limit; read and rewrite in ranges instead",
            ))
        }
        (OpKind::Edit, _) => Route::SmartEdit,
    };
    Ok(route)
}
