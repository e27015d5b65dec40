//! Cooperative cancellation tokens carried by every operation.
//!
//! Search operations poll the token at line boundaries; edits poll it only
//! up to the point where the write step begins. Cache invalidation never
//! observes the token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fails with [`crate::error::OpError::Cancelled`] if the token fired.
    pub fn check(&self) -> crate::error::OpResult<()> {
        if self.is_cancelled() {
            Err(crate::error::OpError::Cancelled)
        } else {
            Ok(())
        }
    }
}
