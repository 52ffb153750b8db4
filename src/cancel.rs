//! Cooperative cancellation.
//!
//! Parsing runs on the caller's thread; a [`CancelToken`] is passed by
//! reference through recursive calls and checked at defined checkpoints
//! (before each multipart sub-part, between header fields). Cancellation
//! is advisory: work already completed is not rolled back.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{EmailError, Result};

/// Shared cancellation flag, cheap to clone across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Checkpoint: return `Err(Cancelled)` if the token has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(EmailError::Cancelled);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_passes() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(EmailError::Cancelled)));
    }
}
