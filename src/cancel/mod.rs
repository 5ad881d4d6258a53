//! Cooperative cancellation.
//!
//! A single [`CancelToken`] is threaded through every store call. Backends
//! check it between chunks of a transfer; the orchestrator checks it between
//! objects. A trip mid-transfer triggers the same cleanup discipline as a
//! failed transfer: no sidecar without fully placed bytes, no partial local
//! object left behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::store::StoreError;

/// Shared cancellation flag. Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token. All holders observe the cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been tripped.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error-returning check, for use at suspension points.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.is_cancelled() {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Install a SIGINT/SIGTERM handler that trips this token.
    ///
    /// Intended for the CLI entry point; library callers own their tokens.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let token = self.clone();
        ctrlc::set_handler(move || token.cancel())
    }
}
