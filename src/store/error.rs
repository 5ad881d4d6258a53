//! Store error taxonomy.

use std::io;
use std::path::PathBuf;

/// Errors surfaced by any [`Store`] implementation.
///
/// Every variant carries enough context (object path, underlying cause) to
/// diagnose without re-running at higher verbosity. Cleanup failures are
/// reported alongside the original error, never instead of it.
///
/// [`Store`]: crate::store::Store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Local upload source does not exist.
    #[error("source object not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Computed and recorded checksums differ after retrieval. The local
    /// object has been deleted by the time this is returned.
    #[error("hash mismatch for {path}: sidecar records {expected}, object hashes to {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Sidecar record missing required fields or otherwise unparseable.
    #[error("malformed sidecar record {path}: {reason}")]
    MalformedRecord { path: PathBuf, reason: String },

    /// Plugin executable could not be started.
    #[error("failed to spawn plugin {plugin}: {source}")]
    SpawnFailed {
        plugin: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Plugin announced the wrong protocol version or magic cookie, or no
    /// handshake at all. The subprocess has been killed.
    #[error("plugin handshake failed for {plugin}: {detail}")]
    HandshakeFailed { plugin: PathBuf, detail: String },

    /// RPC channel fault mid-call. The session is unusable afterwards.
    #[error("plugin transport error: {detail}")]
    Transport { detail: String },

    /// Domain error raised inside a backend (or re-raised from a plugin's
    /// concrete store, kind preserved across the process boundary).
    #[error("backend error: {message}")]
    Backend { message: String },

    /// The call was cancelled via the cancel token.
    #[error("operation cancelled")]
    Cancelled,

    /// A failure whose cleanup step also failed; both causes are visible.
    #[error("{original}; additionally, cleanup failed: {cleanup}")]
    CleanupFailed {
        #[source]
        original: Box<StoreError>,
        cleanup: io::Error,
    },

    /// The store was already closed; the call was refused before touching
    /// any state.
    #[error("store is closed")]
    Closed,

    /// Local filesystem I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl StoreError {
    /// Wrap a failed cleanup attempt around the original error.
    pub fn with_cleanup_failure(self, cleanup: io::Error) -> Self {
        StoreError::CleanupFailed {
            original: Box::new(self),
            cleanup,
        }
    }

    /// Build a transport error from any displayable cause.
    pub fn transport(detail: impl ToString) -> Self {
        StoreError::Transport {
            detail: detail.to_string(),
        }
    }
}
