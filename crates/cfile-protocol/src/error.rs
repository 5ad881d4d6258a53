//! Wire error kinds.
//!
//! Errors crossing the plugin boundary carry an explicit kind tag so the
//! host can re-raise the original domain error instead of collapsing
//! everything into a generic transport failure.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Domain tag for an error returned by a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Local upload source does not exist.
    SourceNotFound,
    /// Retrieved bytes do not hash to the recorded checksum.
    HashMismatch,
    /// Sidecar record could not be parsed.
    MalformedRecord,
    /// The call was cancelled before completion.
    Cancelled,
    /// Failure inside the plugin's concrete backend.
    Backend,
    /// Plugin-internal fault (bad request payload, unsupported op).
    Internal,
}

impl ErrorKind {
    /// Stable string form used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SourceNotFound => "source_not_found",
            ErrorKind::HashMismatch => "hash_mismatch",
            ErrorKind::MalformedRecord => "malformed_record",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Backend => "backend",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured error payload carried in a failed [`PluginResponse`].
///
/// [`PluginResponse`]: crate::PluginResponse
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireError {
    /// Domain tag distinguishing backend errors from plugin faults.
    pub kind: ErrorKind,
    /// Single-line human-readable message.
    pub message: String,
    /// Machine-readable details (object path, expected/actual checksums)
    /// so the host can rebuild the original domain error.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl WireError {
    /// Build a wire error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    /// Attach a machine-readable detail.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Look up a detail by key.
    pub fn data(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}
