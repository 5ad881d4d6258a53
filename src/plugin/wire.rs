//! Mapping between [`StoreError`] and the wire error tags.
//!
//! The server side lowers domain errors into tagged wire errors with
//! machine-readable details; the host side rebuilds the original domain
//! error from the tag so callers match on the same variants whether the
//! store runs in-process or behind the bridge.

use std::path::PathBuf;

use cfile_protocol::{ErrorKind, WireError};

use crate::store::StoreError;

/// Lower a domain error onto the wire.
pub fn error_to_wire(err: &StoreError) -> WireError {
    match err {
        StoreError::SourceNotFound { path } => {
            WireError::new(ErrorKind::SourceNotFound, err.to_string())
                .with_data("path", path.to_string_lossy().into_owned())
        }
        StoreError::HashMismatch {
            path,
            expected,
            actual,
        } => WireError::new(ErrorKind::HashMismatch, err.to_string())
            .with_data("path", path.to_string_lossy().into_owned())
            .with_data("expected", expected.clone())
            .with_data("actual", actual.clone()),
        StoreError::MalformedRecord { path, reason } => {
            WireError::new(ErrorKind::MalformedRecord, err.to_string())
                .with_data("path", path.to_string_lossy().into_owned())
                .with_data("reason", reason.clone())
        }
        StoreError::Cancelled => WireError::new(ErrorKind::Cancelled, err.to_string()),
        // Aggregated cleanup failures keep the original error's tag; the
        // message already carries both causes.
        StoreError::CleanupFailed { original, .. } => {
            let mut wire = error_to_wire(original);
            wire.message = err.to_string();
            wire
        }
        StoreError::Backend { .. } | StoreError::Io(_) => {
            WireError::new(ErrorKind::Backend, err.to_string())
        }
        // Session-management errors have no business escaping a plugin;
        // if one does, report it as a plugin fault.
        StoreError::SpawnFailed { .. }
        | StoreError::HandshakeFailed { .. }
        | StoreError::Transport { .. }
        | StoreError::Closed => WireError::new(ErrorKind::Internal, err.to_string()),
    }
}

/// Re-raise a wire error as the original domain error. Falls back to a
/// backend error when the structured details did not survive the trip.
pub fn error_from_wire(wire: &WireError) -> StoreError {
    match wire.kind {
        ErrorKind::SourceNotFound => match wire.data("path") {
            Some(path) => StoreError::SourceNotFound {
                path: PathBuf::from(path),
            },
            None => fallback(wire),
        },
        ErrorKind::HashMismatch => {
            match (wire.data("path"), wire.data("expected"), wire.data("actual")) {
                (Some(path), Some(expected), Some(actual)) => StoreError::HashMismatch {
                    path: PathBuf::from(path),
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                },
                _ => fallback(wire),
            }
        }
        ErrorKind::MalformedRecord => match wire.data("path") {
            Some(path) => StoreError::MalformedRecord {
                path: PathBuf::from(path),
                reason: wire.data("reason").unwrap_or(&wire.message).to_string(),
            },
            None => fallback(wire),
        },
        ErrorKind::Cancelled => StoreError::Cancelled,
        ErrorKind::Backend | ErrorKind::Internal => fallback(wire),
    }
}

fn fallback(wire: &WireError) -> StoreError {
    StoreError::Backend {
        message: format!("plugin reported: {}", wire),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_mismatch_survives_round_trip() {
        let original = StoreError::HashMismatch {
            path: PathBuf::from("dir/thing"),
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let wire = error_to_wire(&original);
        assert_eq!(wire.kind, ErrorKind::HashMismatch);

        match error_from_wire(&wire) {
            StoreError::HashMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path, PathBuf::from("dir/thing"));
                assert_eq!(expected, "aa".repeat(32));
                assert_eq!(actual, "bb".repeat(32));
            }
            other => panic!("expected HashMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_source_not_found_survives_round_trip() {
        let original = StoreError::SourceNotFound {
            path: PathBuf::from("a.bin"),
        };
        let wire = error_to_wire(&original);
        assert!(matches!(
            error_from_wire(&wire),
            StoreError::SourceNotFound { path } if path == PathBuf::from("a.bin")
        ));
    }

    #[test]
    fn test_cleanup_failure_keeps_original_kind() {
        let original = StoreError::SourceNotFound {
            path: PathBuf::from("a.bin"),
        }
        .with_cleanup_failure(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let wire = error_to_wire(&original);
        assert_eq!(wire.kind, ErrorKind::SourceNotFound);
        assert!(wire.message.contains("denied"));
    }

    #[test]
    fn test_missing_details_fall_back_to_backend() {
        let wire = WireError::new(ErrorKind::HashMismatch, "checksum differs");
        assert!(matches!(
            error_from_wire(&wire),
            StoreError::Backend { .. }
        ));
    }

    #[test]
    fn test_io_maps_to_backend_kind() {
        let original = StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(error_to_wire(&original).kind, ErrorKind::Backend);
    }
}
