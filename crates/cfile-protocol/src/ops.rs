//! Operation-specific payload types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Payload for the `upload` op: local object paths to transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadArgs {
    /// Object paths, processed in order.
    pub paths: Vec<String>,
}

/// Payload for the `retrieve` op.
///
/// Alongside the sidecar paths the host sends the records it already parsed,
/// keyed by sidecar path, so the plugin can cross-check without trusting its
/// own reread of the working tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveArgs {
    /// Sidecar paths, processed in order.
    pub sidecar_paths: Vec<String>,
    /// Parsed fingerprint records keyed by sidecar path.
    #[serde(default)]
    pub fingerprints: BTreeMap<String, WireFingerprint>,
}

/// Fingerprint record as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFingerprint {
    /// Logical object name.
    pub name: String,
    /// Lowercase hex SHA-256 of the object bytes.
    pub checksum: String,
    /// RFC3339 modification timestamp.
    pub date_modified: String,
}

/// Payload for a successful `options` response, mirroring the host-side
/// options struct field for field. `delete_source` is tri-state: absent means
/// unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsPayload {
    /// Backend address the plugin's store is bound to.
    pub backend_address: String,
    /// Sidecar filename extension.
    pub metadata_file_extension: String,
    /// Optional backend locality hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Optional namespace prefix for remote keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key_prefix: Option<String>,
    /// Plugin executable path, echoed for introspection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_address: Option<String>,
    /// Whether to remove local objects after upload; absent = unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_source: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieve_args_fingerprints_optional() {
        let json = r#"{"sidecar_paths": ["a.bin.cfile"]}"#;
        let args: RetrieveArgs = serde_json::from_str(json).unwrap();
        assert!(args.fingerprints.is_empty());
    }

    #[test]
    fn test_options_payload_omits_unset_fields() {
        let json = serde_json::to_string(&OptionsPayload {
            backend_address: "/srv/objects".to_string(),
            metadata_file_extension: "cfile".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(!json.contains("region"));
        assert!(!json.contains("delete_source"));
    }
}
