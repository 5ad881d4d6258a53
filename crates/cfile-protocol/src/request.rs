//! RPC request envelope.

use serde::{Deserialize, Serialize};

/// Operations a plugin must serve, mirroring the `Store` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginOp {
    /// Transfer local objects to the backend, writing sidecars.
    Upload,
    /// Materialize and verify objects named by sidecar paths.
    Retrieve,
    /// Report the options the plugin's store was bound with.
    Options,
    /// Release the plugin's transport and stop serving.
    Close,
}

/// RPC request envelope, one JSON line on the plugin's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    /// Protocol version negotiated during the handshake.
    pub protocol_version: i32,
    /// Operation to perform.
    pub op: PluginOp,
    /// Host-chosen ID echoed back for correlation.
    pub request_id: String,
    /// Operation-specific payload, see [`crate::ops`].
    #[serde(default)]
    pub payload: serde_json::Value,
}
