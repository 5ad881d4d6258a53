//! RPC response envelope.

use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// RPC response envelope, one JSON line on the plugin's stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Protocol version the response was produced under.
    pub protocol_version: i32,
    /// Echoed request ID for correlation.
    pub request_id: String,
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Operation-specific payload, present when `ok` is true and the op
    /// returns data (only `options` does).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Error details, present when `ok` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl PluginResponse {
    /// Build an acknowledgement with no payload.
    pub fn ack(protocol_version: i32, request_id: impl Into<String>) -> Self {
        Self {
            protocol_version,
            request_id: request_id.into(),
            ok: true,
            payload: None,
            error: None,
        }
    }

    /// Build a successful response carrying a payload.
    pub fn success(
        protocol_version: i32,
        request_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            protocol_version,
            request_id: request_id.into(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Build an error response.
    pub fn failure(
        protocol_version: i32,
        request_id: impl Into<String>,
        error: WireError,
    ) -> Self {
        Self {
            protocol_version,
            request_id: request_id.into(),
            ok: false,
            payload: None,
            error: Some(error),
        }
    }
}
