//! Plugin handshake line.
//!
//! Before serving any RPC, a plugin writes a single line to stdout:
//!
//!   cfile|<protocol_version>|<magic_cookie>
//!
//! The host validates both fields against its compile-time constants and
//! kills the subprocess on any mismatch.

use crate::{MAGIC_COOKIE, PROTOCOL_VERSION};

/// Leading field identifying a handshake line.
const HANDSHAKE_TAG: &str = "cfile";

/// Parsed handshake announcement from a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Protocol version the plugin speaks.
    pub protocol_version: i32,
    /// Magic cookie the plugin was built with.
    pub cookie: String,
}

impl Handshake {
    /// The handshake this implementation emits and expects.
    pub fn current() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            cookie: MAGIC_COOKIE.to_string(),
        }
    }

    /// Render the handshake line, without a trailing newline.
    pub fn to_line(&self) -> String {
        format!("{}|{}|{}", HANDSHAKE_TAG, self.protocol_version, self.cookie)
    }

    /// Parse a handshake line. Returns `None` when the line is not a
    /// well-formed handshake; field validation is the caller's job.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.trim_end().splitn(3, '|');
        if fields.next()? != HANDSHAKE_TAG {
            return None;
        }
        let protocol_version = fields.next()?.parse().ok()?;
        let cookie = fields.next()?.to_string();
        Some(Self {
            protocol_version,
            cookie,
        })
    }

    /// Whether this announcement matches the host's expectations.
    pub fn matches_current(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION && self.cookie == MAGIC_COOKIE
    }
}
