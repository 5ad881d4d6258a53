//! cfile plugin wire protocol.
//!
//! Defines the handshake and the JSON RPC envelope spoken between a cfile
//! host and a storage plugin subprocess. The transport is newline-delimited
//! JSON over the child's stdin/stdout: the plugin emits one handshake line,
//! then answers one response line per request line.

pub mod error;
pub mod handshake;
pub mod ops;
pub mod request;
pub mod response;

pub use error::{ErrorKind, WireError};
pub use handshake::Handshake;
pub use request::{PluginOp, PluginRequest};
pub use response::PluginResponse;

/// Protocol version spoken by this implementation. A plugin announcing any
/// other version is rejected during the handshake.
pub const PROTOCOL_VERSION: i32 = 1;

/// Shared magic cookie. A plugin must echo this value in its handshake line;
/// it guards against accidentally executing a binary that is not a cfile
/// plugin at all.
pub const MAGIC_COOKIE: &str = "d5a1f2c8-cfile-store-plugin";
