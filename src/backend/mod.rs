//! Concrete backend adapters.
//!
//! Only the directory backend lives in-tree; cloud adapters are thin
//! call-throughs to vendor SDKs and plug in through the same
//! [`RemoteBackend`] trait, or out of process via the plugin bridge.
//!
//! [`RemoteBackend`]: crate::transfer::RemoteBackend

mod dir;

pub use dir::DirBackend;
