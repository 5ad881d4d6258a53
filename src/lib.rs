//! cfile - large binaries in source control without their bytes.
//!
//! Each tracked object is replaced by a small sidecar record (name, SHA-256
//! checksum, modification time); the bytes live in a pluggable backend. This
//! crate implements the content-integrity upload/retrieve protocol, the
//! uniform [`Store`] contract, a directory backend, and the bridge that
//! promotes an out-of-process plugin to a first-class store.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod fingerprint;
pub mod plugin;
pub mod store;
pub mod transfer;

pub use backend::DirBackend;
pub use cancel::CancelToken;
pub use fingerprint::ObjectFingerprint;
pub use plugin::PluggableStore;
pub use store::{Options, Store, StoreError, Toggle};
pub use transfer::{PutOutcome, RemoteBackend, TransferStore};

/// Build a store for the given options: the plugin bridge when
/// `plugin_address` is set, the directory backend otherwise.
///
/// The caller owns the store for the scope of one command and must close it.
pub fn open_store(options: Options) -> Result<Box<dyn Store>, StoreError> {
    if options.plugin_address.is_some() {
        return Ok(Box::new(PluggableStore::connect(options)?));
    }
    let backend = DirBackend::open(&options.backend_address)?;
    Ok(Box::new(TransferStore::new(backend, options)))
}
