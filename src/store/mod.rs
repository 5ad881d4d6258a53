//! The store capability contract.
//!
//! [`Store`] is the uniform surface every backend satisfies: the local
//! directory adapter, any cloud adapter, and the plugin bridge all expose
//! exactly these four operations. Callers never learn which one they hold.

mod error;

pub use error::StoreError;

use std::path::PathBuf;

use cfile_protocol::ops::OptionsPayload;

use crate::cancel::CancelToken;

/// Default sidecar filename extension.
pub const DEFAULT_METADATA_EXTENSION: &str = "cfile";

/// Tri-state option toggle.
///
/// Distinguishes "caller said nothing" from an explicit choice, so default
/// resolution is a visible, testable step instead of a nullable boolean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Toggle {
    /// No explicit choice was made; resolution falls back to the default.
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl Toggle {
    /// Collapse to a boolean, using `default` when unset.
    pub fn resolve(self, default: bool) -> bool {
        match self {
            Toggle::Unset => default,
            Toggle::Enabled => true,
            Toggle::Disabled => false,
        }
    }
}

impl From<Option<bool>> for Toggle {
    fn from(value: Option<bool>) -> Self {
        match value {
            None => Toggle::Unset,
            Some(true) => Toggle::Enabled,
            Some(false) => Toggle::Disabled,
        }
    }
}

impl From<Toggle> for Option<bool> {
    fn from(value: Toggle) -> Self {
        match value {
            Toggle::Unset => None,
            Toggle::Enabled => Some(true),
            Toggle::Disabled => Some(false),
        }
    }
}

/// Backend configuration, immutable for the lifetime of a store instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// URI-like address of the bucket/container/directory holding objects.
    pub backend_address: String,
    /// Suffix appended to an object's name to name its sidecar.
    pub metadata_file_extension: String,
    /// Optional backend locality hint.
    pub region: Option<String>,
    /// Optional namespace prefix applied to remote keys.
    pub object_key_prefix: Option<String>,
    /// Path to an executable implementing the plugin protocol. When set,
    /// built-in backend selection is bypassed.
    pub plugin_address: Option<PathBuf>,
    /// Whether to remove local object bytes after a successful upload,
    /// leaving only the sidecar. Resolves to disabled when unset.
    pub delete_source: Toggle,
}

impl Options {
    /// Options for the given backend address, everything else defaulted.
    pub fn new(backend_address: impl Into<String>) -> Self {
        Self {
            backend_address: backend_address.into(),
            metadata_file_extension: DEFAULT_METADATA_EXTENSION.to_string(),
            region: None,
            object_key_prefix: None,
            plugin_address: None,
            delete_source: Toggle::Unset,
        }
    }

    /// Set the sidecar extension.
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.metadata_file_extension = ext.into();
        self
    }

    /// Set the remote key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.object_key_prefix = Some(prefix.into());
        self
    }

    /// Set the region hint.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the plugin executable path.
    pub fn with_plugin(mut self, plugin: impl Into<PathBuf>) -> Self {
        self.plugin_address = Some(plugin.into());
        self
    }

    /// Set the delete-source toggle.
    pub fn with_delete_source(mut self, toggle: Toggle) -> Self {
        self.delete_source = toggle;
        self
    }

    /// Remote key for an object name: `prefix + "/" + name` when a prefix
    /// is configured, the bare name otherwise.
    pub fn remote_key(&self, name: &str) -> String {
        match &self.object_key_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}/{}", prefix, name),
            _ => name.to_string(),
        }
    }
}

impl From<&Options> for OptionsPayload {
    fn from(options: &Options) -> Self {
        OptionsPayload {
            backend_address: options.backend_address.clone(),
            metadata_file_extension: options.metadata_file_extension.clone(),
            region: options.region.clone(),
            object_key_prefix: options.object_key_prefix.clone(),
            plugin_address: options
                .plugin_address
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            delete_source: options.delete_source.into(),
        }
    }
}

impl From<OptionsPayload> for Options {
    fn from(payload: OptionsPayload) -> Self {
        Options {
            backend_address: payload.backend_address,
            metadata_file_extension: payload.metadata_file_extension,
            region: payload.region,
            object_key_prefix: payload.object_key_prefix,
            plugin_address: payload.plugin_address.map(PathBuf::from),
            delete_source: payload.delete_source.into(),
        }
    }
}

/// Capability contract every backend implements.
///
/// One instance serves one command invocation: construct, run one or more
/// upload/retrieve calls sequentially, then close. Calling upload or
/// retrieve after close fails fast with [`StoreError::Closed`].
pub trait Store {
    /// Transfer each local object to the backend and ensure its sidecar
    /// exists. Paths are processed in order; the first failure aborts the
    /// remainder. Re-uploading an unchanged object is a no-op success.
    fn upload(&mut self, ctx: &CancelToken, paths: &[PathBuf]) -> Result<(), StoreError>;

    /// For each sidecar path, materialize the corresponding object locally
    /// and verify its hash against the record, deleting the object on any
    /// mismatch. Paths are processed in order, fail-fast.
    fn retrieve(&mut self, ctx: &CancelToken, sidecar_paths: &[PathBuf]) -> Result<(), StoreError>;

    /// The options this store was bound with. Takes `&mut self` because a
    /// plugin-backed store answers this over its RPC channel.
    fn options(&mut self) -> Result<Options, StoreError>;

    /// Release the transport. Safe to call more than once.
    fn close(&mut self) -> Result<(), StoreError>;
}
