//! Configuration loading and merge.
//!
//! Three layers, later wins: built-in defaults, the repo config file
//! (`.cfile/config.toml` unless overridden), and CLI flags. The merged
//! result is one immutable [`Options`] value handed to store construction;
//! the core keeps no ambient configuration state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::store::{Options, Toggle, DEFAULT_METADATA_EXTENSION};

/// Default config file location, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".cfile/config.toml";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no backend address configured (set [store] backend or pass --backend)")]
    MissingBackend,
}

/// On-disk config file shape.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub store: StoreSection,
}

/// `[store]` section of the config file.
#[derive(Debug, Default, Deserialize)]
pub struct StoreSection {
    /// Backend address (bucket/container/directory).
    pub backend: Option<String>,
    /// Sidecar extension.
    pub extension: Option<String>,
    /// Backend locality hint.
    pub region: Option<String>,
    /// Remote key namespace prefix.
    pub prefix: Option<String>,
    /// Plugin executable path.
    pub plugin: Option<PathBuf>,
    /// Remove local object bytes after upload. Absent means unset.
    pub delete_source: Option<bool>,
}

impl ConfigFile {
    /// Load a config file. A missing file at the default location is an
    /// empty config; a missing file named explicitly is an error.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound && !explicit => {
                return Ok(Self::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// CLI-level overrides, the topmost merge layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<String>,
    pub extension: Option<String>,
    pub region: Option<String>,
    pub prefix: Option<String>,
    pub plugin: Option<PathBuf>,
    pub delete_source: Toggle,
}

/// Merge the layers into effective options.
///
/// A backend address is required unless a plugin is configured; a plugin
/// carries its own backend binding.
pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Options, ConfigError> {
    let section = file.store;

    let plugin = overrides.plugin.or(section.plugin);
    let backend = overrides.backend.or(section.backend);
    let backend = match (&backend, &plugin) {
        (Some(addr), _) => addr.clone(),
        (None, Some(_)) => String::new(),
        (None, None) => return Err(ConfigError::MissingBackend),
    };

    let delete_source = match overrides.delete_source {
        Toggle::Unset => Toggle::from(section.delete_source),
        explicit => explicit,
    };

    let mut options = Options::new(backend)
        .with_extension(
            overrides
                .extension
                .or(section.extension)
                .unwrap_or_else(|| DEFAULT_METADATA_EXTENSION.to_string()),
        )
        .with_delete_source(delete_source);
    if let Some(region) = overrides.region.or(section.region) {
        options = options.with_region(region);
    }
    if let Some(prefix) = overrides.prefix.or(section.prefix) {
        options = options.with_key_prefix(prefix);
    }
    if let Some(plugin) = plugin {
        options = options.with_plugin(plugin);
    }
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_default_config_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ConfigFile::load(&dir.path().join("nope.toml"), false).unwrap();
        assert!(cfg.store.backend.is_none());
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load(&dir.path().join("nope.toml"), true).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_file_values_flow_into_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[store]
backend = "/srv/objects"
extension = "big"
prefix = "assets"
delete_source = true
"#,
        )
        .unwrap();

        let cfg = ConfigFile::load(&path, true).unwrap();
        let options = resolve(cfg, Overrides::default()).unwrap();
        assert_eq!(options.backend_address, "/srv/objects");
        assert_eq!(options.metadata_file_extension, "big");
        assert_eq!(options.object_key_prefix.as_deref(), Some("assets"));
        assert_eq!(options.delete_source, Toggle::Enabled);
    }

    #[test]
    fn test_overrides_beat_file_values() {
        let file = ConfigFile {
            store: StoreSection {
                backend: Some("/from/file".to_string()),
                extension: Some("big".to_string()),
                delete_source: Some(true),
                ..Default::default()
            },
        };
        let overrides = Overrides {
            backend: Some("/from/flag".to_string()),
            delete_source: Toggle::Disabled,
            ..Default::default()
        };
        let options = resolve(file, overrides).unwrap();
        assert_eq!(options.backend_address, "/from/flag");
        assert_eq!(options.metadata_file_extension, "big");
        assert_eq!(options.delete_source, Toggle::Disabled);
    }

    #[test]
    fn test_backend_required_without_plugin() {
        let err = resolve(ConfigFile::default(), Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBackend));
    }

    #[test]
    fn test_plugin_alone_is_enough() {
        let overrides = Overrides {
            plugin: Some(PathBuf::from("/usr/lib/cfile/s3-plugin")),
            ..Default::default()
        };
        let options = resolve(ConfigFile::default(), overrides).unwrap();
        assert_eq!(
            options.plugin_address.as_deref(),
            Some(Path::new("/usr/lib/cfile/s3-plugin"))
        );
    }
}
