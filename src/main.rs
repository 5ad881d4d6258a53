//! cfile CLI.
//!
//! Entry point for the `cfile` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use cfile::config::{self, ConfigFile, Overrides, DEFAULT_CONFIG_PATH};
use cfile::{open_store, CancelToken, Store, StoreError, Toggle};

/// Exit code when a run is cancelled by signal.
const EXIT_CODE_CANCELLED: i32 = 80;

#[derive(Parser)]
#[command(name = "cfile")]
#[command(about = "Track large binaries through sidecar fingerprints", version)]
struct Cli {
    /// Path to the config file (default: .cfile/config.toml)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Backend address (bucket, container, or directory)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Sidecar filename extension
    #[arg(long, global = true)]
    extension: Option<String>,

    /// Namespace prefix for remote keys
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Backend locality hint
    #[arg(long, global = true)]
    region: Option<String>,

    /// Path to a storage plugin executable
    #[arg(long, global = true)]
    plugin: Option<PathBuf>,

    /// Remove local object bytes after a successful upload
    #[arg(long, global = true, conflicts_with = "keep_source")]
    delete_source: bool,

    /// Keep local object bytes after upload (overrides config)
    #[arg(long, global = true)]
    keep_source: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload objects to the backend and write their sidecars
    Upload {
        /// Object paths, processed in order
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Materialize and verify objects named by sidecar paths
    Retrieve {
        /// Sidecar paths, processed in order
        #[arg(required = true)]
        sidecar_paths: Vec<PathBuf>,
    },

    /// Print the effective store options
    Options,
}

fn main() {
    let cli = Cli::parse();

    let token = CancelToken::new();
    if let Err(e) = token.install_signal_handler() {
        eprintln!("cfile: failed to install signal handler: {}", e);
        process::exit(1);
    }

    match run(cli, &token) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("cfile: {}", err);
            let code = if cancelled(err.as_ref()) {
                EXIT_CODE_CANCELLED
            } else {
                1
            };
            process::exit(code);
        }
    }
}

fn run(cli: Cli, token: &CancelToken) -> Result<(), Box<dyn std::error::Error>> {
    let (config_path, explicit) = match &cli.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let file = ConfigFile::load(&config_path, explicit)?;

    let delete_source = if cli.delete_source {
        Toggle::Enabled
    } else if cli.keep_source {
        Toggle::Disabled
    } else {
        Toggle::Unset
    };
    let options = config::resolve(
        file,
        Overrides {
            backend: cli.backend,
            extension: cli.extension,
            region: cli.region,
            prefix: cli.prefix,
            plugin: cli.plugin,
            delete_source,
        },
    )?;

    let mut store = open_store(options)?;
    let result = match cli.command {
        Commands::Upload { paths } => store.upload(token, &paths),
        Commands::Retrieve { sidecar_paths } => store.retrieve(token, &sidecar_paths),
        Commands::Options => store.options().map(|options| {
            println!("backend:   {}", options.backend_address);
            println!("extension: {}", options.metadata_file_extension);
            if let Some(region) = &options.region {
                println!("region:    {}", region);
            }
            if let Some(prefix) = &options.object_key_prefix {
                println!("prefix:    {}", prefix);
            }
            if let Some(plugin) = &options.plugin_address {
                println!("plugin:    {}", plugin.display());
            }
            println!(
                "delete_source: {}",
                match Option::<bool>::from(options.delete_source) {
                    None => "unset (resolves to disabled)".to_string(),
                    Some(v) => v.to_string(),
                }
            );
        }),
    };

    // Close regardless of the command outcome; the original error wins.
    let closed = store.close();
    result?;
    closed?;
    Ok(())
}

fn cancelled(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::Cancelled)) {
            return true;
        }
        current = e.source();
    }
    false
}
