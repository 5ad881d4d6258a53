//! Directory-backend storage plugin.
//!
//! Reference plugin binary: serves a directory-backed store over the plugin
//! wire protocol. Hosts spawn it via `Options::plugin_address`; deployments
//! typically wrap it in a small launcher script that bakes in the flags.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use cfile::{DirBackend, Options, Toggle, TransferStore};
use cfile_plugin::serve;

#[derive(Parser)]
#[command(name = "cfile-dir-plugin")]
#[command(about = "cfile storage plugin backed by a local directory", version)]
struct Cli {
    /// Directory holding the stored objects
    #[arg(long)]
    backend: PathBuf,

    /// Sidecar filename extension
    #[arg(long)]
    extension: Option<String>,

    /// Namespace prefix for object keys
    #[arg(long)]
    prefix: Option<String>,

    /// Remove local object bytes after a successful upload
    #[arg(long)]
    delete_source: bool,
}

fn main() {
    let cli = Cli::parse();

    let mut options = Options::new(cli.backend.to_string_lossy().into_owned());
    if let Some(extension) = cli.extension {
        options = options.with_extension(extension);
    }
    if let Some(prefix) = cli.prefix {
        options = options.with_key_prefix(prefix);
    }
    if cli.delete_source {
        options = options.with_delete_source(Toggle::Enabled);
    }

    let backend = match DirBackend::open(&cli.backend) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("cfile-dir-plugin: cannot open backend directory: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = serve(TransferStore::new(backend, options)) {
        eprintln!("cfile-dir-plugin: {}", e);
        process::exit(1);
    }
}
