//! Directory-backed storage.
//!
//! Binds `backend_address` to a local directory and stores each object as a
//! plain file under its remote key. Useful on its own for network mounts and
//! as the reference backend for the test suite.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::store::StoreError;
use crate::transfer::{PutOutcome, RemoteBackend};

/// Copy chunk size; the token is checked once per chunk.
const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// A [`RemoteBackend`] rooted at a directory.
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    /// Open a backend rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl RemoteBackend for DirBackend {
    /// Writes refuse to clobber: an existing key is left untouched and
    /// reported as [`PutOutcome::AlreadyExists`].
    fn put(
        &mut self,
        ctx: &CancelToken,
        key: &str,
        src: &mut dyn Read,
    ) -> Result<PutOutcome, StoreError> {
        let dest_path = self.key_path(key);
        if dest_path.exists() {
            return Ok(PutOutcome::AlreadyExists);
        }
        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage next to the destination, promote on completion. A failed or
        // cancelled transfer leaves no remote key behind.
        let staging = staging_path(&dest_path);
        let result = copy_cancellable(ctx, src, &staging);
        match result {
            Ok(()) => {
                fs::rename(&staging, &dest_path)?;
                Ok(PutOutcome::Stored)
            }
            Err(err) => {
                let _ = fs::remove_file(&staging);
                Err(err)
            }
        }
    }

    fn get(
        &mut self,
        ctx: &CancelToken,
        key: &str,
        dest: &mut dyn Write,
    ) -> Result<(), StoreError> {
        let src_path = self.key_path(key);
        let mut src = File::open(&src_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::Backend {
                    message: format!("no object under key {:?}", key),
                }
            } else {
                StoreError::Io(e)
            }
        })?;

        let mut buf = [0u8; COPY_CHUNK_BYTES];
        loop {
            ctx.check()?;
            let n = src.read(&mut buf)?;
            if n == 0 {
                return Ok(());
            }
            dest.write_all(&buf[..n])?;
        }
    }

    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{}.part", file_name))
}

fn copy_cancellable(ctx: &CancelToken, src: &mut dyn Read, dest: &Path) -> Result<(), StoreError> {
    let mut out = File::create(dest)?;
    let mut buf = [0u8; COPY_CHUNK_BYTES];
    loop {
        ctx.check()?;
        let n = src.read(&mut buf)?;
        if n == 0 {
            out.sync_all()?;
            return Ok(());
        }
        out.write_all(&buf[..n])?;
    }
}
