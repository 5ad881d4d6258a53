//! Upload/retrieve orchestrator.
//!
//! [`TransferStore`] layers the content-integrity protocol over any raw
//! [`RemoteBackend`]. Hashing happens client-side on both paths, so the
//! backend is never trusted: a byzantine backend (corrupt bytes, wrong
//! object) is detected and refused rather than accepted.
//!
//! Upload, per object, strict order: open source, fingerprint the unmodified
//! bytes, persist the sidecar, reopen and transfer. On transfer failure the
//! sidecar is deleted again so a sidecar never outlives its upload.
//!
//! Retrieve, per sidecar: parse the record, fetch only when no non-empty
//! local object exists, hash, compare. On mismatch the local object is
//! deleted before the error returns; no caller ever observes a file that
//! claims presence but fails integrity.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::cancel::CancelToken;
use crate::fingerprint::{self, ObjectFingerprint};
use crate::store::{Options, Store, StoreError};

/// Outcome of a raw backend write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The bytes were written under the key.
    Stored,
    /// The key already existed and the backend left it untouched. Treated
    /// as success by the orchestrator: backends that can check existence
    /// skip the write, backends that cannot simply overwrite and report
    /// [`PutOutcome::Stored`].
    AlreadyExists,
}

/// Raw transfer primitives a concrete backend provides.
///
/// Implementations stream in chunks and honor the cancel token between
/// chunks. A backend may parallelize a single large transfer internally;
/// that concurrency is opaque here.
pub trait RemoteBackend {
    /// Write the reader's bytes under `key`.
    fn put(
        &mut self,
        ctx: &CancelToken,
        key: &str,
        src: &mut dyn Read,
    ) -> Result<PutOutcome, StoreError>;

    /// Stream the bytes stored under `key` into `dest`.
    fn get(
        &mut self,
        ctx: &CancelToken,
        key: &str,
        dest: &mut dyn Write,
    ) -> Result<(), StoreError>;

    /// Release the transport.
    fn close(&mut self) -> Result<(), StoreError>;
}

/// A [`Store`] built from a raw backend plus the integrity protocol.
pub struct TransferStore<B: RemoteBackend> {
    backend: B,
    options: Options,
    closed: bool,
}

impl<B: RemoteBackend> TransferStore<B> {
    /// Bind a backend and options into a store.
    pub fn new(backend: B, options: Options) -> Self {
        Self {
            backend,
            options,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn upload_one(&mut self, ctx: &CancelToken, path: &Path) -> Result<(), StoreError> {
        ctx.check()?;

        let mut source = open_source(path)?;
        let modified = DateTime::<Utc>::from(source.metadata()?.modified()?);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fp = ObjectFingerprint::from_reader(name, modified, &mut source)?;
        drop(source);

        let sidecar = fingerprint::sidecar_path(path, &self.options.metadata_file_extension);
        fingerprint::write_record(&fp, &sidecar)?;

        // The hashing pass consumed the stream; reopen for the transfer.
        let transferred = ctx.check().and_then(|_| {
            let mut source = open_source(path)?;
            let key = self.options.remote_key(&fp.name);
            self.backend.put(ctx, &key, &mut source).map(|_| ())
        });

        if let Err(err) = transferred {
            // The sidecar written above must not outlive the failed upload.
            return Err(match fs::remove_file(&sidecar) {
                Ok(()) => err,
                Err(cleanup) => err.with_cleanup_failure(cleanup),
            });
        }

        if self.options.delete_source.resolve(false) {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn retrieve_one(&mut self, ctx: &CancelToken, sidecar: &Path) -> Result<(), StoreError> {
        ctx.check()?;

        let ext = &self.options.metadata_file_extension;
        let object = fingerprint::object_path(sidecar, ext).ok_or_else(|| {
            StoreError::MalformedRecord {
                path: sidecar.to_path_buf(),
                reason: format!("path does not end with \".{}\"", ext),
            }
        })?;

        // Parse the record before any network traffic: an unparseable
        // sidecar must never cause an unverifiable object to appear.
        let record = fingerprint::read_record(sidecar)?.map_err(|e| StoreError::MalformedRecord {
            path: sidecar.to_path_buf(),
            reason: e.to_string(),
        })?;

        // A non-empty local object skips the fetch; its content is trusted
        // only until the verification below.
        let present = fs::metadata(&object).map(|m| m.len() > 0).unwrap_or(false);
        let fetched = if present {
            false
        } else {
            self.fetch_object(ctx, &record, &object)?;
            true
        };

        let actual = match hash_file(&object) {
            Ok(digest) => digest,
            Err(err) => {
                // A fetched object that was never verified must not remain.
                if fetched {
                    return Err(match fs::remove_file(&object) {
                        Ok(()) => err,
                        Err(cleanup) => err.with_cleanup_failure(cleanup),
                    });
                }
                return Err(err);
            }
        };

        if actual != record.checksum {
            let err = StoreError::HashMismatch {
                path: object.clone(),
                expected: record.checksum,
                actual,
            };
            return Err(match fs::remove_file(&object) {
                Ok(()) => err,
                Err(cleanup) => err.with_cleanup_failure(cleanup),
            });
        }
        Ok(())
    }

    /// Fetch remote bytes into the object location, deleting the partial
    /// file on any failure (including cancellation).
    fn fetch_object(
        &mut self,
        ctx: &CancelToken,
        record: &ObjectFingerprint,
        object: &Path,
    ) -> Result<(), StoreError> {
        let key = self.options.remote_key(&record.name);
        let result = (|| -> Result<(), StoreError> {
            let mut dest = File::create(object)?;
            self.backend.get(ctx, &key, &mut dest)?;
            dest.sync_all()?;
            Ok(())
        })();

        if let Err(err) = result {
            return Err(match fs::remove_file(object) {
                Ok(()) => err,
                Err(cleanup) if cleanup.kind() == std::io::ErrorKind::NotFound => err,
                Err(cleanup) => err.with_cleanup_failure(cleanup),
            });
        }
        Ok(())
    }
}

impl<B: RemoteBackend> Store for TransferStore<B> {
    fn upload(&mut self, ctx: &CancelToken, paths: &[PathBuf]) -> Result<(), StoreError> {
        self.ensure_open()?;
        for path in paths {
            self.upload_one(ctx, path)?;
        }
        Ok(())
    }

    fn retrieve(&mut self, ctx: &CancelToken, sidecar_paths: &[PathBuf]) -> Result<(), StoreError> {
        self.ensure_open()?;
        for sidecar in sidecar_paths {
            self.retrieve_one(ctx, sidecar)?;
        }
        Ok(())
    }

    fn options(&mut self) -> Result<Options, StoreError> {
        self.ensure_open()?;
        Ok(self.options.clone())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.backend.close()
    }
}

/// Open an upload source, mapping a missing file to the domain error.
fn open_source(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Io(e)
        }
    })
}

/// Lowercase hex SHA-256 of a file's current contents.
fn hash_file(path: &Path) -> Result<String, StoreError> {
    let fp = ObjectFingerprint::from_path(path)?;
    Ok(fp.checksum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal in-memory backend for contract-level tests. The integration
    /// suite carries a richer mock with failure injection.
    #[derive(Default)]
    struct MemBackend {
        objects: HashMap<String, Vec<u8>>,
    }

    impl RemoteBackend for MemBackend {
        fn put(
            &mut self,
            ctx: &CancelToken,
            key: &str,
            src: &mut dyn Read,
        ) -> Result<PutOutcome, StoreError> {
            ctx.check()?;
            if self.objects.contains_key(key) {
                return Ok(PutOutcome::AlreadyExists);
            }
            let mut bytes = Vec::new();
            src.read_to_end(&mut bytes)?;
            self.objects.insert(key.to_string(), bytes);
            Ok(PutOutcome::Stored)
        }

        fn get(
            &mut self,
            ctx: &CancelToken,
            key: &str,
            dest: &mut dyn Write,
        ) -> Result<(), StoreError> {
            ctx.check()?;
            let bytes = self.objects.get(key).ok_or_else(|| StoreError::Backend {
                message: format!("no object under key {:?}", key),
            })?;
            dest.write_all(bytes)?;
            Ok(())
        }

        fn close(&mut self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn mem_store() -> TransferStore<MemBackend> {
        TransferStore::new(MemBackend::default(), Options::new("mem://test"))
    }

    #[test]
    fn test_upload_missing_source_is_domain_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = mem_store();
        let missing = dir.path().join("absent.bin");

        let err = store
            .upload(&CancelToken::new(), &[missing.clone()])
            .unwrap_err();
        assert!(matches!(err, StoreError::SourceNotFound { path } if path == missing));
    }

    #[test]
    fn test_calls_after_close_fail_fast() {
        let mut store = mem_store();
        store.close().unwrap();
        // Idempotent.
        store.close().unwrap();

        let ctx = CancelToken::new();
        assert!(matches!(
            store.upload(&ctx, &[]).unwrap_err(),
            StoreError::Closed
        ));
        assert!(matches!(
            store.retrieve(&ctx, &[]).unwrap_err(),
            StoreError::Closed
        ));
        assert!(matches!(store.options().unwrap_err(), StoreError::Closed));
    }

    #[test]
    fn test_cancelled_upload_leaves_no_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let object = dir.path().join("thing");
        fs::write(&object, b"blah").unwrap();

        let mut store = mem_store();
        let ctx = CancelToken::new();
        ctx.cancel();

        let err = store.upload(&ctx, &[object.clone()]).unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
        assert!(!dir.path().join("thing.cfile").exists());
    }

    #[test]
    fn test_retrieve_rejects_non_sidecar_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = mem_store();
        let err = store
            .retrieve(&CancelToken::new(), &[dir.path().join("thing")])
            .unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { .. }));
    }
}
