//! Object fingerprints and sidecar records.
//!
//! A fingerprint is the `{name, checksum, date_modified}` tuple computed
//! from an object's bytes before transfer. It is serialized as the sidecar
//! record that lives in the working tree in place of the object. The
//! encoding is deterministic (fixed field order, one-space indent) so
//! unchanged objects produce byte-identical sidecars and minimal diffs.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Chunk size for streaming hash computation.
const HASH_CHUNK_BYTES: usize = 8192;

/// Errors parsing a sidecar record.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("checksum is not a 64-character lowercase hex string: {found:?}")]
    BadChecksum { found: String },
}

/// Fingerprint of one tracked object.
///
/// Field order is the wire order of the sidecar record; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFingerprint {
    /// Logical object name (the file name).
    pub name: String,
    /// Lowercase hex SHA-256 of the object bytes.
    pub checksum: String,
    /// Object modification time, RFC3339.
    pub date_modified: DateTime<Utc>,
}

impl ObjectFingerprint {
    /// Compute a fingerprint by streaming `reader` through SHA-256.
    ///
    /// Memory use is constant regardless of object size. The reader is
    /// consumed; callers who need the bytes again must reopen the source.
    pub fn from_reader<R: Read>(
        name: impl Into<String>,
        modified: DateTime<Utc>,
        reader: &mut R,
    ) -> io::Result<Self> {
        let mut hasher = Sha256::new();
        let mut buf = [0u8; HASH_CHUNK_BYTES];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self {
            name: name.into(),
            checksum: hex::encode(hasher.finalize()),
            date_modified: modified,
        })
    }

    /// Compute a fingerprint for a file on disk, taking the name from the
    /// final path component and the timestamp from filesystem metadata.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = fs::metadata(path)?;
        let modified = DateTime::<Utc>::from(metadata.modified()?);
        let mut file = File::open(path)?;
        Self::from_reader(name, modified, &mut file)
    }

    /// Serialize the sidecar record: fixed field order, one leading space
    /// per nesting level, no trailing newline.
    pub fn to_record_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        // Serializing a struct of plain strings and a timestamp cannot fail.
        self.serialize(&mut ser)
            .expect("fingerprint serialization is infallible");
        out
    }

    /// Parse a sidecar record, rejecting missing fields and checksums that
    /// are not exactly 64 lowercase hex characters.
    pub fn from_record_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let fp: Self = serde_json::from_slice(bytes)?;
        if !is_valid_checksum(&fp.checksum) {
            return Err(RecordError::BadChecksum {
                found: fp.checksum,
            });
        }
        Ok(fp)
    }
}

/// Whether `s` is a well-formed lowercase hex SHA-256 digest.
pub fn is_valid_checksum(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Derive the sidecar path for an object: `object + "." + ext`.
pub fn sidecar_path(object: &Path, ext: &str) -> PathBuf {
    let mut s = object.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// Recover the object path from a sidecar path by removing exactly one
/// trailing `"." + ext`. Returns `None` when the suffix is absent, so a
/// mis-named input is an error at the caller rather than a silent trim.
pub fn object_path(sidecar: &Path, ext: &str) -> Option<PathBuf> {
    let s = sidecar.to_str()?;
    let stripped = s.strip_suffix(ext)?.strip_suffix('.')?;
    if stripped.is_empty() {
        return None;
    }
    Some(PathBuf::from(stripped))
}

/// Atomically persist a serialized record: write to a dot-tmp file in the
/// same directory, then rename over the destination. Either the complete
/// record exists or none does.
pub fn write_record(fp: &ObjectFingerprint, sidecar: &Path) -> io::Result<()> {
    let dir = sidecar.parent().unwrap_or_else(|| Path::new("."));
    let file_name = sidecar
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dir.join(format!(".{}.tmp", file_name));
    {
        let mut f = File::create(&tmp)?;
        f.write_all(&fp.to_record_bytes())?;
        f.sync_all()?;
    }
    fs::rename(&tmp, sidecar)
}

/// Read and parse a sidecar record from disk.
pub fn read_record(sidecar: &Path) -> io::Result<Result<ObjectFingerprint, RecordError>> {
    let bytes = fs::read(sidecar)?;
    Ok(ObjectFingerprint::from_record_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const BLAH_SHA256: &str = "8b7df143d91c716ecfa5fc1730022f6b421b05cedee8fd52b1fc65a96030ad52";

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_checksum_of_known_vector() {
        let mut bytes: &[u8] = b"blah";
        let fp = ObjectFingerprint::from_reader("thing", fixed_time(), &mut bytes).unwrap();
        assert_eq!(fp.checksum, BLAH_SHA256);
        assert_eq!(fp.name, "thing");
    }

    #[test]
    fn test_record_bytes_exact_layout() {
        let mut bytes: &[u8] = b"blah";
        let fp = ObjectFingerprint::from_reader("thing", fixed_time(), &mut bytes).unwrap();
        let record = String::from_utf8(fp.to_record_bytes()).unwrap();
        let expected = format!(
            "{{\n \"name\": \"thing\",\n \"checksum\": \"{}\",\n \"date_modified\": \"2024-05-01T12:00:00Z\"\n}}",
            BLAH_SHA256
        );
        assert_eq!(record, expected);
    }

    #[test]
    fn test_record_round_trip() {
        let mut bytes: &[u8] = b"some larger content that still hashes fine";
        let fp = ObjectFingerprint::from_reader("data.bin", fixed_time(), &mut bytes).unwrap();
        let back = ObjectFingerprint::from_record_bytes(&fp.to_record_bytes()).unwrap();
        assert_eq!(back, fp);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        let err = ObjectFingerprint::from_record_bytes(b"{\"name\": \"x\"}");
        assert!(matches!(err, Err(RecordError::Json(_))));
    }

    #[test]
    fn test_parse_rejects_short_checksum() {
        let json = r#"{"name": "x", "checksum": "abc123", "date_modified": "2024-05-01T12:00:00Z"}"#;
        let err = ObjectFingerprint::from_record_bytes(json.as_bytes());
        assert!(matches!(err, Err(RecordError::BadChecksum { .. })));
    }

    #[test]
    fn test_parse_rejects_uppercase_hex() {
        let upper = BLAH_SHA256.to_uppercase();
        let json = format!(
            "{{\"name\": \"x\", \"checksum\": \"{upper}\", \"date_modified\": \"2024-05-01T12:00:00Z\"}}"
        );
        let err = ObjectFingerprint::from_record_bytes(json.as_bytes());
        assert!(matches!(err, Err(RecordError::BadChecksum { .. })));
    }

    #[test]
    fn test_sidecar_path_round_trip() {
        let object = Path::new("dir/thing");
        let sidecar = sidecar_path(object, "cfile");
        assert_eq!(sidecar, Path::new("dir/thing.cfile"));
        assert_eq!(object_path(&sidecar, "cfile").unwrap(), object);
    }

    #[test]
    fn test_sidecar_path_object_already_ends_with_extension() {
        // An object literally named "thing.cfile" gets "thing.cfile.cfile";
        // stripping must remove exactly one suffix, not both.
        let object = Path::new("thing.cfile");
        let sidecar = sidecar_path(object, "cfile");
        assert_eq!(sidecar, Path::new("thing.cfile.cfile"));
        assert_eq!(object_path(&sidecar, "cfile").unwrap(), object);
    }

    #[test]
    fn test_object_path_rejects_non_sidecar() {
        assert!(object_path(Path::new("thing"), "cfile").is_none());
        assert!(object_path(Path::new("thingcfile"), "cfile").is_none());
        assert!(object_path(Path::new(".cfile"), "cfile").is_none());
    }

    #[test]
    fn test_write_record_atomic_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let sidecar = dir.path().join("thing.cfile");
        let mut bytes: &[u8] = b"blah";
        let fp = ObjectFingerprint::from_reader("thing", fixed_time(), &mut bytes).unwrap();

        write_record(&fp, &sidecar).unwrap();
        assert!(!dir.path().join(".thing.cfile.tmp").exists());
        let back = read_record(&sidecar).unwrap().unwrap();
        assert_eq!(back, fp);
    }
}
