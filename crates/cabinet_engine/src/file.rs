//! Snapshot files.
//!
//! A database file holds one checksummed snapshot of the whole store:
//!
//! ```text
//! magic "CABINET\0" | kind u8 | version u8 | reserved [u8; 2]
//! payload length u64 LE | SHA-256 of payload [u8; 32] | CBOR payload
//! ```
//!
//! The file stays open for the lifetime of the handle so the advisory lock
//! taken at open time is held until close.

use crate::error::{EngineError, EngineResult};
use crate::types::{BackendKind, OpenMode};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// File magic.
pub(crate) const MAGIC: &[u8; 8] = b"CABINET\0";

/// Current snapshot format version.
pub(crate) const FORMAT_VERSION: u8 = 1;

/// Size of the fixed header preceding the payload.
pub(crate) const HEADER_LEN: usize = 8 + 1 + 1 + 2 + 8 + 32;

/// An open database file.
#[derive(Debug)]
pub(crate) struct DbFile {
    file: File,
    kind: BackendKind,
    locked: bool,
}

impl DbFile {
    /// Opens the file at `path` under `mode` and takes the advisory lock.
    ///
    /// Returns the file and whether it is empty (new or truncated).
    ///
    /// # Errors
    ///
    /// - `NotFound` I/O errors when the file is missing and `CREATE` is unset
    /// - [`EngineError::Locked`] when `LOCK_NON_BLOCKING` is set and another
    ///   handle holds a conflicting lock
    pub fn open(path: &Path, kind: BackendKind, mode: OpenMode) -> EngineResult<(Self, bool)> {
        let writer = mode.is_writer();
        let file = OpenOptions::new()
            .read(true)
            .write(writer)
            .create(writer && mode.contains(OpenMode::CREATE))
            .truncate(false)
            .open(path)?;

        let locked = !mode.contains(OpenMode::NO_LOCK);
        if locked {
            let non_blocking = mode.contains(OpenMode::LOCK_NON_BLOCKING);
            let result = match (writer, non_blocking) {
                (true, true) => FileExt::try_lock_exclusive(&file),
                (true, false) => FileExt::lock_exclusive(&file),
                (false, true) => FileExt::try_lock_shared(&file),
                (false, false) => FileExt::lock_shared(&file),
            };
            if result.is_err() {
                return Err(EngineError::Locked);
            }
        }

        // Truncation happens under the lock so a concurrent reader never
        // sees a half-written file.
        if writer && mode.contains(OpenMode::TRUNCATE) {
            file.set_len(0)?;
        }

        let empty = file.metadata()?.len() == 0;
        Ok((
            Self {
                file,
                kind,
                locked,
            },
            empty,
        ))
    }

    /// Current file size in bytes.
    pub fn size(&self) -> EngineResult<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Reads and validates the snapshot.
    pub fn read<D: DeserializeOwned>(&mut self) -> EngineResult<D> {
        let mut bytes = Vec::new();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut bytes)?;
        decode(self.kind, &bytes)
    }

    /// Replaces the file contents with a snapshot of `data`.
    pub fn write<D: Serialize>(&mut self, data: &D, fsync: bool) -> EngineResult<()> {
        let bytes = encode(self.kind, data)?;
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&bytes)?;
        self.file.flush()?;
        if fsync {
            self.file.sync_all()?;
        }
        Ok(())
    }

    /// Releases the lock and closes the file.
    pub fn close(self) -> EngineResult<()> {
        if self.locked {
            FileExt::unlock(&self.file)?;
        }
        Ok(())
    }
}

/// Writes a standalone snapshot to `path`, replacing any existing file.
pub(crate) fn write_snapshot_to<D: Serialize>(
    path: &Path,
    kind: BackendKind,
    data: &D,
) -> EngineResult<()> {
    let bytes = encode(kind, data)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Encodes `data` into a complete snapshot image.
pub(crate) fn encode<D: Serialize>(kind: BackendKind, data: &D) -> EngineResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(data, &mut payload).map_err(|e| EngineError::Codec(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(MAGIC);
    bytes.push(kind.tag());
    bytes.push(FORMAT_VERSION);
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&Sha256::digest(&payload));
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Validates a snapshot image and decodes its payload.
pub(crate) fn decode<D: DeserializeOwned>(kind: BackendKind, bytes: &[u8]) -> EngineResult<D> {
    if bytes.len() < HEADER_LEN {
        return Err(EngineError::BadHeader(format!(
            "file too short: {} bytes",
            bytes.len()
        )));
    }
    if &bytes[..8] != MAGIC {
        return Err(EngineError::BadHeader("bad magic".into()));
    }
    if bytes[8] != kind.tag() {
        return Err(EngineError::BadHeader(format!(
            "kind mismatch: expected {}, found {}",
            kind.tag(),
            bytes[8]
        )));
    }
    if bytes[9] != FORMAT_VERSION {
        return Err(EngineError::BadHeader(format!(
            "unsupported format version {}",
            bytes[9]
        )));
    }

    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[12..20]);
    let len = u64::from_le_bytes(len);
    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != len {
        return Err(EngineError::BadHeader(format!(
            "payload length mismatch: header says {len}, found {}",
            payload.len()
        )));
    }
    if Sha256::digest(payload).as_slice() != &bytes[20..HEADER_LEN] {
        return Err(EngineError::Checksum);
    }

    ciborium::from_reader(payload).map_err(|e| EngineError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    type Data = BTreeMap<Vec<u8>, Vec<u8>>;

    fn sample() -> Data {
        let mut data = Data::new();
        data.insert(b"k".to_vec(), b"v\0w".to_vec());
        data
    }

    #[test]
    fn encode_decode() {
        let bytes = encode(BackendKind::KeyedStore, &sample()).unwrap();
        assert_eq!(&bytes[..8], MAGIC);
        let back: Data = decode(BackendKind::KeyedStore, &bytes).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn corrupted_payload_is_meta_error() {
        let mut bytes = encode(BackendKind::KeyedStore, &sample()).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = decode::<Data>(BackendKind::KeyedStore, &bytes).unwrap_err();
        assert!(matches!(err, EngineError::Checksum));
        assert_eq!(err.code(), ErrorCode::Meta);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let bytes = encode(BackendKind::KeyedStore, &sample()).unwrap();
        let err = decode::<Data>(BackendKind::OrderedStore, &bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Meta);
    }

    #[test]
    fn truncated_file_is_rejected() {
        let bytes = encode(BackendKind::KeyedStore, &sample()).unwrap();
        let err = decode::<Data>(BackendKind::KeyedStore, &bytes[..bytes.len() - 2]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Meta);
        let err = decode::<Data>(BackendKind::KeyedStore, b"CAB").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Meta);
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.kv");
        let mode = OpenMode::WRITER | OpenMode::CREATE;

        let (mut file, empty) = DbFile::open(&path, BackendKind::KeyedStore, mode).unwrap();
        assert!(empty);
        file.write(&sample(), false).unwrap();
        assert!(file.size().unwrap() > HEADER_LEN as u64);
        let back: Data = file.read().unwrap();
        assert_eq!(back, sample());
        file.close().unwrap();
    }

    #[test]
    fn reader_on_missing_file_fails() {
        let dir = tempdir().unwrap();
        let err = DbFile::open(
            &dir.path().join("absent"),
            BackendKind::KeyedStore,
            OpenMode::READER,
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoFile);
    }

    #[test]
    fn non_blocking_lock_conflict() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.kv");
        let mode = OpenMode::WRITER | OpenMode::CREATE | OpenMode::LOCK_NON_BLOCKING;

        let (first, _) = DbFile::open(&path, BackendKind::KeyedStore, mode).unwrap();
        let err = DbFile::open(&path, BackendKind::KeyedStore, mode).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Lock);

        first.close().unwrap();
        assert!(DbFile::open(&path, BackendKind::KeyedStore, mode).is_ok());
    }

    #[test]
    fn no_lock_allows_sharing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.kv");
        let mode = OpenMode::WRITER | OpenMode::CREATE | OpenMode::NO_LOCK;

        let (_first, _) = DbFile::open(&path, BackendKind::KeyedStore, mode).unwrap();
        assert!(DbFile::open(&path, BackendKind::KeyedStore, mode).is_ok());
    }
}
