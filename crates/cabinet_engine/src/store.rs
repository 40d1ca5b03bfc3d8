//! Handle state shared by every store kind.
//!
//! [`StoreCore`] owns the open file, the in-memory records, the transaction
//! snapshot, the iterator and the sticky error code. Each store type wraps
//! one and adds its own record layout on top.

use crate::error::{EngineError, ErrorCode};
use crate::file::{self, DbFile};
use crate::types::{BackendKind, OpenMode};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Files held open by some handle in this process.
static OPEN_PATHS: LazyLock<Mutex<HashSet<PathBuf>>> = LazyLock::new(Default::default);

/// Entry in [`OPEN_PATHS`], removed on drop.
struct PathClaim(PathBuf);

impl PathClaim {
    /// Claims `path`, or returns `None` if another handle holds it.
    fn acquire(path: &Path) -> Option<Self> {
        let key = resolve(path);
        OPEN_PATHS.lock().insert(key.clone()).then(|| Self(key))
    }
}

impl Drop for PathClaim {
    fn drop(&mut self) {
        OPEN_PATHS.lock().remove(&self.0);
    }
}

/// Absolute form of `path`, following symlinks where the file or its
/// directory already exists.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(full) = path.canonicalize() {
        return full;
    }
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .and_then(|dir| dir.canonicalize().ok());
    match (parent, path.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
    }
}

/// In-memory record layout of a store, persisted as one snapshot.
pub(crate) trait Snapshot: Serialize + DeserializeOwned + Clone + Send + 'static {
    /// Removes every record, keeping layout settings.
    fn clear(&mut self);

    /// Number of records.
    fn record_count(&self) -> u64;

    /// Keys in iteration order.
    fn keys(&self) -> Vec<Vec<u8>>;
}

enum Backing {
    File(DbFile),
    Memory,
}

struct OpenState {
    backing: Backing,
    claim: Option<PathClaim>,
    mode: OpenMode,
    path: String,
}

/// Open/close lifecycle, transactions, iteration and the error code.
pub(crate) struct StoreCore<D: Snapshot> {
    kind: BackendKind,
    ecode: ErrorCode,
    state: Option<OpenState>,
    /// Live records.
    pub data: D,
    tran: Option<D>,
    dirty: bool,
    iter: Option<std::vec::IntoIter<Vec<u8>>>,
}

impl<D: Snapshot> StoreCore<D> {
    /// Creates a closed core.
    pub fn new(kind: BackendKind, data: D) -> Self {
        Self {
            kind,
            ecode: ErrorCode::Success,
            state: None,
            data,
            tran: None,
            dirty: false,
            iter: None,
        }
    }

    /// Last recorded error code.
    pub fn ecode(&self) -> ErrorCode {
        self.ecode
    }

    /// Records `code` and returns false.
    pub fn fail(&mut self, code: ErrorCode) -> bool {
        self.ecode = code;
        false
    }

    /// Returns true while a file or memory backing is attached.
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Returns true if the handle was opened as a writer.
    pub fn is_writer(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.mode.is_writer())
    }

    /// Opens the file at `path`. `fresh` becomes the contents of a new file.
    pub fn open(&mut self, path: &str, mode: OpenMode, fresh: D) -> bool {
        if self.state.is_some() || path.is_empty() {
            return self.fail(ErrorCode::Invalid);
        }

        let Some(claim) = PathClaim::acquire(Path::new(path)) else {
            debug!(kind = %self.kind, path, "file already open in this process");
            return self.fail(ErrorCode::Thread);
        };

        let (mut file, empty) = match DbFile::open(Path::new(path), self.kind, mode) {
            Ok(opened) => opened,
            Err(e) => {
                debug!(kind = %self.kind, path, error = %e, "open failed");
                return self.fail(e.code());
            }
        };

        let data = if empty {
            if !mode.is_writer() {
                return self.fail(ErrorCode::Meta);
            }
            if let Err(e) = file.write(&fresh, mode.contains(OpenMode::SYNC_ON_TRANSACTION)) {
                warn!(kind = %self.kind, path, error = %e, "failed to write initial snapshot");
                return self.fail(write_code(&e));
            }
            fresh
        } else {
            match file.read::<D>() {
                Ok(data) => data,
                Err(e) => {
                    debug!(kind = %self.kind, path, error = %e, "snapshot rejected");
                    return self.fail(e.code());
                }
            }
        };

        self.data = data;
        self.state = Some(OpenState {
            backing: Backing::File(file),
            claim: Some(claim),
            mode,
            path: path.to_string(),
        });
        self.dirty = false;
        debug!(kind = %self.kind, path, ?mode, records = self.data.record_count(), "store opened");
        true
    }

    /// Attaches a memory-only backing that is never persisted.
    pub fn open_memory(&mut self, name: &str, fresh: D) -> bool {
        if self.state.is_some() {
            return self.fail(ErrorCode::Invalid);
        }
        self.data = fresh;
        self.state = Some(OpenState {
            backing: Backing::Memory,
            claim: None,
            mode: OpenMode::WRITER | OpenMode::CREATE,
            path: name.to_string(),
        });
        self.dirty = false;
        debug!(kind = %self.kind, name, "memory store opened");
        true
    }

    /// Closes the handle, aborting any open transaction and persisting
    /// pending writes.
    pub fn close(&mut self) -> bool {
        let Some(state) = self.state.take() else {
            return self.fail(ErrorCode::Invalid);
        };

        if let Some(before) = self.tran.take() {
            self.data = before;
        }

        let mut ok = true;
        if let Backing::File(mut file) = state.backing {
            if state.mode.is_writer() && self.dirty {
                if let Err(e) = file.write(&self.data, false) {
                    warn!(kind = %self.kind, path = %state.path, error = %e, "failed to persist on close");
                    ok = self.fail(write_code(&e));
                }
            }
            if let Err(e) = file.close() {
                warn!(kind = %self.kind, path = %state.path, error = %e, "failed to release file");
                ok = self.fail(ErrorCode::Close);
            }
        }

        self.data.clear();
        self.dirty = false;
        self.iter = None;
        debug!(kind = %self.kind, path = %state.path, "store closed");
        ok
    }

    /// Checks that the handle is open, recording `EINVALID` otherwise.
    pub fn readable(&mut self) -> bool {
        if self.is_open() {
            true
        } else {
            self.fail(ErrorCode::Invalid)
        }
    }

    /// Checks that the handle is open as a writer and marks it dirty.
    pub fn writable(&mut self) -> bool {
        if self.is_writer() {
            self.dirty = true;
            true
        } else {
            self.fail(ErrorCode::Invalid)
        }
    }

    /// Writes the live records to the backing file.
    ///
    /// Inside a transaction this is deferred to commit.
    pub fn persist(&mut self, fsync: bool) -> bool {
        if self.tran.is_some() {
            return true;
        }
        let Some(state) = self.state.as_mut() else {
            return self.fail(ErrorCode::Invalid);
        };
        if let Backing::File(file) = &mut state.backing {
            if let Err(e) = file.write(&self.data, fsync) {
                warn!(kind = %self.kind, path = %state.path, error = %e, "failed to persist snapshot");
                return self.fail(write_code(&e));
            }
        }
        self.dirty = false;
        true
    }

    /// Flushes pending writes and the file itself.
    pub fn sync(&mut self) -> bool {
        if !self.writable() {
            return false;
        }
        if self.tran.is_some() {
            return true;
        }
        self.persist(true)
    }

    /// Removes every record.
    pub fn vanish(&mut self) -> bool {
        if !self.writable() {
            return false;
        }
        self.data.clear();
        self.iter = None;
        self.persist(false)
    }

    /// Writes a snapshot of the live records to `path`.
    pub fn copy(&mut self, path: &str) -> bool {
        if !self.readable() {
            return false;
        }
        if path.is_empty() {
            return self.fail(ErrorCode::Invalid);
        }
        match file::write_snapshot_to(Path::new(path), self.kind, &self.data) {
            Ok(()) => true,
            Err(e) => {
                warn!(kind = %self.kind, path, error = %e, "copy failed");
                let code = match e {
                    EngineError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                        ErrorCode::NoFile
                    }
                    ref other => write_code(other),
                };
                self.fail(code)
            }
        }
    }

    /// Begins a transaction.
    pub fn tranbegin(&mut self) -> bool {
        if !self.writable() {
            return false;
        }
        if self.tran.is_some() {
            return self.fail(ErrorCode::Invalid);
        }
        self.tran = Some(self.data.clone());
        true
    }

    /// Commits the open transaction.
    pub fn trancommit(&mut self) -> bool {
        if !self.writable() {
            return false;
        }
        if self.tran.take().is_none() {
            return self.fail(ErrorCode::Invalid);
        }
        let fsync = self
            .state
            .as_ref()
            .is_some_and(|s| s.mode.contains(OpenMode::SYNC_ON_TRANSACTION));
        self.persist(fsync)
    }

    /// Aborts the open transaction, restoring the records it started from.
    pub fn tranabort(&mut self) -> bool {
        if !self.writable() {
            return false;
        }
        match self.tran.take() {
            Some(before) => {
                self.data = before;
                self.iter = None;
                true
            }
            None => self.fail(ErrorCode::Invalid),
        }
    }

    /// Path or name the handle was opened with.
    pub fn path(&self) -> Option<String> {
        self.state.as_ref().map(|s| s.path.clone())
    }

    /// Number of records, 0 when closed.
    pub fn rnum(&self) -> u64 {
        if self.is_open() {
            self.data.record_count()
        } else {
            0
        }
    }

    /// Size of the backing file, or of the encoded records for memory
    /// stores. 0 when closed.
    pub fn fsiz(&self) -> u64 {
        match self.state.as_ref().map(|s| &s.backing) {
            Some(Backing::File(file)) => file.size().unwrap_or(0),
            Some(Backing::Memory) => file::encode(self.kind, &self.data)
                .map(|b| b.len() as u64)
                .unwrap_or(0),
            None => 0,
        }
    }

    /// Starts iteration over the current keys.
    pub fn iterinit(&mut self) -> bool {
        if !self.readable() {
            return false;
        }
        self.iter = Some(self.data.keys().into_iter());
        true
    }

    /// Returns the next key of the iteration, or `None` with `ENOREC`.
    pub fn iternext(&mut self) -> Option<Vec<u8>> {
        if !self.readable() {
            return None;
        }
        match self.iter.as_mut().and_then(Iterator::next) {
            Some(key) => Some(key),
            None => {
                self.fail(ErrorCode::NoRecord);
                None
            }
        }
    }

    /// Records `ENOREC` and returns `None`.
    pub fn missing<T>(&mut self) -> Option<T> {
        self.fail(ErrorCode::NoRecord);
        None
    }
}

impl<D: Snapshot> Drop for StoreCore<D> {
    fn drop(&mut self) {
        if self.is_open() && !self.close() {
            warn!(kind = %self.kind, code = self.ecode.code(), "close on drop failed");
        }
    }
}

fn write_code(e: &EngineError) -> ErrorCode {
    match e {
        EngineError::Io(_) => ErrorCode::Write,
        other => other.code(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Plain(BTreeMap<Vec<u8>, Vec<u8>>);

    impl Snapshot for Plain {
        fn clear(&mut self) {
            self.0.clear();
        }

        fn record_count(&self) -> u64 {
            self.0.len() as u64
        }

        fn keys(&self) -> Vec<Vec<u8>> {
            self.0.keys().cloned().collect()
        }
    }

    fn core() -> StoreCore<Plain> {
        StoreCore::new(BackendKind::KeyedStore, Plain::default())
    }

    fn rw() -> OpenMode {
        OpenMode::WRITER | OpenMode::CREATE
    }

    #[test]
    fn empty_path_is_invalid() {
        let mut core = core();
        assert!(!core.open("", rw(), Plain::default()));
        assert_eq!(core.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn double_open_is_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let path = path.to_str().unwrap();
        let mut core = core();
        assert!(core.open(path, rw(), Plain::default()));
        assert!(!core.open(path, rw(), Plain::default()));
        assert_eq!(core.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn second_handle_on_open_file_is_refused() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let path = path.to_str().unwrap();

        let mut writer = core();
        assert!(writer.open(path, rw(), Plain::default()));
        let mut reader = core();
        assert!(!reader.open(path, OpenMode::READER, Plain::default()));
        assert_eq!(reader.ecode(), ErrorCode::Thread);

        let dotted = dir.path().join(".").join("a.kv");
        assert!(!reader.open(dotted.to_str().unwrap(), OpenMode::READER, Plain::default()));
        assert_eq!(reader.ecode(), ErrorCode::Thread);

        assert!(writer.close());
        assert!(reader.open(path, OpenMode::READER, Plain::default()));
        assert!(!writer.open(path, rw(), Plain::default()));
        assert_eq!(writer.ecode(), ErrorCode::Thread);
    }

    #[test]
    fn dropping_a_handle_releases_its_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let path = path.to_str().unwrap();

        let mut first = core();
        assert!(first.open(path, rw(), Plain::default()));
        drop(first);

        let mut second = core();
        assert!(second.open(path, rw(), Plain::default()));
    }

    #[test]
    fn failed_open_releases_its_claim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let path = path.to_str().unwrap();

        let mut core = core();
        assert!(!core.open(path, OpenMode::READER, Plain::default()));
        assert_eq!(core.ecode(), ErrorCode::NoFile);
        assert!(core.open(path, rw(), Plain::default()));
    }

    #[test]
    fn close_twice() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let mut core = core();
        assert!(core.open(path.to_str().unwrap(), rw(), Plain::default()));
        assert!(core.close());
        assert!(!core.close());
        assert_eq!(core.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let path = path.to_str().unwrap();

        let mut core = core();
        assert!(core.open(path, rw(), Plain::default()));
        assert!(core.writable());
        core.data.0.insert(b"k".to_vec(), b"v".to_vec());
        assert!(core.close());

        assert!(core.open(path, OpenMode::READER, Plain::default()));
        assert_eq!(core.rnum(), 1);
        assert!(!core.writable());
        assert_eq!(core.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn transaction_abort_restores() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let mut core = core();
        assert!(core.open(path.to_str().unwrap(), rw(), Plain::default()));

        assert!(core.tranbegin());
        assert!(!core.tranbegin());
        assert!(core.writable());
        core.data.0.insert(b"k".to_vec(), b"v".to_vec());
        assert!(core.tranabort());
        assert_eq!(core.rnum(), 0);
        assert!(!core.trancommit());
    }

    #[test]
    fn iteration_ends_with_norec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.kv");
        let mut core = core();
        assert!(core.open(path.to_str().unwrap(), rw(), Plain::default()));
        core.data.0.insert(b"a".to_vec(), b"1".to_vec());

        assert!(core.iterinit());
        assert_eq!(core.iternext(), Some(b"a".to_vec()));
        assert_eq!(core.iternext(), None);
        assert_eq!(core.ecode(), ErrorCode::NoRecord);
    }

    #[test]
    fn copy_writes_readable_snapshot() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.kv");
        let dst = dir.path().join("b.kv");
        let mut core = core();
        assert!(core.open(src.to_str().unwrap(), rw(), Plain::default()));
        assert!(core.writable());
        core.data.0.insert(b"x".to_vec(), b"y".to_vec());
        assert!(core.copy(dst.to_str().unwrap()));

        let mut other = self::core();
        assert!(other.open(dst.to_str().unwrap(), OpenMode::READER, Plain::default()));
        assert_eq!(other.rnum(), 1);
    }

    #[test]
    fn closed_store_reports_zero() {
        let mut core = core();
        assert_eq!(core.rnum(), 0);
        assert_eq!(core.fsiz(), 0);
        assert_eq!(core.path(), None);
        assert!(!core.iterinit());
        assert_eq!(core.ecode(), ErrorCode::Invalid);
    }
}
