//! Capability traits implemented by the store types.
//!
//! Bindings are written once against these traits and instantiated per
//! store kind.

use crate::error::ErrorCode;
use crate::types::{BackendKind, NativeList, OpenMode};

/// Operations every store handle supports.
///
/// Failures never surface as `Result`: mutators return `false`, lookups
/// return `None`, and [`NativeDb::ecode`] reports why.
pub trait NativeDb: Send + 'static {
    /// Which handle kind this is.
    const KIND: BackendKind;

    /// Allocates a closed handle. No I/O is performed.
    fn create() -> Self
    where
        Self: Sized;

    /// Last recorded error code.
    fn ecode(&self) -> ErrorCode;

    /// Opens the database at `path`.
    fn open(&mut self, path: &str, mode: OpenMode) -> bool;

    /// Closes the database. Fails with `EINVALID` when not open.
    fn close(&mut self) -> bool;

    /// Persists pending writes and syncs the file.
    fn sync(&mut self) -> bool;

    /// Removes every record.
    fn vanish(&mut self) -> bool;

    /// Writes a copy of the database to `path`.
    fn copy(&mut self, path: &str) -> bool;

    /// Begins a transaction.
    fn tranbegin(&mut self) -> bool;

    /// Commits the current transaction.
    fn trancommit(&mut self) -> bool;

    /// Aborts the current transaction.
    fn tranabort(&mut self) -> bool;

    /// Path of the open database.
    fn path(&self) -> Option<String>;

    /// Number of records.
    fn rnum(&self) -> u64;

    /// Size of the database file in bytes.
    fn fsiz(&self) -> u64;

    /// Removes the record at `key`.
    fn out(&mut self, key: &[u8]) -> bool;

    /// Size of the value at `key`, or -1 when missing.
    fn vsiz(&mut self, key: &[u8]) -> i64;

    /// Starts key iteration.
    fn iterinit(&mut self) -> bool;

    /// Next key of the iteration.
    fn iternext(&mut self) -> Option<Vec<u8>>;

    /// Adds `num` to the integer stored at `key`.
    ///
    /// Returns the new value, or `i32::MIN` when the record is not an
    /// integer.
    fn addint(&mut self, key: &[u8], num: i32) -> i32;

    /// Adds `num` to the double stored at `key`.
    ///
    /// Returns the new value, or NaN when the record is not a double.
    fn adddouble(&mut self, key: &[u8], num: f64) -> f64;
}

/// Stores whose values are plain byte strings.
pub trait FlatDb: NativeDb {
    /// Stores `value`, overwriting any existing record.
    fn put(&mut self, key: &[u8], value: &[u8]) -> bool;

    /// Stores `value` unless the key exists (`EKEEP`).
    fn putkeep(&mut self, key: &[u8], value: &[u8]) -> bool;

    /// Appends `value` to the existing record.
    fn putcat(&mut self, key: &[u8], value: &[u8]) -> bool;

    /// Fetches the value at `key`.
    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>>;
}

/// Stores that can list keys by prefix.
pub trait PrefixScan: NativeDb {
    /// Keys starting with `prefix`, at most `max` of them (negative means
    /// unlimited).
    fn fwmkeys(&mut self, prefix: &[u8], max: i64) -> NativeList;
}

/// Implements the lifecycle half of [`NativeDb`] by forwarding to a
/// `core: StoreCore<_>` field.
macro_rules! delegate_core {
    () => {
        fn ecode(&self) -> $crate::error::ErrorCode {
            self.core.ecode()
        }

        fn close(&mut self) -> bool {
            self.core.close()
        }

        fn sync(&mut self) -> bool {
            self.core.sync()
        }

        fn vanish(&mut self) -> bool {
            self.core.vanish()
        }

        fn copy(&mut self, path: &str) -> bool {
            self.core.copy(path)
        }

        fn tranbegin(&mut self) -> bool {
            self.core.tranbegin()
        }

        fn trancommit(&mut self) -> bool {
            self.core.trancommit()
        }

        fn tranabort(&mut self) -> bool {
            self.core.tranabort()
        }

        fn path(&self) -> Option<String> {
            self.core.path()
        }

        fn rnum(&self) -> u64 {
            self.core.rnum()
        }

        fn fsiz(&self) -> u64 {
            self.core.fsiz()
        }

        fn iterinit(&mut self) -> bool {
            self.core.iterinit()
        }

        fn iternext(&mut self) -> Option<Vec<u8>> {
            self.core.iternext()
        }
    };
}

pub(crate) use delegate_core;

/// Truncates a result list to `max` entries; negative means unlimited.
pub(crate) fn limit<T>(items: impl Iterator<Item = T>, max: i64) -> Vec<T> {
    match usize::try_from(max) {
        Ok(max) => items.take(max).collect(),
        Err(_) => items.collect(),
    }
}
