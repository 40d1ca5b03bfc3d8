//! Hash database.

use crate::store::{Snapshot, StoreCore};
use crate::error::ErrorCode;
use crate::traits::{delegate_core, limit, FlatDb, NativeDb, PrefixScan};
use crate::types::{tuned, BackendKind, NativeList, OpenMode, TuningFlags};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default bucket count.
pub const DEFAULT_BNUM: i64 = 131_071;
/// Default record alignment power.
pub const DEFAULT_APOW: i64 = 4;
/// Default free block pool power.
pub const DEFAULT_FPOW: i64 = 10;
/// Default extra mapped memory.
pub const DEFAULT_XMSIZ: i64 = 64 * 1024 * 1024;

/// Effective tuning of a [`HashDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashTuning {
    /// Bucket array size.
    pub bnum: i64,
    /// Record alignment, as a power of 2.
    pub apow: i64,
    /// Free block pool size, as a power of 2.
    pub fpow: i64,
    /// Option flags.
    pub opts: TuningFlags,
    /// Record cache size, 0 disables the cache.
    pub rcnum: i64,
    /// Extra mapped memory.
    pub xmsiz: i64,
    /// Auto defragmentation unit, 0 disables it.
    pub dfunit: i64,
}

impl Default for HashTuning {
    fn default() -> Self {
        Self {
            bnum: DEFAULT_BNUM,
            apow: DEFAULT_APOW,
            fpow: DEFAULT_FPOW,
            opts: TuningFlags::default(),
            rcnum: 0,
            xmsiz: DEFAULT_XMSIZ,
            dfunit: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct HashRecords(HashMap<Vec<u8>, Vec<u8>>);

impl Snapshot for HashRecords {
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

/// A hash database handle.
///
/// Iteration order is unspecified.
pub struct HashDb {
    core: StoreCore<HashRecords>,
    tuning: HashTuning,
}

impl HashDb {
    /// Sets bucket count, alignment, free block pool and option flags.
    ///
    /// Negative arguments keep the default. Only allowed before `open`.
    pub fn tune(&mut self, bnum: i64, apow: i64, fpow: i64, opts: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        let defaults = HashTuning::default();
        self.tuning.bnum = tuned(bnum, defaults.bnum);
        self.tuning.apow = tuned(apow, defaults.apow);
        self.tuning.fpow = tuned(fpow, defaults.fpow);
        self.tuning.opts = if opts < 0 {
            defaults.opts
        } else {
            TuningFlags::from_bits(opts)
        };
        true
    }

    /// Sets the record cache size. Only allowed before `open`.
    pub fn setcache(&mut self, rcnum: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.rcnum = tuned(rcnum, 0);
        true
    }

    /// Sets the extra mapped memory size. Only allowed before `open`.
    pub fn setxmsiz(&mut self, xmsiz: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.xmsiz = tuned(xmsiz, DEFAULT_XMSIZ);
        true
    }

    /// Sets the auto defragmentation unit. Only allowed before `open`.
    pub fn setdfunit(&mut self, dfunit: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.dfunit = tuned(dfunit, 0);
        true
    }

    /// Effective tuning.
    pub fn tuning(&self) -> HashTuning {
        self.tuning
    }

    /// Stores a record without waiting for it to reach the file.
    pub fn putasync(&mut self, key: &[u8], value: &[u8]) -> bool {
        self.put(key, value)
    }

    /// Rebuilds the database file with new tuning. Negative arguments keep
    /// the current setting.
    pub fn optimize(&mut self, bnum: i64, apow: i64, fpow: i64, opts: i64) -> bool {
        if !self.core.writable() {
            return false;
        }
        let current = self.tuning;
        self.tuning.bnum = tuned(bnum, current.bnum);
        self.tuning.apow = tuned(apow, current.apow);
        self.tuning.fpow = tuned(fpow, current.fpow);
        if opts >= 0 {
            self.tuning.opts = TuningFlags::from_bits(opts);
        }
        self.core.persist(false)
    }

    pub(crate) fn open_memory(&mut self, name: &str) -> bool {
        self.core.open_memory(name, HashRecords::default())
    }
}

impl NativeDb for HashDb {
    const KIND: BackendKind = BackendKind::KeyedStore;

    fn create() -> Self {
        Self {
            core: StoreCore::new(Self::KIND, HashRecords::default()),
            tuning: HashTuning::default(),
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> bool {
        self.core.open(path, mode, HashRecords::default())
    }

    delegate_core!();

    fn out(&mut self, key: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.0.remove(key).is_some() {
            true
        } else {
            self.core.fail(ErrorCode::NoRecord)
        }
    }

    fn vsiz(&mut self, key: &[u8]) -> i64 {
        if !self.core.readable() {
            return -1;
        }
        match self.core.data.0.get(key) {
            Some(value) => value.len() as i64,
            None => {
                self.core.fail(ErrorCode::NoRecord);
                -1
            }
        }
    }

    fn addint(&mut self, key: &[u8], num: i32) -> i32 {
        if !self.core.writable() {
            return i32::MIN;
        }
        let current = match self.core.data.0.get(key) {
            Some(value) => match <[u8; 4]>::try_from(value.as_slice()) {
                Ok(bytes) => i32::from_le_bytes(bytes),
                Err(_) => {
                    self.core.fail(ErrorCode::Keep);
                    return i32::MIN;
                }
            },
            None => 0,
        };
        let sum = current.wrapping_add(num);
        self.core.data.0.insert(key.to_vec(), sum.to_le_bytes().to_vec());
        sum
    }

    fn adddouble(&mut self, key: &[u8], num: f64) -> f64 {
        if !self.core.writable() {
            return f64::NAN;
        }
        let current = match self.core.data.0.get(key) {
            Some(value) => match <[u8; 8]>::try_from(value.as_slice()) {
                Ok(bytes) => f64::from_le_bytes(bytes),
                Err(_) => {
                    self.core.fail(ErrorCode::Keep);
                    return f64::NAN;
                }
            },
            None => 0.0,
        };
        let sum = current + num;
        self.core.data.0.insert(key.to_vec(), sum.to_le_bytes().to_vec());
        sum
    }
}

impl FlatDb for HashDb {
    fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        self.core.data.0.insert(key.to_vec(), value.to_vec());
        true
    }

    fn putkeep(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.0.contains_key(key) {
            return self.core.fail(ErrorCode::Keep);
        }
        self.core.data.0.insert(key.to_vec(), value.to_vec());
        true
    }

    fn putcat(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        self.core
            .data
            .0
            .entry(key.to_vec())
            .or_default()
            .extend_from_slice(value);
        true
    }

    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        if !self.core.readable() {
            return None;
        }
        match self.core.data.0.get(key) {
            Some(value) => Some(value.clone()),
            None => self.core.missing(),
        }
    }
}

impl PrefixScan for HashDb {
    fn fwmkeys(&mut self, prefix: &[u8], max: i64) -> NativeList {
        if !self.core.readable() {
            return NativeList::new();
        }
        let mut keys: Vec<Vec<u8>> = self
            .core
            .data
            .0
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        limit(keys.into_iter(), max)
    }
}
