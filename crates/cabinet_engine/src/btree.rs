//! B+tree database.
//!
//! Keys are kept in byte order and each key may hold several duplicate
//! values, in insertion order.

use crate::store::{Snapshot, StoreCore};
use crate::error::ErrorCode;
use crate::traits::{delegate_core, limit, FlatDb, NativeDb, PrefixScan};
use crate::types::{tuned, BackendKind, NativeList, OpenMode, TuningFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

/// Default members per leaf page.
pub const DEFAULT_LMEMB: i64 = 128;
/// Default members per non-leaf page.
pub const DEFAULT_NMEMB: i64 = 256;
/// Default bucket count.
pub const DEFAULT_BNUM: i64 = 32_749;
/// Default record alignment power.
pub const DEFAULT_APOW: i64 = 8;
/// Default free block pool power.
pub const DEFAULT_FPOW: i64 = 10;
/// Default leaf page cache size.
pub const DEFAULT_LCNUM: i64 = 1024;
/// Default non-leaf page cache size.
pub const DEFAULT_NCNUM: i64 = 512;

/// Effective tuning of a [`BTreeDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeTuning {
    /// Members per leaf page.
    pub lmemb: i64,
    /// Members per non-leaf page.
    pub nmemb: i64,
    /// Bucket array size.
    pub bnum: i64,
    /// Record alignment, as a power of 2.
    pub apow: i64,
    /// Free block pool size, as a power of 2.
    pub fpow: i64,
    /// Option flags.
    pub opts: TuningFlags,
    /// Leaf page cache size.
    pub lcnum: i64,
    /// Non-leaf page cache size.
    pub ncnum: i64,
    /// Extra mapped memory.
    pub xmsiz: i64,
    /// Auto defragmentation unit.
    pub dfunit: i64,
}

impl Default for TreeTuning {
    fn default() -> Self {
        Self {
            lmemb: DEFAULT_LMEMB,
            nmemb: DEFAULT_NMEMB,
            bnum: DEFAULT_BNUM,
            apow: DEFAULT_APOW,
            fpow: DEFAULT_FPOW,
            opts: TuningFlags::default(),
            lcnum: DEFAULT_LCNUM,
            ncnum: DEFAULT_NCNUM,
            xmsiz: 0,
            dfunit: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TreeRecords(pub(crate) BTreeMap<Vec<u8>, Vec<Vec<u8>>>);

impl Snapshot for TreeRecords {
    fn clear(&mut self) {
        self.0.clear();
    }

    fn record_count(&self) -> u64 {
        self.0.values().map(|v| v.len() as u64).sum()
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        self.0
            .iter()
            .flat_map(|(k, vs)| std::iter::repeat(k.clone()).take(vs.len()))
            .collect()
    }
}

/// A B+tree database handle.
pub struct BTreeDb {
    pub(crate) core: StoreCore<TreeRecords>,
    tuning: TreeTuning,
}

impl BTreeDb {
    /// Sets page geometry, buckets, alignment, free block pool and flags.
    ///
    /// Negative arguments keep the default. Only allowed before `open`.
    pub fn tune(
        &mut self,
        lmemb: i64,
        nmemb: i64,
        bnum: i64,
        apow: i64,
        fpow: i64,
        opts: i64,
    ) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        let defaults = TreeTuning::default();
        self.tuning.lmemb = tuned(lmemb, defaults.lmemb);
        self.tuning.nmemb = tuned(nmemb, defaults.nmemb);
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

    /// Sets the leaf and non-leaf page cache sizes. Only allowed before
    /// `open`.
    pub fn setcache(&mut self, lcnum: i64, ncnum: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.lcnum = tuned(lcnum, DEFAULT_LCNUM);
        self.tuning.ncnum = tuned(ncnum, DEFAULT_NCNUM);
        true
    }

    /// Sets the extra mapped memory size. Only allowed before `open`.
    pub fn setxmsiz(&mut self, xmsiz: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.xmsiz = tuned(xmsiz, 0);
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
    pub fn tuning(&self) -> TreeTuning {
        self.tuning
    }

    /// Adds `value` after any existing values of `key`.
    pub fn putdup(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        self.core
            .data
            .0
            .entry(key.to_vec())
            .or_default()
            .push(value.to_vec());
        true
    }

    /// Adds every element of `values` as a duplicate of `key`.
    pub fn putlist(&mut self, key: &[u8], values: &[Vec<u8>]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if values.is_empty() {
            return true;
        }
        self.core
            .data
            .0
            .entry(key.to_vec())
            .or_default()
            .extend(values.iter().cloned());
        true
    }

    /// Removes every value of `key`.
    pub fn outlist(&mut self, key: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.0.remove(key).is_some() {
            true
        } else {
            self.core.fail(ErrorCode::NoRecord)
        }
    }

    /// Every value of `key`, or `None` when missing.
    pub fn getlist(&mut self, key: &[u8]) -> Option<NativeList> {
        if !self.core.readable() {
            return None;
        }
        match self.core.data.0.get(key) {
            Some(values) => Some(values.clone()),
            None => self.core.missing(),
        }
    }

    /// Number of values stored under `key`, 0 when missing.
    pub fn vnum(&mut self, key: &[u8]) -> i64 {
        if !self.core.readable() {
            return 0;
        }
        match self.core.data.0.get(key) {
            Some(values) => values.len() as i64,
            None => {
                self.core.fail(ErrorCode::NoRecord);
                0
            }
        }
    }

    /// Keys between `bkey` and `ekey`.
    ///
    /// A `None` bound is open; `binc`/`einc` make the bounds inclusive.
    pub fn range(
        &mut self,
        bkey: Option<&[u8]>,
        binc: bool,
        ekey: Option<&[u8]>,
        einc: bool,
        max: i64,
    ) -> NativeList {
        if !self.core.readable() {
            return NativeList::new();
        }
        let lower = match bkey {
            Some(k) if binc => Bound::Included(k.to_vec()),
            Some(k) => Bound::Excluded(k.to_vec()),
            None => Bound::Unbounded,
        };
        let upper = match ekey {
            Some(k) if einc => Bound::Included(k.to_vec()),
            Some(k) => Bound::Excluded(k.to_vec()),
            None => Bound::Unbounded,
        };
        if let (Bound::Included(b) | Bound::Excluded(b), Bound::Included(e) | Bound::Excluded(e)) =
            (&lower, &upper)
        {
            if b > e {
                return NativeList::new();
            }
        }
        if let (Bound::Excluded(b), Bound::Excluded(e)) = (&lower, &upper) {
            if b == e {
                return NativeList::new();
            }
        }
        let keys = self
            .core
            .data
            .0
            .range((lower, upper))
            .map(|(k, _)| k.clone());
        limit(keys, max)
    }

    /// Rebuilds the database file with new tuning. Negative arguments keep
    /// the current setting.
    pub fn optimize(
        &mut self,
        lmemb: i64,
        nmemb: i64,
        bnum: i64,
        apow: i64,
        fpow: i64,
        opts: i64,
    ) -> bool {
        if !self.core.writable() {
            return false;
        }
        let current = self.tuning;
        self.tuning.lmemb = tuned(lmemb, current.lmemb);
        self.tuning.nmemb = tuned(nmemb, current.nmemb);
        self.tuning.bnum = tuned(bnum, current.bnum);
        self.tuning.apow = tuned(apow, current.apow);
        self.tuning.fpow = tuned(fpow, current.fpow);
        if opts >= 0 {
            self.tuning.opts = TuningFlags::from_bits(opts);
        }
        self.core.persist(false)
    }

    pub(crate) fn open_memory(&mut self, name: &str) -> bool {
        self.core.open_memory(name, TreeRecords::default())
    }

    fn first_value(&mut self, key: &[u8]) -> Option<&mut Vec<u8>> {
        self.core.data.0.get_mut(key).and_then(|vs| vs.first_mut())
    }
}

impl NativeDb for BTreeDb {
    const KIND: BackendKind = BackendKind::OrderedStore;

    fn create() -> Self {
        Self {
            core: StoreCore::new(Self::KIND, TreeRecords::default()),
            tuning: TreeTuning::default(),
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> bool {
        self.core.open(path, mode, TreeRecords::default())
    }

    delegate_core!();

    /// Removes the first value of `key`.
    fn out(&mut self, key: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        let Some(values) = self.core.data.0.get_mut(key) else {
            return self.core.fail(ErrorCode::NoRecord);
        };
        values.remove(0);
        if values.is_empty() {
            self.core.data.0.remove(key);
        }
        true
    }

    fn vsiz(&mut self, key: &[u8]) -> i64 {
        if !self.core.readable() {
            return -1;
        }
        match self.core.data.0.get(key).and_then(|vs| vs.first()) {
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
        let Some(value) = self.first_value(key) else {
            self.core
                .data
                .0
                .insert(key.to_vec(), vec![num.to_le_bytes().to_vec()]);
            return num;
        };
        match <[u8; 4]>::try_from(value.as_slice()) {
            Ok(bytes) => {
                let sum = i32::from_le_bytes(bytes).wrapping_add(num);
                *value = sum.to_le_bytes().to_vec();
                sum
            }
            Err(_) => {
                self.core.fail(ErrorCode::Keep);
                i32::MIN
            }
        }
    }

    fn adddouble(&mut self, key: &[u8], num: f64) -> f64 {
        if !self.core.writable() {
            return f64::NAN;
        }
        let Some(value) = self.first_value(key) else {
            self.core
                .data
                .0
                .insert(key.to_vec(), vec![num.to_le_bytes().to_vec()]);
            return num;
        };
        match <[u8; 8]>::try_from(value.as_slice()) {
            Ok(bytes) => {
                let sum = f64::from_le_bytes(bytes) + num;
                *value = sum.to_le_bytes().to_vec();
                sum
            }
            Err(_) => {
                self.core.fail(ErrorCode::Keep);
                f64::NAN
            }
        }
    }
}

impl FlatDb for BTreeDb {
    /// Replaces the first value of `key`, keeping later duplicates.
    fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        match self.first_value(key) {
            Some(first) => *first = value.to_vec(),
            None => {
                self.core.data.0.insert(key.to_vec(), vec![value.to_vec()]);
            }
        }
        true
    }

    fn putkeep(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.0.contains_key(key) {
            return self.core.fail(ErrorCode::Keep);
        }
        self.core.data.0.insert(key.to_vec(), vec![value.to_vec()]);
        true
    }

    fn putcat(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        match self.first_value(key) {
            Some(first) => first.extend_from_slice(value),
            None => {
                self.core.data.0.insert(key.to_vec(), vec![value.to_vec()]);
            }
        }
        true
    }

    /// First value of `key`.
    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        if !self.core.readable() {
            return None;
        }
        match self.core.data.0.get(key).and_then(|vs| vs.first()) {
            Some(value) => Some(value.clone()),
            None => self.core.missing(),
        }
    }
}

impl PrefixScan for BTreeDb {
    fn fwmkeys(&mut self, prefix: &[u8], max: i64) -> NativeList {
        if !self.core.readable() {
            return NativeList::new();
        }
        let keys = self
            .core
            .data
            .0
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone());
        limit(keys, max)
    }
}
