//! Fixed-length database.
//!
//! Records are addressed by positive integer ids and values are cut to the
//! configured width. Keys are decimal ids or one of the keywords `min`,
//! `max`, `prev` and `next`.

use crate::store::{Snapshot, StoreCore};
use crate::error::ErrorCode;
use crate::traits::{delegate_core, limit, FlatDb, NativeDb};
use crate::types::{parse_int_prefix, tuned, BackendKind, NativeList, OpenMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default value width.
pub const DEFAULT_WIDTH: i64 = 255;
/// Default file size limit.
pub const DEFAULT_LIMSIZ: i64 = 256 * 1024 * 1024;

const HEADER_SIZE: u64 = 256;

/// Id keywords, encoded the way the engine does.
const ID_MIN: i64 = -1;
const ID_PREV: i64 = -2;
const ID_MAX: i64 = -3;
const ID_NEXT: i64 = -4;

/// Effective tuning of a [`FixedDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTuning {
    /// Value width in bytes.
    pub width: i64,
    /// File size limit in bytes.
    pub limsiz: i64,
}

impl Default for FixedTuning {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            limsiz: DEFAULT_LIMSIZ,
        }
    }
}

impl FixedTuning {
    /// Largest id the file can hold.
    pub fn limid(&self) -> u64 {
        let width = self.width.max(1) as u64;
        let size_field = if width < 0x100 {
            1
        } else if width < 0x10000 {
            2
        } else {
            4
        };
        (self.limsiz.max(0) as u64).saturating_sub(HEADER_SIZE) / (width + size_field)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct FixedRecords {
    width: i64,
    limsiz: i64,
    records: BTreeMap<u64, Vec<u8>>,
}

impl Snapshot for FixedRecords {
    fn clear(&mut self) {
        self.records.clear();
    }

    fn record_count(&self) -> u64 {
        self.records.len() as u64
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        self.records
            .keys()
            .map(|id| id.to_string().into_bytes())
            .collect()
    }
}

/// A fixed-length database handle.
pub struct FixedDb {
    core: StoreCore<FixedRecords>,
    tuning: FixedTuning,
}

/// Decodes a key into an id or one of the keyword sentinels.
fn key_to_id(key: &[u8]) -> i64 {
    match key {
        b"min" => ID_MIN,
        b"prev" => ID_PREV,
        b"max" => ID_MAX,
        b"next" => ID_NEXT,
        other => parse_int_prefix(other),
    }
}

impl FixedDb {
    /// Sets the value width and file size limit. Negative arguments keep
    /// the default. Only allowed before `open`.
    pub fn tune(&mut self, width: i64, limsiz: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.width = tuned(width, DEFAULT_WIDTH).max(1);
        self.tuning.limsiz = tuned(limsiz, DEFAULT_LIMSIZ);
        true
    }

    /// Effective tuning.
    pub fn tuning(&self) -> FixedTuning {
        self.tuning
    }

    /// Ids inside an interval expression such as `"[1,10]"` or
    /// `"[min,max]"`, at most `max` of them.
    pub fn range(&mut self, interval: &[u8], max: i64) -> NativeList {
        if !self.core.readable() {
            return NativeList::new();
        }
        let text = String::from_utf8_lossy(interval);
        let inner = text
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let (lower, upper) = match inner.split_once(',') {
            Some((lower, upper)) => (lower.trim(), upper.trim()),
            None => (inner.trim(), inner.trim()),
        };
        let lower = match self.bound(lower, 1) {
            Some(id) => id,
            None => return NativeList::new(),
        };
        let upper = match self.bound(upper, self.tuning.limid()) {
            Some(id) => id,
            None => return NativeList::new(),
        };
        if lower > upper {
            return NativeList::new();
        }
        let ids = self
            .core
            .data
            .records
            .range(lower..=upper)
            .map(|(id, _)| id.to_string().into_bytes());
        limit(ids, max)
    }

    /// Changes width and size limit, cutting stored values to the new
    /// width. Negative arguments keep the current setting.
    pub fn optimize(&mut self, width: i64, limsiz: i64) -> bool {
        if !self.core.writable() {
            return false;
        }
        self.tuning.width = tuned(width, self.tuning.width).max(1);
        self.tuning.limsiz = tuned(limsiz, self.tuning.limsiz);
        let width = self.tuning.width as usize;
        let data = &mut self.core.data;
        data.width = self.tuning.width;
        data.limsiz = self.tuning.limsiz;
        for value in data.records.values_mut() {
            value.truncate(width);
        }
        self.core.persist(false)
    }

    fn bound(&self, text: &str, open_default: u64) -> Option<u64> {
        match text {
            "" => Some(open_default),
            "min" => Some(self.core.data.records.keys().next().copied().unwrap_or(1)),
            "max" => Some(
                self.core
                    .data
                    .records
                    .keys()
                    .next_back()
                    .copied()
                    .unwrap_or(0),
            ),
            other => u64::try_from(parse_int_prefix(other.as_bytes())).ok(),
        }
    }

    /// Resolves a key for writing, where `prev` and `next` may name new ids.
    fn write_id(&mut self, key: &[u8]) -> Option<u64> {
        let records = &self.core.data.records;
        let min = records.keys().next().copied().unwrap_or(0);
        let max = records.keys().next_back().copied().unwrap_or(0);
        let id = match key_to_id(key) {
            ID_MIN => min as i64,
            ID_PREV => min as i64 - 1,
            ID_MAX => max as i64,
            ID_NEXT => max as i64 + 1,
            id => id,
        };
        self.checked(id)
    }

    /// Resolves a key for reading.
    fn read_id(&mut self, key: &[u8]) -> Option<u64> {
        let records = &self.core.data.records;
        let id = match key_to_id(key) {
            ID_MIN => records.keys().next().map_or(0, |id| *id as i64),
            ID_MAX => records.keys().next_back().map_or(0, |id| *id as i64),
            ID_PREV | ID_NEXT => 0,
            id => id,
        };
        self.checked(id)
    }

    fn checked(&mut self, id: i64) -> Option<u64> {
        match u64::try_from(id) {
            Ok(id) if id >= 1 && id <= self.tuning.limid() => Some(id),
            _ => {
                self.core.fail(ErrorCode::Invalid);
                None
            }
        }
    }

    fn clip(&self, value: &[u8]) -> Vec<u8> {
        let width = self.tuning.width.max(1) as usize;
        value[..value.len().min(width)].to_vec()
    }

    fn fresh(&self) -> FixedRecords {
        FixedRecords {
            width: self.tuning.width,
            limsiz: self.tuning.limsiz,
            records: BTreeMap::new(),
        }
    }
}

impl NativeDb for FixedDb {
    const KIND: BackendKind = BackendKind::FixedStore;

    fn create() -> Self {
        Self {
            core: StoreCore::new(Self::KIND, FixedRecords::default()),
            tuning: FixedTuning::default(),
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> bool {
        let fresh = self.fresh();
        if !self.core.open(path, mode, fresh) {
            return false;
        }
        self.tuning.width = self.core.data.width.max(1);
        self.tuning.limsiz = self.core.data.limsiz;
        true
    }

    delegate_core!();

    fn out(&mut self, key: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        let Some(id) = self.read_id(key) else {
            return false;
        };
        if self.core.data.records.remove(&id).is_some() {
            true
        } else {
            self.core.fail(ErrorCode::NoRecord)
        }
    }

    fn vsiz(&mut self, key: &[u8]) -> i64 {
        if !self.core.readable() {
            return -1;
        }
        let Some(id) = self.read_id(key) else {
            return -1;
        };
        match self.core.data.records.get(&id) {
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
        let Some(id) = self.write_id(key) else {
            return i32::MIN;
        };
        let current = match self.core.data.records.get(&id) {
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
        let value = self.clip(&sum.to_le_bytes());
        self.core.data.records.insert(id, value);
        sum
    }

    fn adddouble(&mut self, key: &[u8], num: f64) -> f64 {
        if !self.core.writable() {
            return f64::NAN;
        }
        let Some(id) = self.write_id(key) else {
            return f64::NAN;
        };
        let current = match self.core.data.records.get(&id) {
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
        let value = self.clip(&sum.to_le_bytes());
        self.core.data.records.insert(id, value);
        sum
    }
}

impl FlatDb for FixedDb {
    fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        let Some(id) = self.write_id(key) else {
            return false;
        };
        let value = self.clip(value);
        self.core.data.records.insert(id, value);
        true
    }

    fn putkeep(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        let Some(id) = self.write_id(key) else {
            return false;
        };
        if self.core.data.records.contains_key(&id) {
            return self.core.fail(ErrorCode::Keep);
        }
        let value = self.clip(value);
        self.core.data.records.insert(id, value);
        true
    }

    fn putcat(&mut self, key: &[u8], value: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        let Some(id) = self.write_id(key) else {
            return false;
        };
        let mut joined = self.core.data.records.get(&id).cloned().unwrap_or_default();
        joined.extend_from_slice(value);
        let joined = self.clip(&joined);
        self.core.data.records.insert(id, joined);
        true
    }

    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        if !self.core.readable() {
            return None;
        }
        let id = self.read_id(key)?;
        match self.core.data.records.get(&id) {
            Some(value) => Some(value.clone()),
            None => self.core.missing(),
        }
    }
}
