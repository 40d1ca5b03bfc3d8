//! Table database.
//!
//! Each record is a primary key mapped to a row of named columns. Columns
//! may carry secondary indexes; queries are built with
//! [`TableQuery`](crate::query::TableQuery).

use crate::store::{Snapshot, StoreCore};
use crate::error::ErrorCode;
use crate::traits::{delegate_core, limit, NativeDb, PrefixScan};
use crate::types::{
    format_number, parse_float_prefix, parse_int_prefix, tuned, BackendKind, NativeList,
    NativeMap, OpenMode, TuningFlags,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default bucket count.
pub const DEFAULT_BNUM: i64 = 131_071;
/// Default record alignment power.
pub const DEFAULT_APOW: i64 = 4;
/// Default free block pool power.
pub const DEFAULT_FPOW: i64 = 10;
/// Default leaf page cache size for indexes.
pub const DEFAULT_LCNUM: i64 = 4096;
/// Default non-leaf page cache size for indexes.
pub const DEFAULT_NCNUM: i64 = 512;
/// Default extra mapped memory.
pub const DEFAULT_XMSIZ: i64 = 64 * 1024 * 1024;

/// Column that `addint` and `adddouble` accumulate into.
pub const NUM_COLUMN: &[u8] = b"_num";

/// Index type codes.
pub mod index_type {
    /// Lexical string index.
    pub const LEXICAL: i64 = 0;
    /// Decimal number index.
    pub const DECIMAL: i64 = 1;
    /// Token inverted index.
    pub const TOKEN: i64 = 2;
    /// Q-gram inverted index.
    pub const QGRAM: i64 = 3;
    /// Optimize an existing index.
    pub const OPT: i64 = 9998;
    /// Remove an index.
    pub const VOID: i64 = 9999;
    /// Flag: keep an existing index instead of replacing it.
    pub const KEEP: i64 = 1 << 24;
}

/// Kind of secondary index on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Orders by the raw column bytes.
    Lexical,
    /// Orders by the column's numeric value.
    Decimal,
    /// Indexes space or comma separated tokens.
    Token,
    /// Indexes character q-grams for full-text search.
    QGram,
}

impl IndexKind {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            index_type::LEXICAL => Some(IndexKind::Lexical),
            index_type::DECIMAL => Some(IndexKind::Decimal),
            index_type::TOKEN => Some(IndexKind::Token),
            index_type::QGRAM => Some(IndexKind::QGram),
            _ => None,
        }
    }
}

/// Effective tuning of a [`TableDb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableTuning {
    /// Bucket array size.
    pub bnum: i64,
    /// Record alignment, as a power of 2.
    pub apow: i64,
    /// Free block pool size, as a power of 2.
    pub fpow: i64,
    /// Option flags.
    pub opts: TuningFlags,
    /// Record cache size.
    pub rcnum: i64,
    /// Index leaf page cache size.
    pub lcnum: i64,
    /// Index non-leaf page cache size.
    pub ncnum: i64,
    /// Extra mapped memory.
    pub xmsiz: i64,
    /// Auto defragmentation unit.
    pub dfunit: i64,
}

impl Default for TableTuning {
    fn default() -> Self {
        Self {
            bnum: DEFAULT_BNUM,
            apow: DEFAULT_APOW,
            fpow: DEFAULT_FPOW,
            opts: TuningFlags::default(),
            rcnum: 0,
            lcnum: DEFAULT_LCNUM,
            ncnum: DEFAULT_NCNUM,
            xmsiz: DEFAULT_XMSIZ,
            dfunit: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct TableRecords {
    pub(crate) rows: BTreeMap<Vec<u8>, NativeMap>,
    pub(crate) indexes: BTreeMap<Vec<u8>, IndexKind>,
    uid: i64,
}

impl Snapshot for TableRecords {
    fn clear(&mut self) {
        self.rows.clear();
    }

    fn record_count(&self) -> u64 {
        self.rows.len() as u64
    }

    fn keys(&self) -> Vec<Vec<u8>> {
        self.rows.keys().cloned().collect()
    }
}

/// A table database handle.
pub struct TableDb {
    pub(crate) core: StoreCore<TableRecords>,
    tuning: TableTuning,
}

impl TableDb {
    /// Sets bucket count, alignment, free block pool and option flags.
    ///
    /// Negative arguments keep the default. Only allowed before `open`.
    pub fn tune(&mut self, bnum: i64, apow: i64, fpow: i64, opts: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.bnum = tuned(bnum, DEFAULT_BNUM);
        self.tuning.apow = tuned(apow, DEFAULT_APOW);
        self.tuning.fpow = tuned(fpow, DEFAULT_FPOW);
        self.tuning.opts = if opts < 0 {
            TuningFlags::default()
        } else {
            TuningFlags::from_bits(opts)
        };
        true
    }

    /// Sets record and index cache sizes. Only allowed before `open`.
    pub fn setcache(&mut self, rcnum: i64, lcnum: i64, ncnum: i64) -> bool {
        if self.core.is_open() {
            return self.core.fail(ErrorCode::Invalid);
        }
        self.tuning.rcnum = tuned(rcnum, 0);
        self.tuning.lcnum = tuned(lcnum, DEFAULT_LCNUM);
        self.tuning.ncnum = tuned(ncnum, DEFAULT_NCNUM);
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
    pub fn tuning(&self) -> TableTuning {
        self.tuning
    }

    /// Stores a row, replacing any existing one.
    pub fn put(&mut self, pkey: &[u8], cols: &NativeMap) -> bool {
        if !self.core.writable() {
            return false;
        }
        self.core.data.rows.insert(pkey.to_vec(), cols.clone());
        true
    }

    /// Stores a row unless the primary key exists (`EKEEP`).
    pub fn putkeep(&mut self, pkey: &[u8], cols: &NativeMap) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.rows.contains_key(pkey) {
            return self.core.fail(ErrorCode::Keep);
        }
        self.core.data.rows.insert(pkey.to_vec(), cols.clone());
        true
    }

    /// Adds the columns of `cols` that the row does not have yet.
    pub fn putcat(&mut self, pkey: &[u8], cols: &NativeMap) -> bool {
        if !self.core.writable() {
            return false;
        }
        let row = self.core.data.rows.entry(pkey.to_vec()).or_default();
        for (name, value) in cols {
            row.entry(name.clone()).or_insert_with(|| value.clone());
        }
        true
    }

    /// Fetches the row at `pkey`.
    pub fn get(&mut self, pkey: &[u8]) -> Option<NativeMap> {
        if !self.core.readable() {
            return None;
        }
        match self.core.data.rows.get(pkey) {
            Some(row) => Some(row.clone()),
            None => self.core.missing(),
        }
    }

    /// Creates, replaces, optimizes or removes the index on `column`.
    ///
    /// `kind` is one of the [`index_type`] codes, optionally or'ed with
    /// [`index_type::KEEP`].
    pub fn setindex(&mut self, column: &[u8], kind: i64) -> bool {
        if !self.core.writable() {
            return false;
        }
        if column.is_empty() {
            return self.core.fail(ErrorCode::Invalid);
        }
        let keep = kind & index_type::KEEP != 0;
        let kind = kind & !index_type::KEEP;
        let exists = self.core.data.indexes.contains_key(column);
        match kind {
            index_type::VOID => {
                if self.core.data.indexes.remove(column).is_none() {
                    return self.core.fail(ErrorCode::NoRecord);
                }
            }
            index_type::OPT => {
                if !exists {
                    return self.core.fail(ErrorCode::NoRecord);
                }
            }
            code => {
                let Some(index) = IndexKind::from_code(code) else {
                    return self.core.fail(ErrorCode::Invalid);
                };
                if keep && exists {
                    return self.core.fail(ErrorCode::Keep);
                }
                self.core.data.indexes.insert(column.to_vec(), index);
            }
        }
        self.core.persist(false)
    }

    /// Index on `column`, if any.
    pub fn index(&self, column: &[u8]) -> Option<IndexKind> {
        self.core.data.indexes.get(column).copied()
    }

    /// Generates a new unique id, or -1 on failure.
    pub fn genuid(&mut self) -> i64 {
        if !self.core.writable() {
            return -1;
        }
        self.core.data.uid += 1;
        self.core.data.uid
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

    pub(crate) fn rows(&self) -> &BTreeMap<Vec<u8>, NativeMap> {
        &self.core.data.rows
    }
}

impl NativeDb for TableDb {
    const KIND: BackendKind = BackendKind::TabularStore;

    fn create() -> Self {
        Self {
            core: StoreCore::new(Self::KIND, TableRecords::default()),
            tuning: TableTuning::default(),
        }
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> bool {
        self.core.open(path, mode, TableRecords::default())
    }

    delegate_core!();

    fn out(&mut self, pkey: &[u8]) -> bool {
        if !self.core.writable() {
            return false;
        }
        if self.core.data.rows.remove(pkey).is_some() {
            true
        } else {
            self.core.fail(ErrorCode::NoRecord)
        }
    }

    /// Size of the serialized row: every column as `name\0value\0`.
    fn vsiz(&mut self, pkey: &[u8]) -> i64 {
        if !self.core.readable() {
            return -1;
        }
        match self.core.data.rows.get(pkey) {
            Some(row) => row.iter().map(|(k, v)| (k.len() + v.len() + 2) as i64).sum(),
            None => {
                self.core.fail(ErrorCode::NoRecord);
                -1
            }
        }
    }

    fn addint(&mut self, pkey: &[u8], num: i32) -> i32 {
        if !self.core.writable() {
            return i32::MIN;
        }
        let row = self.core.data.rows.entry(pkey.to_vec()).or_default();
        let current = row.get(NUM_COLUMN).map_or(0, |v| parse_int_prefix(v));
        let sum = (current as i32).wrapping_add(num);
        row.insert(NUM_COLUMN.to_vec(), sum.to_string().into_bytes());
        sum
    }

    fn adddouble(&mut self, pkey: &[u8], num: f64) -> f64 {
        if !self.core.writable() {
            return f64::NAN;
        }
        let row = self.core.data.rows.entry(pkey.to_vec()).or_default();
        let current = row.get(NUM_COLUMN).map_or(0.0, |v| parse_float_prefix(v));
        let sum = current + num;
        row.insert(NUM_COLUMN.to_vec(), format_number(sum).into_bytes());
        sum
    }
}

impl PrefixScan for TableDb {
    fn fwmkeys(&mut self, prefix: &[u8], max: i64) -> NativeList {
        if !self.core.readable() {
            return NativeList::new();
        }
        let keys = self
            .core
            .data
            .rows
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone());
        limit(keys, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn opened(dir: &tempfile::TempDir) -> TableDb {
        let mut db = TableDb::create();
        let path = dir.path().join("t.kc");
        assert!(db.open(path.to_str().unwrap(), OpenMode::WRITER | OpenMode::CREATE));
        db
    }

    fn row(cols: &[(&str, &str)]) -> NativeMap {
        cols.iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn put_get_rows() {
        let dir = tempdir().unwrap();
        let mut db = opened(&dir);

        assert!(db.put(b"1", &row(&[("name", "alice"), ("age", "30")])));
        assert_eq!(db.get(b"1"), Some(row(&[("name", "alice"), ("age", "30")])));
        assert_eq!(db.vsiz(b"1"), ("name".len() + "alice".len() + 2 + "age".len() + 2 + 2) as i64);
        assert_eq!(db.get(b"2"), None);
        assert_eq!(db.ecode(), ErrorCode::NoRecord);
    }

    #[test]
    fn putcat_adds_missing_columns_only() {
        let dir = tempdir().unwrap();
        let mut db = opened(&dir);

        assert!(db.put(b"1", &row(&[("a", "1")])));
        assert!(db.putcat(b"1", &row(&[("a", "changed"), ("b", "2")])));
        assert_eq!(db.get(b"1"), Some(row(&[("a", "1"), ("b", "2")])));
        assert!(!db.putkeep(b"1", &row(&[("c", "3")])));
        assert_eq!(db.ecode(), ErrorCode::Keep);
    }

    #[test]
    fn counters_use_num_column() {
        let dir = tempdir().unwrap();
        let mut db = opened(&dir);

        assert_eq!(db.addint(b"c", 5), 5);
        assert_eq!(db.addint(b"c", 5), 10);
        assert_eq!(db.get(b"c"), Some(row(&[("_num", "10")])));
        assert_eq!(db.adddouble(b"d", 1.5), 1.5);
        assert_eq!(db.adddouble(b"d", 1.0), 2.5);
    }

    #[test]
    fn index_management() {
        let dir = tempdir().unwrap();
        let mut db = opened(&dir);

        assert!(db.setindex(b"age", index_type::DECIMAL));
        assert_eq!(db.index(b"age"), Some(IndexKind::Decimal));
        assert!(!db.setindex(b"age", index_type::LEXICAL | index_type::KEEP));
        assert_eq!(db.ecode(), ErrorCode::Keep);
        assert!(db.setindex(b"age", index_type::LEXICAL));
        assert_eq!(db.index(b"age"), Some(IndexKind::Lexical));
        assert!(db.setindex(b"age", index_type::OPT));
        assert!(db.setindex(b"age", index_type::VOID));
        assert!(!db.setindex(b"age", index_type::VOID));
        assert!(!db.setindex(b"age", 77));
        assert_eq!(db.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn genuid_increments_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("u.kc");
        let path = path.to_str().unwrap();

        let mut db = TableDb::create();
        assert_eq!(db.genuid(), -1);
        assert!(db.open(path, OpenMode::WRITER | OpenMode::CREATE));
        assert_eq!(db.genuid(), 1);
        assert_eq!(db.genuid(), 2);
        assert!(db.close());

        assert!(db.open(path, OpenMode::WRITER));
        assert_eq!(db.genuid(), 3);
    }

    #[test]
    fn fwmkeys_on_primary_keys() {
        let dir = tempdir().unwrap();
        let mut db = opened(&dir);
        for pkey in ["user:1", "user:2", "item:1"] {
            assert!(db.put(pkey.as_bytes(), &row(&[("x", "y")])));
        }
        assert_eq!(
            db.fwmkeys(b"user:", -1),
            vec![b"user:1".to_vec(), b"user:2".to_vec()]
        );
    }

    #[test]
    fn tuning_defaults() {
        let mut db = TableDb::create();
        assert!(db.tune(-1, -1, -1, -1));
        assert!(db.setcache(-1, -1, -1));
        assert_eq!(db.tuning(), TableTuning::default());
    }
}
