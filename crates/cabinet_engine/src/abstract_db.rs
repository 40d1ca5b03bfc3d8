//! Abstract database.
//!
//! Picks a concrete store from the name passed to [`AbstractDb::open_name`]:
//!
//! | name            | store                       |
//! |-----------------|-----------------------------|
//! | `*`             | in-memory [`HashDb`]        |
//! | `+`             | in-memory [`BTreeDb`]       |
//! | `path.tch`      | [`HashDb`] file             |
//! | `path.tcb`      | [`BTreeDb`] file            |
//! | `path.tcf`      | [`FixedDb`] file            |
//! | `path.tct`      | [`TableDb`] file            |
//!
//! Tuning parameters follow the name as `#name=value` pairs, for example
//! `casket.tch#mode=wc#bnum=1000`. Table rows travel as values of
//! NUL-separated `column\0value` pairs.

use crate::btree::BTreeDb;
use crate::error::ErrorCode;
use crate::fixed::FixedDb;
use crate::hash::HashDb;
use crate::table::TableDb;
use crate::traits::{FlatDb, NativeDb, PrefixScan};
use crate::types::{parse_int_prefix, BackendKind, NativeList, NativeMap, OpenMode};
use regex::bytes::Regex;
use tracing::debug;

enum Inner {
    Hash(HashDb),
    Tree(BTreeDb),
    Fixed(FixedDb),
    Table(TableDb),
}

/// Runs `$body` against whichever store is open, binding it to `$db`, then
/// records the store's error code on the handle.
macro_rules! dispatch {
    ($self:ident, $db:ident => $body:expr, closed => $closed:expr) => {
        match $self.inner.as_mut() {
            Some(Inner::Hash($db)) => settled!($self, $db, $body),
            Some(Inner::Tree($db)) => settled!($self, $db, $body),
            Some(Inner::Fixed($db)) => settled!($self, $db, $body),
            Some(Inner::Table($db)) => settled!($self, $db, $body),
            None => {
                $self.ecode = ErrorCode::Invalid;
                $closed
            }
        }
    };
}

macro_rules! settled {
    ($self:ident, $db:ident, $body:expr) => {{
        let out = $body;
        $self.ecode = $db.ecode();
        out
    }};
}

macro_rules! dispatch_ref {
    ($self:ident, $db:ident => $body:expr, closed => $closed:expr) => {
        match $self.inner.as_ref() {
            Some(Inner::Hash($db)) => $body,
            Some(Inner::Tree($db)) => $body,
            Some(Inner::Fixed($db)) => $body,
            Some(Inner::Table($db)) => $body,
            None => $closed,
        }
    };
}

/// Parsed `#name=value` parameters.
#[derive(Debug, Default)]
struct Params(Vec<(String, String)>);

impl Params {
    fn parse<'a>(parts: impl Iterator<Item = &'a str>) -> Self {
        Params(
            parts
                .filter_map(|p| p.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn num(&self, name: &str) -> i64 {
        self.get(name)
            .map_or(-1, |v| parse_int_prefix(v.as_bytes()))
    }

    fn opts(&self) -> i64 {
        self.get("opts").map_or(-1, |v| {
            v.chars().fold(0, |bits, c| match c {
                'l' => bits | 1,
                'd' => bits | 2,
                'b' => bits | 4,
                't' => bits | 8,
                _ => bits,
            })
        })
    }

    fn mode(&self) -> OpenMode {
        let Some(letters) = self.get("mode") else {
            return OpenMode::WRITER | OpenMode::CREATE;
        };
        letters
            .chars()
            .fold(OpenMode::default(), |mode, c| match c {
                'w' => mode | OpenMode::WRITER,
                'r' => mode | OpenMode::READER,
                'c' => mode | OpenMode::CREATE,
                't' => mode | OpenMode::TRUNCATE,
                'e' => mode | OpenMode::NO_LOCK,
                'f' => mode | OpenMode::LOCK_NON_BLOCKING,
                _ => mode,
            })
    }
}

/// Splits a NUL-separated `column\0value\0...` image into a row.
fn split_row(value: &[u8]) -> NativeMap {
    let mut parts = value.split(|b| *b == 0);
    let mut row = NativeMap::new();
    while let (Some(name), Some(cell)) = (parts.next(), parts.next()) {
        row.insert(name.to_vec(), cell.to_vec());
    }
    row
}

/// Joins a row into a NUL-separated image.
fn join_row(row: &NativeMap) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in row {
        if !out.is_empty() {
            out.push(0);
        }
        out.extend_from_slice(name);
        out.push(0);
        out.extend_from_slice(value);
    }
    out
}

/// A handle that forwards to one of the concrete stores.
pub struct AbstractDb {
    inner: Option<Inner>,
    ecode: ErrorCode,
}

impl AbstractDb {
    /// Opens the store described by `name`.
    pub fn open_name(&mut self, name: &str) -> bool {
        if self.inner.is_some() {
            self.ecode = ErrorCode::Invalid;
            return false;
        }
        let mut parts = name.split('#');
        let path = parts.next().unwrap_or_default();
        let params = Params::parse(parts);
        let mode = params.mode();

        let (inner, ok) = match path {
            "*" => {
                let mut db = HashDb::create();
                let ok = db.open_memory(path);
                (Inner::Hash(db), ok)
            }
            "+" => {
                let mut db = BTreeDb::create();
                let ok = db.open_memory(path);
                (Inner::Tree(db), ok)
            }
            p if p.ends_with(".tch") => {
                let mut db = HashDb::create();
                db.tune(
                    params.num("bnum"),
                    params.num("apow"),
                    params.num("fpow"),
                    params.opts(),
                );
                db.setcache(params.num("rcnum"));
                db.setxmsiz(params.num("xmsiz"));
                db.setdfunit(params.num("dfunit"));
                let ok = db.open(p, mode);
                (Inner::Hash(db), ok)
            }
            p if p.ends_with(".tcb") => {
                let mut db = BTreeDb::create();
                db.tune(
                    params.num("lmemb"),
                    params.num("nmemb"),
                    params.num("bnum"),
                    params.num("apow"),
                    params.num("fpow"),
                    params.opts(),
                );
                db.setcache(params.num("lcnum"), params.num("ncnum"));
                db.setxmsiz(params.num("xmsiz"));
                db.setdfunit(params.num("dfunit"));
                let ok = db.open(p, mode);
                (Inner::Tree(db), ok)
            }
            p if p.ends_with(".tcf") => {
                let mut db = FixedDb::create();
                db.tune(params.num("width"), params.num("limsiz"));
                let ok = db.open(p, mode);
                (Inner::Fixed(db), ok)
            }
            p if p.ends_with(".tct") => {
                let mut db = TableDb::create();
                db.tune(
                    params.num("bnum"),
                    params.num("apow"),
                    params.num("fpow"),
                    params.opts(),
                );
                db.setcache(
                    params.num("rcnum"),
                    params.num("lcnum"),
                    params.num("ncnum"),
                );
                db.setxmsiz(params.num("xmsiz"));
                db.setdfunit(params.num("dfunit"));
                let ok = db.open(p, mode);
                (Inner::Table(db), ok)
            }
            _ => {
                debug!(name, "unrecognized abstract database name");
                self.ecode = ErrorCode::Invalid;
                return false;
            }
        };

        self.ecode = match &inner {
            Inner::Hash(db) => db.ecode(),
            Inner::Tree(db) => db.ecode(),
            Inner::Fixed(db) => db.ecode(),
            Inner::Table(db) => db.ecode(),
        };
        if ok {
            self.inner = Some(inner);
        }
        ok
    }

    /// Backing store kind, if open.
    pub fn backend(&self) -> Option<BackendKind> {
        dispatch_ref!(self, db => Some(kind_of(db)), closed => None)
    }

    /// Size of the database in bytes.
    pub fn size(&self) -> u64 {
        self.fsiz()
    }

    /// Rebuilds the store with `params`, a `#`-separated list of tuning
    /// parameters such as `bnum=1000#opts=l`.
    pub fn optimize(&mut self, params: Option<&str>) -> bool {
        let params = Params::parse(params.unwrap_or_default().split('#'));
        let ok = match self.inner.as_mut() {
            Some(Inner::Hash(db)) => db.optimize(
                params.num("bnum"),
                params.num("apow"),
                params.num("fpow"),
                params.opts(),
            ),
            Some(Inner::Tree(db)) => db.optimize(
                params.num("lmemb"),
                params.num("nmemb"),
                params.num("bnum"),
                params.num("apow"),
                params.num("fpow"),
                params.opts(),
            ),
            Some(Inner::Fixed(db)) => db.optimize(params.num("width"), params.num("limsiz")),
            Some(Inner::Table(db)) => db.optimize(
                params.num("bnum"),
                params.num("apow"),
                params.num("fpow"),
                params.opts(),
            ),
            None => return self.invalid(),
        };
        self.settle();
        ok
    }

    /// Runs a named command.
    ///
    /// Returns the command's result list, or `None` on failure.
    pub fn misc(&mut self, name: &str, args: &[Vec<u8>]) -> Option<NativeList> {
        if self.inner.is_none() {
            self.invalid();
            return None;
        }
        let done = |ok: bool| if ok { Some(NativeList::new()) } else { None };
        match name {
            "put" => match (args.first(), args.get(1)) {
                (Some(key), Some(_)) if self.is_table() => {
                    let row = args[1..]
                        .chunks(2)
                        .filter(|pair| pair.len() == 2)
                        .map(|pair| (pair[0].clone(), pair[1].clone()))
                        .collect();
                    done(self.put_row(key, &row))
                }
                (Some(key), Some(value)) => done(self.put(key, value)),
                _ => self.misc_invalid(),
            },
            "out" => match args.first() {
                Some(key) => done(self.out(key)),
                None => self.misc_invalid(),
            },
            "get" => {
                let Some(key) = args.first() else {
                    return self.misc_invalid();
                };
                if let Some(Inner::Table(db)) = self.inner.as_mut() {
                    let row = db.get(key);
                    self.settle();
                    return row.map(|row| row.into_iter().flat_map(|(k, v)| [k, v]).collect());
                }
                self.get(key).map(|value| vec![value])
            }
            "putlist" => {
                let mut ok = true;
                for pair in args.chunks(2) {
                    if let [key, value] = pair {
                        ok &= self.put(key, value);
                    }
                }
                done(ok)
            }
            "outlist" => {
                let mut ok = true;
                for key in args {
                    ok &= self.out(key);
                }
                done(ok)
            }
            "getlist" => {
                let mut out = NativeList::new();
                for key in args {
                    if let Some(value) = self.get(key) {
                        out.push(key.clone());
                        out.push(value);
                    }
                }
                Some(out)
            }
            "iterinit" => done(self.iterinit()),
            "iternext" => self.iternext().map(|key| vec![key]),
            "sync" => done(self.sync()),
            "optimize" => {
                let params = args.first().map(|p| String::from_utf8_lossy(p).into_owned());
                done(self.optimize(params.as_deref()))
            }
            "vanish" => done(self.vanish()),
            "error" => Some(vec![self.ecode.message().as_bytes().to_vec()]),
            "regex" => {
                let Some(pattern) = args.first() else {
                    return self.misc_invalid();
                };
                let max = args.get(1).map_or(-1, |m| parse_int_prefix(m));
                let Some(rx) = std::str::from_utf8(pattern)
                    .ok()
                    .and_then(|p| Regex::new(p).ok())
                else {
                    return self.misc_invalid();
                };
                self.regex_pairs(&rx, max)
            }
            "range" => self.range_pairs(args),
            _ => {
                self.ecode = ErrorCode::Misc;
                None
            }
        }
    }

    fn regex_pairs(&mut self, rx: &Regex, max: i64) -> Option<NativeList> {
        if !self.iterinit() {
            return None;
        }
        let mut keys = Vec::new();
        while let Some(key) = self.iternext() {
            if rx.is_match(&key) && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys.sort();
        if let Ok(max) = usize::try_from(max) {
            keys.truncate(max);
        }
        let mut out = NativeList::new();
        for key in keys {
            if let Some(value) = self.get(&key) {
                out.push(key);
                out.push(value);
            }
        }
        Some(out)
    }

    fn range_pairs(&mut self, args: &[Vec<u8>]) -> Option<NativeList> {
        let keys = match self.inner.as_mut() {
            Some(Inner::Tree(db)) => {
                let max = args.get(2).map_or(-1, |m| parse_int_prefix(m));
                db.range(
                    args.first().map(Vec::as_slice),
                    true,
                    args.get(1).map(Vec::as_slice),
                    false,
                    max,
                )
            }
            Some(Inner::Fixed(db)) => {
                let interval = args.first().cloned().unwrap_or_else(|| b"[min,max]".to_vec());
                let max = args.get(1).map_or(-1, |m| parse_int_prefix(m));
                db.range(&interval, max)
            }
            _ => return self.misc_invalid(),
        };
        self.settle();
        let mut out = NativeList::new();
        for key in keys {
            if let Some(value) = self.get(&key) {
                out.push(key);
                out.push(value);
            }
        }
        Some(out)
    }

    fn is_table(&self) -> bool {
        matches!(self.inner, Some(Inner::Table(_)))
    }

    fn put_row(&mut self, pkey: &[u8], row: &NativeMap) -> bool {
        match self.inner.as_mut() {
            Some(Inner::Table(db)) => settled!(self, db, db.put(pkey, row)),
            _ => self.invalid(),
        }
    }

    fn settle(&mut self) {
        if let Some(code) = dispatch_ref!(self, db => Some(db.ecode()), closed => None) {
            self.ecode = code;
        }
    }

    fn invalid(&mut self) -> bool {
        self.ecode = ErrorCode::Invalid;
        false
    }

    fn misc_invalid(&mut self) -> Option<NativeList> {
        self.invalid();
        None
    }
}

fn kind_of<D: NativeDb>(_db: &D) -> BackendKind {
    D::KIND
}

impl NativeDb for AbstractDb {
    const KIND: BackendKind = BackendKind::AbstractStore;

    fn create() -> Self {
        Self {
            inner: None,
            ecode: ErrorCode::Success,
        }
    }

    /// Opens `path` as an abstract name. The open mode comes from the
    /// name's `#mode=` parameter, so `mode` is ignored.
    fn open(&mut self, path: &str, _mode: OpenMode) -> bool {
        self.open_name(path)
    }

    fn ecode(&self) -> ErrorCode {
        self.ecode
    }

    fn close(&mut self) -> bool {
        let Some(mut inner) = self.inner.take() else {
            return self.invalid();
        };
        let (ok, code) = match &mut inner {
            Inner::Hash(db) => (db.close(), db.ecode()),
            Inner::Tree(db) => (db.close(), db.ecode()),
            Inner::Fixed(db) => (db.close(), db.ecode()),
            Inner::Table(db) => (db.close(), db.ecode()),
        };
        self.ecode = code;
        ok
    }

    fn sync(&mut self) -> bool {
        dispatch!(self, db => db.sync(), closed => false)
    }

    fn vanish(&mut self) -> bool {
        dispatch!(self, db => db.vanish(), closed => false)
    }

    fn copy(&mut self, path: &str) -> bool {
        dispatch!(self, db => db.copy(path), closed => false)
    }

    fn tranbegin(&mut self) -> bool {
        dispatch!(self, db => db.tranbegin(), closed => false)
    }

    fn trancommit(&mut self) -> bool {
        dispatch!(self, db => db.trancommit(), closed => false)
    }

    fn tranabort(&mut self) -> bool {
        dispatch!(self, db => db.tranabort(), closed => false)
    }

    fn path(&self) -> Option<String> {
        dispatch_ref!(self, db => db.path(), closed => None)
    }

    fn rnum(&self) -> u64 {
        dispatch_ref!(self, db => db.rnum(), closed => 0)
    }

    fn fsiz(&self) -> u64 {
        dispatch_ref!(self, db => db.fsiz(), closed => 0)
    }

    fn out(&mut self, key: &[u8]) -> bool {
        dispatch!(self, db => db.out(key), closed => false)
    }

    fn vsiz(&mut self, key: &[u8]) -> i64 {
        dispatch!(self, db => db.vsiz(key), closed => -1)
    }

    fn iterinit(&mut self) -> bool {
        dispatch!(self, db => db.iterinit(), closed => false)
    }

    fn iternext(&mut self) -> Option<Vec<u8>> {
        dispatch!(self, db => db.iternext(), closed => None)
    }

    fn addint(&mut self, key: &[u8], num: i32) -> i32 {
        dispatch!(self, db => db.addint(key, num), closed => i32::MIN)
    }

    fn adddouble(&mut self, key: &[u8], num: f64) -> f64 {
        dispatch!(self, db => db.adddouble(key, num), closed => f64::NAN)
    }
}

impl FlatDb for AbstractDb {
    fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        match self.inner.as_mut() {
            Some(Inner::Hash(db)) => settled!(self, db, db.put(key, value)),
            Some(Inner::Tree(db)) => settled!(self, db, db.put(key, value)),
            Some(Inner::Fixed(db)) => settled!(self, db, db.put(key, value)),
            Some(Inner::Table(db)) => settled!(self, db, db.put(key, &split_row(value))),
            None => self.invalid(),
        }
    }

    fn putkeep(&mut self, key: &[u8], value: &[u8]) -> bool {
        match self.inner.as_mut() {
            Some(Inner::Hash(db)) => settled!(self, db, db.putkeep(key, value)),
            Some(Inner::Tree(db)) => settled!(self, db, db.putkeep(key, value)),
            Some(Inner::Fixed(db)) => settled!(self, db, db.putkeep(key, value)),
            Some(Inner::Table(db)) => settled!(self, db, db.putkeep(key, &split_row(value))),
            None => self.invalid(),
        }
    }

    fn putcat(&mut self, key: &[u8], value: &[u8]) -> bool {
        match self.inner.as_mut() {
            Some(Inner::Hash(db)) => settled!(self, db, db.putcat(key, value)),
            Some(Inner::Tree(db)) => settled!(self, db, db.putcat(key, value)),
            Some(Inner::Fixed(db)) => settled!(self, db, db.putcat(key, value)),
            Some(Inner::Table(db)) => settled!(self, db, db.putcat(key, &split_row(value))),
            None => self.invalid(),
        }
    }

    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        match self.inner.as_mut() {
            Some(Inner::Hash(db)) => settled!(self, db, db.get(key)),
            Some(Inner::Tree(db)) => settled!(self, db, db.get(key)),
            Some(Inner::Fixed(db)) => settled!(self, db, db.get(key)),
            Some(Inner::Table(db)) => settled!(self, db, db.get(key).map(|row| join_row(&row))),
            None => {
                self.invalid();
                None
            }
        }
    }
}

impl PrefixScan for AbstractDb {
    fn fwmkeys(&mut self, prefix: &[u8], max: i64) -> NativeList {
        match self.inner.as_mut() {
            Some(Inner::Hash(db)) => settled!(self, db, db.fwmkeys(prefix, max)),
            Some(Inner::Tree(db)) => settled!(self, db, db.fwmkeys(prefix, max)),
            Some(Inner::Fixed(db)) => settled!(self, db, db.range(prefix, max)),
            Some(Inner::Table(db)) => settled!(self, db, db.fwmkeys(prefix, max)),
            None => {
                self.invalid();
                NativeList::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn b(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn memory_hash() {
        let mut db = AbstractDb::create();
        assert!(db.open_name("*"));
        assert_eq!(db.backend(), Some(BackendKind::KeyedStore));
        assert!(db.put(b"k", b"v"));
        assert_eq!(db.get(b"k"), Some(b("v")));
        assert_eq!(db.rnum(), 1);
        assert!(db.size() > 0);
        assert_eq!(db.path(), Some("*".to_string()));
        assert!(db.close());
        assert!(!db.close());
        assert_eq!(db.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn memory_tree_keeps_order() {
        let mut db = AbstractDb::create();
        assert!(db.open_name("+"));
        for key in ["c", "a", "b"] {
            assert!(db.put(key.as_bytes(), b"x"));
        }
        assert_eq!(db.fwmkeys(b"", -1), vec![b("a"), b("b"), b("c")]);
        assert_eq!(
            db.misc("range", &[b("a"), b("c")]),
            Some(vec![b("a"), b("x"), b("b"), b("x")])
        );
    }

    #[test]
    fn file_names_pick_backend() {
        let dir = tempdir().unwrap();
        for (ext, kind) in [
            ("tch", BackendKind::KeyedStore),
            ("tcb", BackendKind::OrderedStore),
            ("tcf", BackendKind::FixedStore),
            ("tct", BackendKind::TabularStore),
        ] {
            let name = format!("{}/db.{ext}#mode=wc", dir.path().display());
            let mut db = AbstractDb::create();
            assert!(db.open_name(&name), "{ext}");
            assert_eq!(db.backend(), Some(kind));
        }

        let mut db = AbstractDb::create();
        assert!(!db.open_name("db.unknown"));
        assert_eq!(db.ecode(), ErrorCode::Invalid);
    }

    #[test]
    fn reader_mode_on_missing_file() {
        let dir = tempdir().unwrap();
        let name = format!("{}/absent.tch#mode=r", dir.path().display());
        let mut db = AbstractDb::create();
        assert!(!db.open_name(&name));
        assert_eq!(db.ecode(), ErrorCode::NoFile);
    }

    #[test]
    fn tuning_parameters_reach_the_store() {
        let dir = tempdir().unwrap();
        let name = format!("{}/w.tcf#width=4", dir.path().display());
        let mut db = AbstractDb::create();
        assert!(db.open_name(&name));
        assert!(db.put(b"1", b"abcdefg"));
        assert_eq!(db.get(b"1"), Some(b("abcd")));
    }

    #[test]
    fn table_rows_are_nul_separated() {
        let dir = tempdir().unwrap();
        let name = format!("{}/t.tct", dir.path().display());
        let mut db = AbstractDb::create();
        assert!(db.open_name(&name));

        assert!(db.put(b"1", b"age\x0030\x00name\x00ann"));
        assert_eq!(db.get(b"1"), Some(b"age\x0030\x00name\x00ann".to_vec()));
        assert_eq!(
            db.misc("get", &[b("1")]),
            Some(vec![b("age"), b("30"), b("name"), b("ann")])
        );
        assert_eq!(
            db.misc("put", &[b("2"), b("name"), b("bob")]),
            Some(vec![])
        );
        assert_eq!(db.rnum(), 2);
    }

    #[test]
    fn misc_commands() {
        let mut db = AbstractDb::create();
        assert!(db.open_name("*"));

        assert_eq!(db.misc("putlist", &[b("a"), b("1"), b("b"), b("2")]), Some(vec![]));
        assert_eq!(
            db.misc("getlist", &[b("a"), b("zz"), b("b")]),
            Some(vec![b("a"), b("1"), b("b"), b("2")])
        );
        assert_eq!(db.misc("get", &[b("a")]), Some(vec![b("1")]));
        assert_eq!(db.misc("regex", &[b("^[ab]$"), b("1")]), Some(vec![b("a"), b("1")]));
        assert_eq!(db.misc("out", &[b("a")]), Some(vec![]));
        assert_eq!(db.misc("out", &[b("a")]), None);
        assert_eq!(db.misc("error", &[]), Some(vec![b("no record found")]));
        assert_eq!(db.misc("outlist", &[b("b")]), Some(vec![]));
        assert_eq!(db.misc("iterinit", &[]), Some(vec![]));
        assert_eq!(db.misc("iternext", &[]), None);
        assert_eq!(db.misc("range", &[]), None);
        assert_eq!(db.misc("bogus", &[]), None);
        assert_eq!(db.ecode(), ErrorCode::Misc);
    }

    #[test]
    fn handle_codes_outlive_the_next_read() {
        let mut db = AbstractDb::create();
        assert!(db.open_name("*"));
        assert!(db.put(b"k", b"v"));

        assert_eq!(db.misc("range", &[]), None);
        assert_eq!(db.ecode(), ErrorCode::Invalid);
        assert_eq!(db.misc("error", &[]), Some(vec![b("invalid operation")]));

        assert_eq!(db.misc("regex", &[]), None);
        assert_eq!(db.ecode(), ErrorCode::Invalid);

        assert_eq!(db.misc("nope", &[b("k")]), None);
        assert_eq!(db.ecode(), ErrorCode::Misc);
        assert_eq!(db.rnum(), 1);
        assert_eq!(db.ecode(), ErrorCode::Misc);

        assert_eq!(db.get(b"missing"), None);
        assert_eq!(db.ecode(), ErrorCode::NoRecord);
    }

    #[test]
    fn closed_handle_is_invalid() {
        let mut db = AbstractDb::create();
        assert!(!db.put(b"k", b"v"));
        assert_eq!(db.ecode(), ErrorCode::Invalid);
        assert_eq!(db.misc("sync", &[]), None);
        assert_eq!(db.rnum(), 0);
    }

    #[test]
    fn optimize_params() {
        let dir = tempdir().unwrap();
        let name = format!("{}/o.tch", dir.path().display());
        let mut db = AbstractDb::create();
        assert!(db.open_name(&name));
        assert!(db.optimize(Some("bnum=77#opts=l")));
        assert!(db.optimize(None));
    }

    #[test]
    fn mode_letters() {
        let params = Params::parse("mode=rf".split('#'));
        let mode = params.mode();
        assert!(mode.contains(OpenMode::READER | OpenMode::LOCK_NON_BLOCKING));
        assert!(!mode.is_writer());
        assert_eq!(Params::default().mode(), OpenMode::WRITER | OpenMode::CREATE);
        assert_eq!(Params::parse("opts=ld".split('#')).opts(), 3);
    }
}
