//! Cursor over a [`BTreeDb`].
//!
//! The cursor only stores its position. Every operation takes the database
//! it walks, so a cursor never keeps a store alive and failures land on the
//! store's error code.

use crate::btree::BTreeDb;
use crate::error::ErrorCode;
use std::ops::Bound;

/// Where [`BTreeCursor::put`] writes relative to the current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Overwrite the current value.
    #[default]
    Current,
    /// Insert before the current value.
    Before,
    /// Insert after the current value.
    After,
}

impl Placement {
    /// Decodes a `CP*` constant.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Placement::Current),
            1 => Some(Placement::Before),
            2 => Some(Placement::After),
            _ => None,
        }
    }
}

/// Cursor position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CursorPos {
    /// Never moved.
    #[default]
    Unpositioned,
    /// On the `dup`-th value of `key`.
    At {
        /// Current key.
        key: Vec<u8>,
        /// Index among the key's duplicate values.
        dup: usize,
    },
    /// Moved past either end.
    Exhausted,
}

/// Position state of a B+tree cursor.
#[derive(Debug, Default)]
pub struct BTreeCursor {
    pos: CursorPos,
}

impl BTreeCursor {
    /// Creates an unpositioned cursor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position.
    pub fn position(&self) -> &CursorPos {
        &self.pos
    }

    /// Moves to the first record.
    pub fn first(&mut self, db: &mut BTreeDb) -> bool {
        if !db.core.readable() {
            return false;
        }
        let first = db.core.data.0.keys().next().cloned();
        self.settle(db, first.map(|key| (key, 0)))
    }

    /// Moves to the last record.
    pub fn last(&mut self, db: &mut BTreeDb) -> bool {
        if !db.core.readable() {
            return false;
        }
        let last = db
            .core
            .data
            .0
            .iter()
            .next_back()
            .map(|(k, vs)| (k.clone(), vs.len().saturating_sub(1)));
        self.settle(db, last)
    }

    /// Moves to the first record whose key is at least `key`.
    pub fn jump(&mut self, db: &mut BTreeDb, key: &[u8]) -> bool {
        if !db.core.readable() {
            return false;
        }
        let found = db
            .core
            .data
            .0
            .range(key.to_vec()..)
            .next()
            .map(|(k, _)| (k.clone(), 0));
        self.settle(db, found)
    }

    /// Moves to the next record.
    pub fn next(&mut self, db: &mut BTreeDb) -> bool {
        if !db.core.readable() {
            return false;
        }
        let CursorPos::At { key, dup } = &self.pos else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        let next = match db.core.data.0.get(key) {
            Some(values) if dup + 1 < values.len() => Some((key.clone(), dup + 1)),
            _ => Self::key_after(db, key).map(|k| (k, 0)),
        };
        self.settle(db, next)
    }

    /// Moves to the previous record.
    pub fn prev(&mut self, db: &mut BTreeDb) -> bool {
        if !db.core.readable() {
            return false;
        }
        let CursorPos::At { key, dup } = &self.pos else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        let prev = match db.core.data.0.get(key) {
            Some(values) if *dup > 0 && !values.is_empty() => {
                Some((key.clone(), (*dup - 1).min(values.len() - 1)))
            }
            _ => db
                .core
                .data
                .0
                .range::<Vec<u8>, _>((Bound::Unbounded, Bound::Excluded(key)))
                .next_back()
                .map(|(k, vs)| (k.clone(), vs.len().saturating_sub(1))),
        };
        self.settle(db, prev)
    }

    /// Key of the current record.
    pub fn key(&self, db: &mut BTreeDb) -> Option<Vec<u8>> {
        self.current(db).map(|(key, _)| key)
    }

    /// Value of the current record.
    pub fn val(&self, db: &mut BTreeDb) -> Option<Vec<u8>> {
        self.current(db).map(|(_, value)| value)
    }

    /// Writes `value` relative to the current record.
    ///
    /// With [`Placement::Before`] or [`Placement::After`] the cursor moves
    /// onto the inserted value.
    pub fn put(&mut self, db: &mut BTreeDb, value: &[u8], placement: Placement) -> bool {
        if !db.core.writable() {
            return false;
        }
        let CursorPos::At { key, dup } = &mut self.pos else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        let Some(values) = db.core.data.0.get_mut(key.as_slice()) else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        if *dup >= values.len() {
            return db.core.fail(ErrorCode::NoRecord);
        }
        match placement {
            Placement::Current => values[*dup] = value.to_vec(),
            Placement::Before => values.insert(*dup, value.to_vec()),
            Placement::After => {
                values.insert(*dup + 1, value.to_vec());
                *dup += 1;
            }
        }
        true
    }

    /// Removes the current record and moves to the next one.
    pub fn out(&mut self, db: &mut BTreeDb) -> bool {
        if !db.core.writable() {
            return false;
        }
        let CursorPos::At { key, dup } = &self.pos else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        let (key, dup) = (key.clone(), *dup);
        let Some(values) = db.core.data.0.get_mut(&key) else {
            return db.core.fail(ErrorCode::NoRecord);
        };
        if dup >= values.len() {
            return db.core.fail(ErrorCode::NoRecord);
        }
        values.remove(dup);
        let remaining = values.len();
        if remaining == 0 {
            db.core.data.0.remove(&key);
        }
        self.pos = if dup < remaining {
            CursorPos::At { key, dup }
        } else {
            match Self::key_after(db, &key) {
                Some(next) => CursorPos::At { key: next, dup: 0 },
                None => CursorPos::Exhausted,
            }
        };
        true
    }

    fn key_after(db: &BTreeDb, key: &[u8]) -> Option<Vec<u8>> {
        db.core
            .data
            .0
            .range::<[u8], _>((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(k, _)| k.clone())
    }

    fn settle(&mut self, db: &mut BTreeDb, target: Option<(Vec<u8>, usize)>) -> bool {
        match target {
            Some((key, dup)) => {
                self.pos = CursorPos::At { key, dup };
                true
            }
            None => {
                self.pos = CursorPos::Exhausted;
                db.core.fail(ErrorCode::NoRecord)
            }
        }
    }

    fn current(&self, db: &mut BTreeDb) -> Option<(Vec<u8>, Vec<u8>)> {
        if !db.core.readable() {
            return None;
        }
        let CursorPos::At { key, dup } = &self.pos else {
            return db.core.missing();
        };
        match db.core.data.0.get(key).and_then(|vs| vs.get(*dup)) {
            Some(value) => Some((key.clone(), value.clone())),
            None => db.core.missing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{FlatDb, NativeDb};
    use crate::types::OpenMode;
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir, keys: &[&str]) -> BTreeDb {
        let mut db = BTreeDb::create();
        let path = dir.path().join("c.kt");
        assert!(db.open(path.to_str().unwrap(), OpenMode::WRITER | OpenMode::CREATE));
        for key in keys {
            assert!(db.put(key.as_bytes(), format!("v{key}").as_bytes()));
        }
        db
    }

    #[test]
    fn walks_forward_until_exhausted() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["a", "b", "c"]);
        let mut cur = BTreeCursor::new();

        assert_eq!(cur.key(&mut db), None);
        assert!(cur.first(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"a".to_vec()));
        assert!(cur.next(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"b".to_vec()));
        assert!(cur.next(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"c".to_vec()));
        assert_eq!(cur.val(&mut db), Some(b"vc".to_vec()));

        assert!(!cur.next(&mut db));
        assert_eq!(cur.position(), &CursorPos::Exhausted);
        assert_eq!(cur.key(&mut db), None);
        assert!(!cur.next(&mut db));
        assert!(!cur.prev(&mut db));
        assert_eq!(db.ecode(), ErrorCode::NoRecord);
    }

    #[test]
    fn walks_backward() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["a", "b"]);
        let mut cur = BTreeCursor::new();

        assert!(cur.last(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"b".to_vec()));
        assert!(cur.prev(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"a".to_vec()));
        assert!(!cur.prev(&mut db));
    }

    #[test]
    fn empty_store_exhausts_immediately() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &[]);
        let mut cur = BTreeCursor::new();
        assert!(!cur.first(&mut db));
        assert!(!cur.last(&mut db));
        assert_eq!(cur.position(), &CursorPos::Exhausted);
    }

    #[test]
    fn jump_finds_ceiling() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["apple", "cherry"]);
        let mut cur = BTreeCursor::new();

        assert!(cur.jump(&mut db, b"b"));
        assert_eq!(cur.key(&mut db), Some(b"cherry".to_vec()));
        assert!(cur.jump(&mut db, b"apple"));
        assert_eq!(cur.key(&mut db), Some(b"apple".to_vec()));
        assert!(!cur.jump(&mut db, b"z"));
    }

    #[test]
    fn steps_through_duplicates() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["a"]);
        assert!(db.putdup(b"a", b"second"));
        assert!(db.put(b"b", b"vb"));
        let mut cur = BTreeCursor::new();

        assert!(cur.first(&mut db));
        assert!(cur.next(&mut db));
        assert_eq!(cur.val(&mut db), Some(b"second".to_vec()));
        assert!(cur.next(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"b".to_vec()));
        assert!(cur.prev(&mut db));
        assert_eq!(cur.val(&mut db), Some(b"second".to_vec()));
    }

    #[test]
    fn put_placements() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["k"]);
        let mut cur = BTreeCursor::new();
        assert!(cur.first(&mut db));

        assert!(cur.put(&mut db, b"cur", Placement::Current));
        assert!(cur.put(&mut db, b"after", Placement::After));
        assert_eq!(cur.val(&mut db), Some(b"after".to_vec()));
        assert!(cur.put(&mut db, b"before", Placement::Before));
        assert_eq!(cur.val(&mut db), Some(b"before".to_vec()));
        assert_eq!(
            db.getlist(b"k"),
            Some(vec![b"cur".to_vec(), b"before".to_vec(), b"after".to_vec()])
        );
    }

    #[test]
    fn out_moves_to_next() {
        let dir = tempdir().unwrap();
        let mut db = store(&dir, &["a", "b"]);
        let mut cur = BTreeCursor::new();

        assert!(cur.first(&mut db));
        assert!(cur.out(&mut db));
        assert_eq!(cur.key(&mut db), Some(b"b".to_vec()));
        assert!(cur.out(&mut db));
        assert_eq!(cur.position(), &CursorPos::Exhausted);
        assert_eq!(db.rnum(), 0);
        assert!(!cur.out(&mut db));
    }

    #[test]
    fn placement_codes() {
        assert_eq!(Placement::from_code(0), Some(Placement::Current));
        assert_eq!(Placement::from_code(2), Some(Placement::After));
        assert_eq!(Placement::from_code(3), None);
        assert_eq!(Placement::default(), Placement::Current);
    }
}
