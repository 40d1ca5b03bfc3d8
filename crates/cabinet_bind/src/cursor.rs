//! `OrderedCursor` objects.
//!
//! A cursor holds only a weak reference to its store. Once the store's
//! host object is finalized every operation fails with `false` or `null`.

use crate::args::{bind, ArgType, Fallback, Param, ANY};
use crate::error::CallError;
use crate::handle::{HandleCell, StoreHandle};
use crate::methods::unknown;
use crate::value::HostValue;
use cabinet_engine::{BTreeCursor, BTreeDb, BackendKind, Placement};
use std::cell::RefCell;
use std::sync::Weak;

/// Cursor position plus a back-reference to its store.
pub struct CursorHandle {
    store: Weak<HandleCell<BTreeDb>>,
    cursor: RefCell<BTreeCursor>,
}

impl CursorHandle {
    /// Creates an unpositioned cursor over `store`.
    pub fn new(store: &StoreHandle<BTreeDb>) -> Self {
        Self {
            store: store.downgrade(),
            cursor: RefCell::new(BTreeCursor::new()),
        }
    }

    /// Runs `f` against the live store, or returns `gone` once the store
    /// has been finalized.
    pub fn with<R>(&self, gone: R, f: impl FnOnce(&mut BTreeCursor, &mut BTreeDb) -> R) -> R {
        match self.store.upgrade() {
            Some(cell) => f(&mut self.cursor.borrow_mut(), &mut cell.lock()),
            None => gone,
        }
    }
}

const PUT: &[Param] = &[ANY, Param::Optional(ArgType::Number, Fallback::Int(0))];

pub(crate) fn call(
    h: &CursorHandle,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    let value: HostValue = match method {
        "first" => h.with(false, |cur, db| cur.first(db)).into(),
        "last" => h.with(false, |cur, db| cur.last(db)).into(),
        "jump" => {
            let args = bind(args, &[ANY])?;
            let key = args.bytes(0);
            h.with(false, |cur, db| cur.jump(db, &key)).into()
        }
        "next" => h.with(false, |cur, db| cur.next(db)).into(),
        "prev" => h.with(false, |cur, db| cur.prev(db)).into(),
        "key" => h.with(None, |cur, db| cur.key(db)).into(),
        "val" => h.with(None, |cur, db| cur.val(db)).into(),
        "put" => {
            let args = bind(args, PUT)?;
            let value = args.bytes(0);
            let placement = Placement::from_code(args.int32(1)).unwrap_or_default();
            h.with(false, |cur, db| cur.put(db, &value, placement)).into()
        }
        "out" => h.with(false, |cur, db| cur.out(db)).into(),
        _ => return Err(unknown(BackendKind::OrderedCursor, method)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_engine::{FlatDb, NativeDb, OpenMode};
    use tempfile::tempdir;

    fn store(dir: &tempfile::TempDir) -> StoreHandle<BTreeDb> {
        let path = dir.path().join("c.tcb");
        let store = StoreHandle::<BTreeDb>::new();
        assert!(store.with(|db| db.open(path.to_str().unwrap(), OpenMode::WRITER | OpenMode::CREATE)));
        for key in ["a", "b", "c"] {
            assert!(store.with(|db| db.put(key.as_bytes(), key.to_uppercase().as_bytes())));
        }
        store
    }

    #[test]
    fn walks_and_exhausts() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let cur = CursorHandle::new(&store);

        assert_eq!(call(&cur, "key", &[]).unwrap(), HostValue::Null);
        assert_eq!(call(&cur, "first", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&cur, "val", &[]).unwrap(), HostValue::from("A"));
        assert_eq!(call(&cur, "jump", &["b".into()]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&cur, "key", &[]).unwrap(), HostValue::from("b"));
        assert_eq!(call(&cur, "last", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&cur, "next", &[]).unwrap(), HostValue::Bool(false));
        assert_eq!(call(&cur, "key", &[]).unwrap(), HostValue::Null);
        assert!(matches!(call(&cur, "jump", &[]), Err(CallError::BadArguments(_))));
    }

    #[test]
    fn put_defaults_to_current() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let cur = CursorHandle::new(&store);

        call(&cur, "first", &[]).unwrap();
        assert_eq!(call(&cur, "put", &["x".into()]).unwrap(), HostValue::Bool(true));
        assert_eq!(store.with(|db| db.get(b"a")), Some(b"x".to_vec()));

        assert_eq!(call(&cur, "put", &["y".into(), 2.into()]).unwrap(), HostValue::Bool(true));
        assert_eq!(store.with(|db| db.getlist(b"a")), Some(vec![b"x".to_vec(), b"y".to_vec()]));

        assert_eq!(call(&cur, "out", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&cur, "key", &[]).unwrap(), HostValue::from("b"));
    }

    #[test]
    fn finalized_store_fails_cleanly() {
        let dir = tempdir().unwrap();
        let cur = {
            let store = store(&dir);
            CursorHandle::new(&store)
        };
        assert_eq!(call(&cur, "first", &[]).unwrap(), HostValue::Bool(false));
        assert_eq!(call(&cur, "key", &[]).unwrap(), HostValue::Null);
        assert!(matches!(
            call(&cur, "bogus", &[]),
            Err(CallError::UnknownMethod { .. })
        ));
    }
}
