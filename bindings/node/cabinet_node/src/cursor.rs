//! `OrderedCursor`: a position inside an `OrderedStore`.

use crate::convert::{bytes, text};
use crate::ordered::OrderedStore;
use cabinet_bind::{to_int32, CursorHandle};
use cabinet_engine::Placement;
use napi::{JsUnknown, Result};
use napi_derive::napi;

/// Every operation fails with `false` or `null` once the store has been
/// garbage collected.
#[napi]
pub struct OrderedCursor {
    inner: CursorHandle,
}

#[napi]
impl OrderedCursor {
    #[napi(constructor)]
    pub fn new(store: &OrderedStore) -> Self {
        Self {
            inner: CursorHandle::new(&store.handle),
        }
    }

    #[napi]
    pub fn first(&self) -> bool {
        self.inner.with(false, |cur, db| cur.first(db))
    }

    #[napi]
    pub fn last(&self) -> bool {
        self.inner.with(false, |cur, db| cur.last(db))
    }

    #[napi]
    pub fn jump(&self, key: JsUnknown) -> Result<bool> {
        let key = bytes(key)?;
        Ok(self.inner.with(false, |cur, db| cur.jump(db, &key)))
    }

    #[napi]
    pub fn next(&self) -> bool {
        self.inner.with(false, |cur, db| cur.next(db))
    }

    #[napi]
    pub fn prev(&self) -> bool {
        self.inner.with(false, |cur, db| cur.prev(db))
    }

    #[napi]
    pub fn key(&self) -> Option<String> {
        self.inner.with(None, |cur, db| cur.key(db)).map(text)
    }

    #[napi]
    pub fn val(&self) -> Option<String> {
        self.inner.with(None, |cur, db| cur.val(db)).map(text)
    }

    /// Writes `value` at the cursor; `placement` defaults to `CPCURRENT`.
    #[napi]
    pub fn put(&self, value: JsUnknown, placement: Option<f64>) -> Result<bool> {
        let value = bytes(value)?;
        let placement = placement
            .and_then(|p| Placement::from_code(i64::from(to_int32(p))))
            .unwrap_or_default();
        Ok(self.inner.with(false, |cur, db| cur.put(db, &value, placement)))
    }

    #[napi]
    pub fn out(&self) -> bool {
        self.inner.with(false, |cur, db| cur.out(db))
    }
}
