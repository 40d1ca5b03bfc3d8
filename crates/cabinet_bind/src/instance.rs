//! Wrapped native objects.

use crate::cursor::CursorHandle;
use crate::handle::StoreHandle;
use crate::query::QueryHandle;
use cabinet_engine::{AbstractDb, BTreeDb, BackendKind, FixedDb, HashDb, TableDb};

/// The native side of an [`Instance`].
pub(crate) enum HostObject {
    Keyed(StoreHandle<HashDb>),
    Ordered(StoreHandle<BTreeDb>),
    Fixed(StoreHandle<FixedDb>),
    Tabular(StoreHandle<TableDb>),
    Abstract(StoreHandle<AbstractDb>),
    Cursor(CursorHandle),
    Query(QueryHandle),
}

/// A host object wrapping one native store, cursor or query.
///
/// Dropping the last host reference finalizes the native object; a store
/// that is still open is closed first.
pub struct Instance {
    object: HostObject,
}

impl Instance {
    pub(crate) fn new(object: HostObject) -> Self {
        Self { object }
    }

    pub(crate) fn object(&self) -> &HostObject {
        &self.object
    }

    /// Class of the wrapped object.
    pub fn class(&self) -> BackendKind {
        match &self.object {
            HostObject::Keyed(_) => BackendKind::KeyedStore,
            HostObject::Ordered(_) => BackendKind::OrderedStore,
            HostObject::Fixed(_) => BackendKind::FixedStore,
            HostObject::Tabular(_) => BackendKind::TabularStore,
            HostObject::Abstract(_) => BackendKind::AbstractStore,
            HostObject::Cursor(_) => BackendKind::OrderedCursor,
            HostObject::Query(_) => BackendKind::TabularQuery,
        }
    }

    /// Outstanding async pins on a wrapped store. Always 0 for cursors and
    /// queries.
    pub fn pins(&self) -> usize {
        match &self.object {
            HostObject::Keyed(h) => h.pins(),
            HostObject::Ordered(h) => h.pins(),
            HostObject::Fixed(h) => h.pins(),
            HostObject::Tabular(h) => h.pins(),
            HostObject::Abstract(h) => h.pins(),
            HostObject::Cursor(_) | HostObject::Query(_) => 0,
        }
    }
}
