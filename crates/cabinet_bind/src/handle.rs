//! Native handle ownership.
//!
//! A [`StoreHandle`] owns one native store through an `Arc<HandleCell>`.
//! The async bridge pins the cell while an open is in flight, and cursors
//! and queries keep a `Weak` to it. The native value is dropped, which
//! closes it if still open, exactly once: when the last strong reference
//! goes away.

use cabinet_engine::NativeDb;
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Shared cell holding a native store.
pub(crate) struct HandleCell<D: NativeDb> {
    db: Mutex<D>,
    pins: AtomicUsize,
}

impl<D: NativeDb> HandleCell<D> {
    /// Locks the native store.
    pub(crate) fn lock(&self) -> MutexGuard<'_, D> {
        self.db.lock()
    }
}

impl<D: NativeDb> Drop for HandleCell<D> {
    fn drop(&mut self) {
        debug!(kind = %D::KIND, "native handle destroyed");
    }
}

/// Anything whose lifetime an in-flight operation can pin.
pub(crate) trait Pinnable: Send + Sync {
    fn pin_count(&self) -> &AtomicUsize;
}

impl<D: NativeDb> Pinnable for HandleCell<D> {
    fn pin_count(&self) -> &AtomicUsize {
        &self.pins
    }
}

/// Strong reference held for the duration of an async operation.
///
/// Counts itself on the cell so the pin is observable independently of
/// the `Arc` strong count.
pub(crate) struct HandlePin {
    cell: Arc<dyn Pinnable>,
}

impl HandlePin {
    fn new(cell: Arc<dyn Pinnable>) -> Self {
        cell.pin_count().fetch_add(1, Ordering::AcqRel);
        Self { cell }
    }
}

impl Drop for HandlePin {
    fn drop(&mut self) {
        self.cell.pin_count().fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owner of one native store.
///
/// Embedders keep one per host object and reach the store through
/// [`StoreHandle::with`].
pub struct StoreHandle<D: NativeDb> {
    cell: Arc<HandleCell<D>>,
}

impl<D: NativeDb> StoreHandle<D> {
    /// Allocates a fresh, unopened native store.
    pub fn new() -> Self {
        Self {
            cell: Arc::new(HandleCell {
                db: Mutex::new(D::create()),
                pins: AtomicUsize::new(0),
            }),
        }
    }

    /// Runs `f` with the native store locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.cell.lock())
    }

    /// Strong reference for a worker thread.
    pub(crate) fn cell(&self) -> Arc<HandleCell<D>> {
        Arc::clone(&self.cell)
    }

    /// Non-owning back-reference for cursors and queries.
    pub(crate) fn downgrade(&self) -> Weak<HandleCell<D>> {
        Arc::downgrade(&self.cell)
    }

    /// Pins the handle until the returned guard drops.
    pub(crate) fn pin(&self) -> HandlePin {
        HandlePin::new(self.cell.clone())
    }

    /// Number of outstanding pins.
    pub fn pins(&self) -> usize {
        self.cell.pins.load(Ordering::Acquire)
    }
}

impl<D: NativeDb> Default for StoreHandle<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_engine::{FlatDb, HashDb, OpenMode};
    use tempfile::tempdir;

    #[test]
    fn pin_counts_and_keeps_alive() {
        let handle = StoreHandle::<HashDb>::new();
        let weak = handle.downgrade();
        let pin = handle.pin();
        assert_eq!(handle.pins(), 1);

        drop(handle);
        assert!(weak.upgrade().is_some());
        drop(pin);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn drop_closes_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("h.tch");
        let path = path.to_str().unwrap();

        let handle = StoreHandle::<HashDb>::new();
        assert!(handle.with(|db| db.open(path, OpenMode::WRITER | OpenMode::CREATE)));
        assert!(handle.with(|db| db.put(b"k", b"v")));
        drop(handle);

        let handle = StoreHandle::<HashDb>::new();
        assert!(handle.with(|db| db.open(path, OpenMode::READER)));
        assert_eq!(handle.with(|db| db.get(b"k")), Some(b"v".to_vec()));
    }
}
