//! Worker pool for blocking opens.
//!
//! [`OpenPool::submit`] pins the handle, runs the native open on a tokio
//! blocking worker and hands the outcome to a completion sink. The worker
//! only ever sees the `Arc` to the native cell and an owned `(path, mode)`
//! snapshot. The sink decides how the outcome reaches the host thread: the
//! Node addon posts it through a threadsafe function, [`AsyncBridge`]
//! queues it on a channel.
//!
//! [`AsyncBridge`]: crate::AsyncBridge

use crate::config::BridgeConfig;
use crate::handle::{HandlePin, StoreHandle};
use cabinet_engine::{ErrorCode, NativeDb, OpenMode};
use std::io;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Outcome of one native open.
///
/// Keeps the store pinned until it is dropped, so a sink that drops it
/// after running the host callback keeps the store alive until then.
pub struct OpenDone {
    code: i32,
    pin: HandlePin,
}

impl OpenDone {
    /// Error code of the open; `0` on success.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Releases the pin and returns the code.
    pub fn release(self) -> i32 {
        let Self { code, pin } = self;
        drop(pin);
        code
    }
}

impl std::fmt::Debug for OpenDone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenDone").field("code", &self.code).finish_non_exhaustive()
    }
}

/// Tokio runtime dedicated to blocking opens.
pub struct OpenPool {
    runtime: Runtime,
}

impl OpenPool {
    /// Starts the worker pool.
    pub fn new(config: &BridgeConfig) -> io::Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.workers)
            .max_blocking_threads(config.workers)
            .thread_name(config.thread_name.clone())
            .thread_keep_alive(config.keep_alive)
            .build()?;
        Ok(Self { runtime })
    }

    /// Opens `handle` on a worker and passes the outcome to `done` on that
    /// worker thread.
    ///
    /// The handle is pinned before this returns.
    pub fn submit<D, F>(&self, handle: &StoreHandle<D>, path: String, mode: OpenMode, done: F)
    where
        D: NativeDb,
        F: FnOnce(OpenDone) + Send + 'static,
    {
        let pin = handle.pin();
        let cell = handle.cell();
        debug!(kind = %D::KIND, path = %path, ?mode, "open queued on worker");

        self.runtime.spawn_blocking(move || {
            let code = {
                let mut db = cell.lock();
                if db.open(&path, mode) {
                    ErrorCode::Success
                } else {
                    db.ecode()
                }
            };
            drop(cell);
            done(OpenDone {
                code: code.code(),
                pin,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_engine::HashDb;
    use std::sync::mpsc;
    use tempfile::tempdir;

    #[test]
    fn sink_runs_on_worker_with_pin_held() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w.tch").to_str().unwrap().to_string();
        let pool = OpenPool::new(&BridgeConfig::new().workers(1)).unwrap();
        let handle = StoreHandle::<HashDb>::new();
        let (tx, rx) = mpsc::channel();

        pool.submit(&handle, path, OpenMode::WRITER | OpenMode::CREATE, move |done| {
            let caller = std::thread::current().name().map(str::to_string);
            tx.send((done, caller)).unwrap();
        });
        assert_eq!(handle.pins(), 1);

        let (done, caller) = rx.recv().unwrap();
        assert_eq!(done.code(), 0);
        assert_eq!(caller.as_deref(), Some("cabinet-worker"));
        assert_eq!(handle.pins(), 1);
        assert_eq!(done.release(), 0);
        assert_eq!(handle.pins(), 0);
        assert!(handle.with(|db| db.path().is_some()));
    }

    #[test]
    fn dropped_outcome_unpins() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope/w.tch").to_str().unwrap().to_string();
        let pool = OpenPool::new(&BridgeConfig::new().workers(1)).unwrap();
        let handle = StoreHandle::<HashDb>::new();
        let (tx, rx) = mpsc::channel();

        pool.submit(&handle, path, OpenMode::WRITER | OpenMode::CREATE, move |done| {
            tx.send(done.code()).unwrap();
        });
        assert_eq!(rx.recv().unwrap(), ErrorCode::NoFile.code());
        while handle.pins() > 0 {
            std::thread::yield_now();
        }
    }
}
