//! In-process host loop for `openAsync`.
//!
//! Embedders without an event loop of their own, and the crate's tests,
//! drive async opens through an [`AsyncBridge`]. It parks each callback on
//! the host side and submits the open to an [`OpenPool`]. The completion
//! comes back over a channel and is delivered on the host thread by
//! [`AsyncBridge::run_pending`] or [`AsyncBridge::run_until_idle`].

use crate::config::BridgeConfig;
use crate::error::UncaughtException;
use crate::handle::StoreHandle;
use crate::value::{HostFunction, HostValue};
use crate::worker::{OpenDone, OpenPool};
use cabinet_engine::{NativeDb, OpenMode};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, warn};

/// A finished open waiting for host-side delivery.
#[derive(Debug)]
struct Completion {
    ticket: u64,
    done: OpenDone,
}

/// An open in flight.
struct PendingOpen {
    path: String,
    mode: OpenMode,
    callback: Option<HostFunction>,
}

/// Worker pool plus the host-side queue of pending callbacks.
pub struct AsyncBridge {
    pool: OpenPool,
    tx: UnboundedSender<Completion>,
    rx: RefCell<UnboundedReceiver<Completion>>,
    pending: RefCell<HashMap<u64, PendingOpen>>,
    next_ticket: Cell<u64>,
}

impl AsyncBridge {
    /// Starts the worker pool.
    pub fn new(config: &BridgeConfig) -> io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            pool: OpenPool::new(config)?,
            tx,
            rx: RefCell::new(rx),
            pending: RefCell::new(HashMap::new()),
            next_ticket: Cell::new(1),
        })
    }

    /// Number of opens whose callback has not run yet.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Submits an open of `handle` and returns its ticket.
    pub(crate) fn submit_open<D: NativeDb>(
        &self,
        handle: &StoreHandle<D>,
        path: String,
        mode: OpenMode,
        callback: Option<HostFunction>,
    ) -> u64 {
        let ticket = self.next_ticket.get();
        self.next_ticket.set(ticket + 1);

        let tx = self.tx.clone();
        debug!(ticket, kind = %D::KIND, path = %path, ?mode, "async open submitted");
        self.pending.borrow_mut().insert(
            ticket,
            PendingOpen {
                path: path.clone(),
                mode,
                callback,
            },
        );

        self.pool.submit(handle, path, mode, move |done| {
            if tx.send(Completion { ticket, done }).is_err() {
                warn!(ticket, "async open finished after the bridge shut down");
            }
        });
        ticket
    }

    /// Delivers every completion that has already arrived.
    ///
    /// Stops at the first callback that throws and returns its exception;
    /// later completions stay queued for the next call.
    pub fn run_pending(&self) -> Result<usize, UncaughtException> {
        let mut delivered = 0;
        loop {
            let next = self.rx.borrow_mut().try_recv();
            let Ok(completion) = next else {
                return Ok(delivered);
            };
            self.deliver(completion)?;
            delivered += 1;
        }
    }

    /// Blocks until every submitted open has run its callback.
    pub fn run_until_idle(&self) -> Result<usize, UncaughtException> {
        let mut delivered = 0;
        while self.pending() > 0 {
            let next = self.rx.borrow_mut().blocking_recv();
            let Some(completion) = next else {
                break;
            };
            self.deliver(completion)?;
            delivered += 1;
        }
        Ok(delivered)
    }

    fn deliver(&self, completion: Completion) -> Result<(), UncaughtException> {
        let Completion { ticket, done } = completion;
        let entry = self.pending.borrow_mut().remove(&ticket);
        let Some(pending) = entry else {
            warn!(ticket, "completion for unknown ticket");
            return Ok(());
        };
        let code = done.code();
        debug!(ticket, path = %pending.path, mode = ?pending.mode, code, "async open completed");

        let outcome = match pending.callback {
            Some(callback) => callback(&[HostValue::from(code)]),
            None => Ok(HostValue::Undefined),
        };
        done.release();

        outcome.map(|_| ()).map_err(|source| {
            error!(ticket, error = %source, "uncaught exception in open callback");
            UncaughtException { ticket, source }
        })
    }
}
