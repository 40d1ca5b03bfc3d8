//! `openAsync` completions on the Node event loop.
//!
//! The open runs on the shared [`OpenPool`]. Its callback is wrapped in a
//! threadsafe function, so the error code is delivered by the Node event
//! loop and a throwing callback surfaces as an uncaught exception there.
//! The store stays pinned until the callback has returned.

use crate::convert::bad_arguments;
use cabinet_bind::{BridgeConfig, OpenPool, StoreHandle};
use cabinet_engine::{NativeDb, OpenMode};
use napi::threadsafe_function::{
    ErrorStrategy, ThreadSafeCallContext, ThreadsafeFunction, ThreadsafeFunctionCallMode,
};
use napi::{Error, JsFunction, JsUnknown, Result, Status, ValueType};
use std::sync::LazyLock;
use tracing::{debug, warn};

static POOL: LazyLock<std::io::Result<OpenPool>> =
    LazyLock::new(|| OpenPool::new(&BridgeConfig::default()));

fn pool() -> Result<&'static OpenPool> {
    POOL.as_ref()
        .map_err(|err| Error::from_reason(format!("open worker pool unavailable: {err}")))
}

/// Queues an open of `handle` and returns immediately.
pub(crate) fn submit<D: NativeDb>(
    handle: &StoreHandle<D>,
    path: String,
    mode: OpenMode,
    callback: Option<JsUnknown>,
) -> Result<()> {
    let notify = match callback {
        Some(callback) if callback.get_type()? == ValueType::Function => {
            let callback = JsFunction::try_from(callback)?;
            let tsfn: ThreadsafeFunction<i32, ErrorStrategy::Fatal> = callback
                .create_threadsafe_function(0, |ctx: ThreadSafeCallContext<i32>| Ok(vec![ctx.value]))?;
            Some(tsfn)
        }
        Some(callback) if !matches!(callback.get_type()?, ValueType::Null | ValueType::Undefined) => {
            return Err(bad_arguments());
        }
        _ => None,
    };

    debug!(kind = %D::KIND, path = %path, ?mode, "openAsync submitted");
    pool()?.submit(handle, path, mode, move |done| {
        let Some(notify) = notify else {
            debug!(code = done.code(), "openAsync finished without a callback");
            return;
        };
        let code = done.code();
        let status = notify.call_with_return_value(
            code,
            ThreadsafeFunctionCallMode::NonBlocking,
            move |_: JsUnknown| {
                done.release();
                Ok(())
            },
        );
        if status != Status::Ok {
            warn!(code, ?status, "openAsync callback could not be queued");
        }
    });
    Ok(())
}
