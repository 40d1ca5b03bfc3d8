//! # Cabinet for Node.js
//!
//! napi classes over the cabinet stores: `KeyedStore`, `OrderedStore`,
//! `FixedStore`, `TabularStore`, `AbstractStore`, `OrderedCursor` and
//! `TabularQuery`.
//!
//! Engine failures come back as `false` or `null` with the reason in the
//! store's `ecode()`. A missing or mistyped argument throws. `openAsync`
//! opens on a worker thread and calls back from the Node event loop.
//!
//! The package's `index.js` copies [`class_constants`] onto each class, so
//! `KeyedStore.OWRITER` and friends read like static properties.
//!
//! ```js
//! const { KeyedStore } = require('cabinet')
//! const store = new KeyedStore()
//! store.open('casket.tch', KeyedStore.OWRITER | KeyedStore.OCREAT)
//! store.put('foo', 'hop')
//! store.get('foo') // 'hop'
//! store.close()
//! ```

#![deny(clippy::all)]

mod abstract_store;
mod convert;
mod cursor;
mod fixed;
mod keyed;
mod methods;
mod open_async;
mod ordered;
mod query;
mod tabular;

use napi::{Error, Result, Status};
use napi_derive::napi;
use std::collections::HashMap;

/// Named constants of `class`: error codes, open modes and the class's own
/// flags.
#[napi]
pub fn class_constants(class: String) -> Result<HashMap<String, i64>> {
    let kind = cabinet_bind::class_named(&class)
        .ok_or_else(|| Error::new(Status::InvalidArg, format!("unknown class {class}")))?;
    Ok(cabinet_bind::class_constants(kind)
        .map(|(name, value)| (name.to_string(), value))
        .collect())
}

/// Version of the addon.
#[napi]
pub fn version() -> String {
    cabinet_bind::VERSION.to_string()
}
