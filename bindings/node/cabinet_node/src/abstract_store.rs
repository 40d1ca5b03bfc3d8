//! `AbstractStore`: any backend chosen by the open path.

use crate::convert::{opt_bytes, sequence, strings, text};
use crate::methods::{flat_methods, lifecycle_methods, scan_methods};
use cabinet_bind::StoreHandle;
use cabinet_engine::AbstractDb;
use napi::{JsUnknown, Result};
use napi_derive::napi;

#[napi]
pub struct AbstractStore {
    pub(crate) handle: StoreHandle<AbstractDb>,
}

#[napi]
impl AbstractStore {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            handle: StoreHandle::new(),
        }
    }

    /// Rebuilds the backend with a `#name=value` tuning string.
    #[napi]
    pub fn optimize(&self, params: Option<JsUnknown>) -> Result<bool> {
        let params = opt_bytes(params)?.map(text);
        Ok(self.handle.with(|db| db.optimize(params.as_deref())))
    }

    /// Backend-specific command; `null` when it fails.
    #[napi]
    pub fn misc(&self, name: String, args: Option<Vec<JsUnknown>>) -> Result<Option<Vec<String>>> {
        let args = sequence(args.unwrap_or_default())?;
        Ok(self.handle.with(|db| db.misc(&name, &args)).map(strings))
    }

    /// Size of the database in bytes.
    #[napi]
    pub fn size(&self) -> f64 {
        self.handle.with(|db| db.size()) as f64
    }
}

impl Default for AbstractStore {
    fn default() -> Self {
        Self::new()
    }
}

lifecycle_methods!(AbstractStore);
flat_methods!(AbstractStore);
scan_methods!(AbstractStore);
