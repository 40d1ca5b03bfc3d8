//! `FixedStore`: fixed-length records addressed by numeric id.

use crate::convert::{bytes, strings, tuning32, tuning64};
use crate::methods::{flat_methods, lifecycle_methods};
use cabinet_bind::StoreHandle;
use cabinet_engine::FixedDb;
use napi::{JsUnknown, Result};
use napi_derive::napi;

/// Current tuning of a `FixedStore`.
#[napi(object)]
pub struct FixedTuning {
    pub width: f64,
    pub limsiz: f64,
    pub limid: f64,
}

#[napi]
pub struct FixedStore {
    pub(crate) handle: StoreHandle<FixedDb>,
}

#[napi]
impl FixedStore {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            handle: StoreHandle::new(),
        }
    }

    #[napi]
    pub fn tune(&self, width: Option<f64>, limsiz: Option<f64>) -> bool {
        let (width, limsiz) = (tuning32(width), tuning64(limsiz));
        self.handle.with(|db| db.tune(width, limsiz))
    }

    #[napi]
    pub fn optimize(&self, width: Option<f64>, limsiz: Option<f64>) -> bool {
        let (width, limsiz) = (tuning32(width), tuning64(limsiz));
        self.handle.with(|db| db.optimize(width, limsiz))
    }

    #[napi]
    pub fn tuning(&self) -> FixedTuning {
        let t = self.handle.with(|db| db.tuning());
        FixedTuning {
            width: t.width as f64,
            limsiz: t.limsiz as f64,
            limid: t.limid() as f64,
        }
    }

    /// Ids inside an interval such as `"[min,max]"` or `"[3,9]"`.
    #[napi]
    pub fn range(&self, interval: JsUnknown, max: Option<f64>) -> Result<Vec<String>> {
        let (interval, max) = (bytes(interval)?, tuning32(max));
        Ok(strings(self.handle.with(|db| db.range(&interval, max))))
    }
}

impl Default for FixedStore {
    fn default() -> Self {
        Self::new()
    }
}

lifecycle_methods!(FixedStore);
flat_methods!(FixedStore);
