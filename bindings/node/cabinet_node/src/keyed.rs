//! `KeyedStore`: hash database.

use crate::convert::{bytes, open_mode, tuning32, tuning64};
use crate::methods::{flat_methods, lifecycle_methods, scan_methods};
use crate::open_async;
use cabinet_bind::StoreHandle;
use cabinet_engine::HashDb;
use napi::{JsUnknown, Result};
use napi_derive::napi;

/// Current tuning of a `KeyedStore`.
#[napi(object)]
pub struct KeyedTuning {
    pub bnum: f64,
    pub apow: f64,
    pub fpow: f64,
    pub opts: f64,
    pub rcnum: f64,
    pub xmsiz: f64,
    pub dfunit: f64,
}

#[napi]
pub struct KeyedStore {
    pub(crate) handle: StoreHandle<HashDb>,
}

#[napi]
impl KeyedStore {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            handle: StoreHandle::new(),
        }
    }

    /// Sets bucket count, alignment, free block pool and options before
    /// opening. Omitted values keep the engine defaults.
    #[napi]
    pub fn tune(&self, bnum: Option<f64>, apow: Option<f64>, fpow: Option<f64>, opts: Option<f64>) -> bool {
        let (bnum, apow, fpow, opts) = (tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts));
        self.handle.with(|db| db.tune(bnum, apow, fpow, opts))
    }

    #[napi]
    pub fn setcache(&self, rcnum: Option<f64>) -> bool {
        let rcnum = tuning32(rcnum);
        self.handle.with(|db| db.setcache(rcnum))
    }

    #[napi]
    pub fn setxmsiz(&self, xmsiz: Option<f64>) -> bool {
        let xmsiz = tuning64(xmsiz);
        self.handle.with(|db| db.setxmsiz(xmsiz))
    }

    #[napi]
    pub fn setdfunit(&self, dfunit: Option<f64>) -> bool {
        let dfunit = tuning32(dfunit);
        self.handle.with(|db| db.setdfunit(dfunit))
    }

    #[napi]
    pub fn tuning(&self) -> KeyedTuning {
        let t = self.handle.with(|db| db.tuning());
        KeyedTuning {
            bnum: t.bnum as f64,
            apow: t.apow as f64,
            fpow: t.fpow as f64,
            opts: f64::from(t.opts.bits()),
            rcnum: t.rcnum as f64,
            xmsiz: t.xmsiz as f64,
            dfunit: t.dfunit as f64,
        }
    }

    /// Opens on a worker thread and calls `callback(code)` from the event
    /// loop when done.
    #[napi]
    pub fn open_async(&self, path: String, mode: Option<f64>, callback: Option<JsUnknown>) -> Result<()> {
        open_async::submit(&self.handle, path, open_mode(mode), callback)
    }

    #[napi]
    pub fn putasync(&self, key: JsUnknown, value: JsUnknown) -> Result<bool> {
        let (key, value) = (bytes(key)?, bytes(value)?);
        Ok(self.handle.with(|db| db.putasync(&key, &value)))
    }

    #[napi]
    pub fn optimize(&self, bnum: Option<f64>, apow: Option<f64>, fpow: Option<f64>, opts: Option<f64>) -> bool {
        let (bnum, apow, fpow, opts) = (tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts));
        self.handle.with(|db| db.optimize(bnum, apow, fpow, opts))
    }
}

impl Default for KeyedStore {
    fn default() -> Self {
        Self::new()
    }
}

lifecycle_methods!(KeyedStore);
flat_methods!(KeyedStore);
scan_methods!(KeyedStore);
