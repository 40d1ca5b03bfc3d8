//! `TabularStore`: rows of named columns keyed by primary key.

use crate::convert::{bytes, record, record_object, tuning32, tuning64};
use crate::methods::{lifecycle_methods, scan_methods};
use cabinet_bind::{to_int32, StoreHandle};
use cabinet_engine::TableDb;
use napi::{Env, JsObject, JsUnknown, Result};
use napi_derive::napi;

/// Current tuning of a `TabularStore`.
#[napi(object)]
pub struct TabularTuning {
    pub bnum: f64,
    pub apow: f64,
    pub fpow: f64,
    pub opts: f64,
    pub rcnum: f64,
    pub lcnum: f64,
    pub ncnum: f64,
    pub xmsiz: f64,
    pub dfunit: f64,
}

#[napi]
pub struct TabularStore {
    pub(crate) handle: StoreHandle<TableDb>,
}

#[napi]
impl TabularStore {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            handle: StoreHandle::new(),
        }
    }

    #[napi]
    pub fn tune(&self, bnum: Option<f64>, apow: Option<f64>, fpow: Option<f64>, opts: Option<f64>) -> bool {
        let (bnum, apow, fpow, opts) = (tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts));
        self.handle.with(|db| db.tune(bnum, apow, fpow, opts))
    }

    #[napi]
    pub fn optimize(&self, bnum: Option<f64>, apow: Option<f64>, fpow: Option<f64>, opts: Option<f64>) -> bool {
        let (bnum, apow, fpow, opts) = (tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts));
        self.handle.with(|db| db.optimize(bnum, apow, fpow, opts))
    }

    #[napi]
    pub fn setcache(&self, rcnum: Option<f64>, lcnum: Option<f64>, ncnum: Option<f64>) -> bool {
        let (rcnum, lcnum, ncnum) = (tuning32(rcnum), tuning32(lcnum), tuning32(ncnum));
        self.handle.with(|db| db.setcache(rcnum, lcnum, ncnum))
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
    pub fn tuning(&self) -> TabularTuning {
        let t = self.handle.with(|db| db.tuning());
        TabularTuning {
            bnum: t.bnum as f64,
            apow: t.apow as f64,
            fpow: t.fpow as f64,
            opts: f64::from(t.opts.bits()),
            rcnum: t.rcnum as f64,
            lcnum: t.lcnum as f64,
            ncnum: t.ncnum as f64,
            xmsiz: t.xmsiz as f64,
            dfunit: t.dfunit as f64,
        }
    }

    /// Stores a row; properties that are `null` or `undefined` are dropped.
    #[napi]
    pub fn put(&self, pkey: JsUnknown, cols: JsUnknown) -> Result<bool> {
        let (pkey, row) = (bytes(pkey)?, record(cols)?);
        Ok(self.handle.with(|db| db.put(&pkey, &row)))
    }

    #[napi]
    pub fn putkeep(&self, pkey: JsUnknown, cols: JsUnknown) -> Result<bool> {
        let (pkey, row) = (bytes(pkey)?, record(cols)?);
        Ok(self.handle.with(|db| db.putkeep(&pkey, &row)))
    }

    /// Merges columns into an existing row.
    #[napi]
    pub fn putcat(&self, pkey: JsUnknown, cols: JsUnknown) -> Result<bool> {
        let (pkey, row) = (bytes(pkey)?, record(cols)?);
        Ok(self.handle.with(|db| db.putcat(&pkey, &row)))
    }

    #[napi]
    pub fn get(&self, env: Env, pkey: JsUnknown) -> Result<Option<JsObject>> {
        let pkey = bytes(pkey)?;
        match self.handle.with(|db| db.get(&pkey)) {
            Some(row) => record_object(&env, row).map(Some),
            None => Ok(None),
        }
    }

    #[napi]
    pub fn setindex(&self, column: JsUnknown, kind: f64) -> Result<bool> {
        let (column, kind) = (bytes(column)?, i64::from(to_int32(kind)));
        Ok(self.handle.with(|db| db.setindex(&column, kind)))
    }

    /// Next unique primary key.
    #[napi]
    pub fn genuid(&self) -> f64 {
        self.handle.with(|db| db.genuid()) as f64
    }
}

impl Default for TabularStore {
    fn default() -> Self {
        Self::new()
    }
}

lifecycle_methods!(TabularStore);
scan_methods!(TabularStore);
