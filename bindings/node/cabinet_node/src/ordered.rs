//! `OrderedStore`: B+ tree database with duplicate keys.

use crate::convert::{bytes, flag, opt_bytes, sequence, strings, tuning32, tuning64};
use crate::methods::{flat_methods, lifecycle_methods, scan_methods};
use cabinet_bind::StoreHandle;
use cabinet_engine::BTreeDb;
use napi::{JsUnknown, Result};
use napi_derive::napi;

/// Current tuning of an `OrderedStore`.
#[napi(object)]
pub struct OrderedTuning {
    pub lmemb: f64,
    pub nmemb: f64,
    pub bnum: f64,
    pub apow: f64,
    pub fpow: f64,
    pub opts: f64,
    pub lcnum: f64,
    pub ncnum: f64,
    pub xmsiz: f64,
    pub dfunit: f64,
}

#[napi]
pub struct OrderedStore {
    pub(crate) handle: StoreHandle<BTreeDb>,
}

#[napi]
impl OrderedStore {
    #[napi(constructor)]
    pub fn new() -> Self {
        Self {
            handle: StoreHandle::new(),
        }
    }

    #[napi]
    pub fn tune(
        &self,
        lmemb: Option<f64>,
        nmemb: Option<f64>,
        bnum: Option<f64>,
        apow: Option<f64>,
        fpow: Option<f64>,
        opts: Option<f64>,
    ) -> bool {
        let p = [tuning32(lmemb), tuning32(nmemb), tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts)];
        self.handle.with(|db| db.tune(p[0], p[1], p[2], p[3], p[4], p[5]))
    }

    #[napi]
    pub fn optimize(
        &self,
        lmemb: Option<f64>,
        nmemb: Option<f64>,
        bnum: Option<f64>,
        apow: Option<f64>,
        fpow: Option<f64>,
        opts: Option<f64>,
    ) -> bool {
        let p = [tuning32(lmemb), tuning32(nmemb), tuning64(bnum), tuning32(apow), tuning32(fpow), tuning32(opts)];
        self.handle.with(|db| db.optimize(p[0], p[1], p[2], p[3], p[4], p[5]))
    }

    #[napi]
    pub fn setcache(&self, lcnum: Option<f64>, ncnum: Option<f64>) -> bool {
        let (lcnum, ncnum) = (tuning32(lcnum), tuning32(ncnum));
        self.handle.with(|db| db.setcache(lcnum, ncnum))
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
    pub fn tuning(&self) -> OrderedTuning {
        let t = self.handle.with(|db| db.tuning());
        OrderedTuning {
            lmemb: t.lmemb as f64,
            nmemb: t.nmemb as f64,
            bnum: t.bnum as f64,
            apow: t.apow as f64,
            fpow: t.fpow as f64,
            opts: f64::from(t.opts.bits()),
            lcnum: t.lcnum as f64,
            ncnum: t.ncnum as f64,
            xmsiz: t.xmsiz as f64,
            dfunit: t.dfunit as f64,
        }
    }

    /// Adds a value after any existing ones for `key`.
    #[napi]
    pub fn putdup(&self, key: JsUnknown, value: JsUnknown) -> Result<bool> {
        let (key, value) = (bytes(key)?, bytes(value)?);
        Ok(self.handle.with(|db| db.putdup(&key, &value)))
    }

    /// Replaces every value of `key`; `null` elements are skipped.
    #[napi]
    pub fn putlist(&self, key: JsUnknown, values: Vec<JsUnknown>) -> Result<bool> {
        let (key, values) = (bytes(key)?, sequence(values)?);
        Ok(self.handle.with(|db| db.putlist(&key, &values)))
    }

    #[napi]
    pub fn outlist(&self, key: JsUnknown) -> Result<bool> {
        let key = bytes(key)?;
        Ok(self.handle.with(|db| db.outlist(&key)))
    }

    #[napi]
    pub fn getlist(&self, key: JsUnknown) -> Result<Option<Vec<String>>> {
        let key = bytes(key)?;
        Ok(self.handle.with(|db| db.getlist(&key)).map(strings))
    }

    #[napi]
    pub fn vnum(&self, key: JsUnknown) -> Result<f64> {
        let key = bytes(key)?;
        Ok(self.handle.with(|db| db.vnum(&key)) as f64)
    }

    /// Keys between `bkey` and `ekey`. A missing bound is open; `binc` and
    /// `einc` make the bounds inclusive.
    #[napi]
    pub fn range(
        &self,
        bkey: Option<JsUnknown>,
        binc: Option<JsUnknown>,
        ekey: Option<JsUnknown>,
        einc: Option<JsUnknown>,
        max: Option<f64>,
    ) -> Result<Vec<String>> {
        let (bkey, binc) = (opt_bytes(bkey)?, flag(binc)?);
        let (ekey, einc) = (opt_bytes(ekey)?, flag(einc)?);
        let max = tuning32(max);
        let keys = self
            .handle
            .with(|db| db.range(bkey.as_deref(), binc, ekey.as_deref(), einc, max));
        Ok(strings(keys))
    }
}

impl Default for OrderedStore {
    fn default() -> Self {
        Self::new()
    }
}

lifecycle_methods!(OrderedStore);
flat_methods!(OrderedStore);
scan_methods!(OrderedStore);
