//! Methods shared by the store classes.
//!
//! Each macro adds one `#[napi] impl` block to a class whose `handle`
//! field is a `StoreHandle` of a store implementing the matching engine
//! trait.

/// Lifecycle, transactions, iteration and status.
macro_rules! lifecycle_methods {
    ($class:ident) => {
        #[napi]
        impl $class {
            /// Message for `code`, or for the store's last error.
            #[napi]
            pub fn errmsg(&self, code: Option<f64>) -> String {
                let code = match code {
                    Some(code) => ::cabinet_bind::to_int32(code),
                    None => self.handle.with(|db| ::cabinet_engine::NativeDb::ecode(db).code()),
                };
                ::cabinet_engine::errmsg(code).to_string()
            }

            #[napi]
            pub fn ecode(&self) -> i32 {
                self.handle.with(|db| ::cabinet_engine::NativeDb::ecode(db).code())
            }

            #[napi]
            pub fn open(&self, path: String, mode: Option<f64>) -> bool {
                let mode = $crate::convert::open_mode(mode);
                self.handle.with(|db| ::cabinet_engine::NativeDb::open(db, &path, mode))
            }

            #[napi]
            pub fn close(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::close(db))
            }

            #[napi]
            pub fn out(&self, key: ::napi::JsUnknown) -> ::napi::Result<bool> {
                let key = $crate::convert::bytes(key)?;
                Ok(self.handle.with(|db| ::cabinet_engine::NativeDb::out(db, &key)))
            }

            /// Value size, or -1 when the record is missing.
            #[napi]
            pub fn vsiz(&self, key: ::napi::JsUnknown) -> ::napi::Result<f64> {
                let key = $crate::convert::bytes(key)?;
                Ok(self.handle.with(|db| ::cabinet_engine::NativeDb::vsiz(db, &key)) as f64)
            }

            #[napi]
            pub fn iterinit(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::iterinit(db))
            }

            #[napi]
            pub fn iternext(&self) -> Option<String> {
                self.handle
                    .with(|db| ::cabinet_engine::NativeDb::iternext(db))
                    .map($crate::convert::text)
            }

            /// Adds to an integer record; `null` when the record is not one.
            #[napi]
            pub fn addint(&self, key: ::napi::JsUnknown, num: f64) -> ::napi::Result<Option<i32>> {
                let key = $crate::convert::bytes(key)?;
                let num = ::cabinet_bind::to_int32(num);
                let sum = self.handle.with(|db| ::cabinet_engine::NativeDb::addint(db, &key, num));
                Ok((sum != i32::MIN).then_some(sum))
            }

            /// Adds to a double record; `null` when the record is not one.
            #[napi]
            pub fn adddouble(&self, key: ::napi::JsUnknown, num: f64) -> ::napi::Result<Option<f64>> {
                let key = $crate::convert::bytes(key)?;
                let sum = self.handle.with(|db| ::cabinet_engine::NativeDb::adddouble(db, &key, num));
                Ok((!sum.is_nan()).then_some(sum))
            }

            #[napi]
            pub fn sync(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::sync(db))
            }

            #[napi]
            pub fn vanish(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::vanish(db))
            }

            #[napi]
            pub fn copy(&self, path: String) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::copy(db, &path))
            }

            #[napi]
            pub fn tranbegin(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::tranbegin(db))
            }

            #[napi]
            pub fn trancommit(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::trancommit(db))
            }

            #[napi]
            pub fn tranabort(&self) -> bool {
                self.handle.with(|db| ::cabinet_engine::NativeDb::tranabort(db))
            }

            #[napi]
            pub fn path(&self) -> Option<String> {
                self.handle.with(|db| ::cabinet_engine::NativeDb::path(db))
            }

            #[napi]
            pub fn rnum(&self) -> f64 {
                self.handle.with(|db| ::cabinet_engine::NativeDb::rnum(db)) as f64
            }

            #[napi]
            pub fn fsiz(&self) -> f64 {
                self.handle.with(|db| ::cabinet_engine::NativeDb::fsiz(db)) as f64
            }
        }
    };
}
pub(crate) use lifecycle_methods;

/// Byte-valued writes and lookups.
macro_rules! flat_methods {
    ($class:ident) => {
        #[napi]
        impl $class {
            #[napi]
            pub fn put(&self, key: ::napi::JsUnknown, value: ::napi::JsUnknown) -> ::napi::Result<bool> {
                let (key, value) = ($crate::convert::bytes(key)?, $crate::convert::bytes(value)?);
                Ok(self.handle.with(|db| ::cabinet_engine::FlatDb::put(db, &key, &value)))
            }

            #[napi]
            pub fn putkeep(&self, key: ::napi::JsUnknown, value: ::napi::JsUnknown) -> ::napi::Result<bool> {
                let (key, value) = ($crate::convert::bytes(key)?, $crate::convert::bytes(value)?);
                Ok(self.handle.with(|db| ::cabinet_engine::FlatDb::putkeep(db, &key, &value)))
            }

            #[napi]
            pub fn putcat(&self, key: ::napi::JsUnknown, value: ::napi::JsUnknown) -> ::napi::Result<bool> {
                let (key, value) = ($crate::convert::bytes(key)?, $crate::convert::bytes(value)?);
                Ok(self.handle.with(|db| ::cabinet_engine::FlatDb::putcat(db, &key, &value)))
            }

            #[napi]
            pub fn get(&self, key: ::napi::JsUnknown) -> ::napi::Result<Option<String>> {
                let key = $crate::convert::bytes(key)?;
                Ok(self
                    .handle
                    .with(|db| ::cabinet_engine::FlatDb::get(db, &key))
                    .map($crate::convert::text))
            }
        }
    };
}
pub(crate) use flat_methods;

/// Prefix scans.
macro_rules! scan_methods {
    ($class:ident) => {
        #[napi]
        impl $class {
            /// Keys starting with `prefix`; `max` defaults to unlimited.
            #[napi]
            pub fn fwmkeys(&self, prefix: ::napi::JsUnknown, max: Option<f64>) -> ::napi::Result<Vec<String>> {
                let prefix = $crate::convert::bytes(prefix)?;
                let max = $crate::convert::tuning32(max);
                let keys = self
                    .handle
                    .with(|db| ::cabinet_engine::PrefixScan::fwmkeys(db, &prefix, max));
                Ok($crate::convert::strings(keys))
            }
        }
    };
}
pub(crate) use scan_methods;
