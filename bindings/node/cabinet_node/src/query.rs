//! `TabularQuery`: conditions, ordering and limits over a `TabularStore`.

use crate::convert::{bad_arguments, bytes, strings};
use crate::tabular::TabularStore;
use cabinet_bind::{to_int32, QueryHandle};
use cabinet_engine::{order, NativeList, SetOp};
use napi::bindgen_prelude::ClassInstance;
use napi::{Env, JsObject, JsUnknown, Result};
use napi_derive::napi;

#[napi]
pub struct TabularQuery {
    inner: QueryHandle,
}

#[napi]
impl TabularQuery {
    #[napi(constructor)]
    pub fn new(store: &TabularStore) -> Self {
        Self {
            inner: QueryHandle::new(&store.handle),
        }
    }

    #[napi]
    pub fn addcond(&self, column: JsUnknown, op: f64, expr: JsUnknown) -> Result<()> {
        let (column, expr) = (bytes(column)?, bytes(expr)?);
        let op = i64::from(to_int32(op));
        self.inner.edit(|query| query.addcond(&column, op, &expr));
        Ok(())
    }

    /// Orders results by `column`; `order` defaults to `QOSTRASC`.
    #[napi]
    pub fn setorder(&self, column: JsUnknown, order: Option<f64>) -> Result<()> {
        let column = bytes(column)?;
        let order = order.map_or(order::STRASC, |o| i64::from(to_int32(o)));
        self.inner.edit(|query| query.setorder(&column, order));
        Ok(())
    }

    /// Caps and offsets results; omitted values mean no limit.
    #[napi]
    pub fn setlimit(&self, max: Option<f64>, skip: Option<f64>) {
        let max = max.map_or(-1, |n| i64::from(to_int32(n)));
        let skip = skip.map_or(-1, |n| i64::from(to_int32(n)));
        self.inner.edit(|query| query.setlimit(max, skip));
    }

    #[napi]
    pub fn search(&self) -> Option<Vec<String>> {
        self.inner
            .with(None, |query, db| Some(query.search(db)))
            .map(strings)
    }

    #[napi]
    pub fn searchout(&self) -> bool {
        self.inner.with(false, |query, db| query.searchout(db))
    }

    /// Combines this query with `others`. Elements that are not
    /// `TabularQuery` objects are skipped.
    #[napi]
    pub fn metasearch(&self, env: Env, others: JsObject, set_op: Option<f64>) -> Result<Option<Vec<String>>> {
        if !others.is_array()? {
            return Err(bad_arguments());
        }
        let set_op = set_op
            .and_then(|op| SetOp::from_code(i64::from(to_int32(op))))
            .unwrap_or_default();

        let mut lists: Vec<NativeList> = Vec::new();
        for i in 0..others.get_array_length()? {
            let item: JsUnknown = others.get_element(i)?;
            if !TabularQuery::instance_of(env, item)? {
                continue;
            }
            if let Some(other) = others.get::<_, ClassInstance<TabularQuery>>(i.to_string())? {
                lists.push(other.inner.matching());
            }
        }
        Ok(self
            .inner
            .with(None, |query, db| Some(query.metasearch(db, &lists, set_op)))
            .map(strings))
    }

    /// Execution plan of the last search.
    #[napi]
    pub fn hint(&self) -> String {
        self.inner.hint()
    }
}
