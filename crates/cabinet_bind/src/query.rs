//! `TabularQuery` objects.

use crate::args::{bind, ArgType, Fallback, Param, ANY, NUMBER};
use crate::error::CallError;
use crate::handle::{HandleCell, StoreHandle};
use crate::instance::HostObject;
use crate::marshal::native_to_sequence;
use crate::methods::unknown;
use crate::value::HostValue;
use cabinet_engine::{order, BackendKind, NativeList, SetOp, TableDb, TableQuery};
use std::cell::RefCell;
use std::sync::Weak;

/// Query state plus a back-reference to its store.
pub struct QueryHandle {
    store: Weak<HandleCell<TableDb>>,
    query: RefCell<TableQuery>,
}

impl QueryHandle {
    /// Creates an empty query over `store`.
    pub fn new(store: &StoreHandle<TableDb>) -> Self {
        Self {
            store: store.downgrade(),
            query: RefCell::new(TableQuery::new()),
        }
    }

    /// Runs `f` against the live store, or returns `gone` once the store
    /// has been finalized.
    pub fn with<R>(&self, gone: R, f: impl FnOnce(&mut TableQuery, &mut TableDb) -> R) -> R {
        match self.store.upgrade() {
            Some(cell) => f(&mut self.query.borrow_mut(), &mut cell.lock()),
            None => gone,
        }
    }

    /// Edits the conditions, order or limit. Works after the store is gone.
    pub fn edit<R>(&self, f: impl FnOnce(&mut TableQuery) -> R) -> R {
        f(&mut self.query.borrow_mut())
    }

    /// Execution plan of the last search.
    pub fn hint(&self) -> String {
        self.query.borrow().hint().to_string()
    }

    /// Keys matching this query's conditions, for combining into another
    /// query's metasearch.
    pub fn matching(&self) -> NativeList {
        self.with(NativeList::new(), |query, db| query.matching(db))
    }
}

const ADDCOND: &[Param] = &[ANY, NUMBER, ANY];
const SETORDER: &[Param] = &[ANY, Param::Optional(ArgType::Number, Fallback::Int(order::STRASC))];
const SETLIMIT: &[Param] = &[
    Param::Optional(ArgType::Number, Fallback::Int(-1)),
    Param::Optional(ArgType::Number, Fallback::Int(-1)),
];
const METASEARCH: &[Param] = &[
    Param::Required(ArgType::Array),
    Param::Optional(ArgType::Number, Fallback::Int(0)),
];

pub(crate) fn call(
    h: &QueryHandle,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    let value: HostValue = match method {
        "addcond" => {
            let args = bind(args, ADDCOND)?;
            h.edit(|query| query.addcond(&args.bytes(0), args.int32(1), &args.bytes(2)));
            HostValue::Undefined
        }
        "setorder" => {
            let args = bind(args, SETORDER)?;
            h.edit(|query| query.setorder(&args.bytes(0), args.int32(1)));
            HostValue::Undefined
        }
        "setlimit" => {
            let args = bind(args, SETLIMIT)?;
            h.edit(|query| query.setlimit(args.int32(0), args.int32(1)));
            HostValue::Undefined
        }
        "search" => h
            .with(None, |query, db| Some(query.search(db)))
            .map_or(HostValue::Null, native_to_sequence),
        "searchout" => h.with(false, |query, db| query.searchout(db)).into(),
        "metasearch" => {
            let args = bind(args, METASEARCH)?;
            let set_op = SetOp::from_code(args.int32(1)).unwrap_or_default();
            let others: Vec<NativeList> = args
                .array(0)
                .unwrap_or_default()
                .iter()
                .filter_map(HostValue::as_instance)
                .filter_map(|other| match other.object() {
                    HostObject::Query(q) => Some(q.matching()),
                    _ => None,
                })
                .collect();
            h.with(None, |query, db| Some(query.metasearch(db, &others, set_op)))
                .map_or(HostValue::Null, native_to_sequence)
        }
        "hint" => HostValue::string(h.hint()),
        _ => return Err(unknown(BackendKind::TabularQuery, method)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use cabinet_engine::{op, NativeDb, NativeMap, OpenMode};
    use std::rc::Rc;
    use tempfile::tempdir;

    fn people(dir: &tempfile::TempDir) -> StoreHandle<TableDb> {
        let path = dir.path().join("q.tct");
        let store = StoreHandle::<TableDb>::new();
        assert!(store.with(|db| db.open(path.to_str().unwrap(), OpenMode::WRITER | OpenMode::CREATE)));
        for (pkey, age, status) in [("1", "17", "active"), ("2", "18", "active"), ("3", "42", "gone")] {
            let row: NativeMap = [("age", age), ("status", status)]
                .iter()
                .map(|(k, v)| (k.as_bytes().to_vec(), v.as_bytes().to_vec()))
                .collect();
            assert!(store.with(|db| db.put(pkey.as_bytes(), &row)));
        }
        store
    }

    fn keys(value: HostValue) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| String::from_utf8(v.as_bytes().unwrap().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn conditions_order_and_limit() {
        let dir = tempdir().unwrap();
        let store = people(&dir);
        let q = QueryHandle::new(&store);

        call(&q, "addcond", &["status".into(), (op::STREQ as i32).into(), "active".into()]).unwrap();
        assert_eq!(keys(call(&q, "search", &[]).unwrap()), vec!["1", "2"]);

        call(&q, "setorder", &["age".into(), (order::NUMDESC as i32).into()]).unwrap();
        call(&q, "setlimit", &[1.into()]).unwrap();
        assert_eq!(keys(call(&q, "search", &[]).unwrap()), vec!["2"]);

        let hint = call(&q, "hint", &[]).unwrap();
        assert!(String::from_utf8_lossy(hint.as_bytes().unwrap()).contains("scanning the whole table"));
    }

    #[test]
    fn metasearch_skips_non_queries() {
        let dir = tempdir().unwrap();
        let store = people(&dir);
        let young = QueryHandle::new(&store);
        call(&young, "addcond", &["age".into(), (op::NUMLT as i32).into(), "18".into()]).unwrap();

        let old = Rc::new(Instance::new(HostObject::Query(QueryHandle::new(&store))));
        if let HostObject::Query(q) = old.object() {
            call(q, "addcond", &["age".into(), (op::NUMGT as i32).into(), "40".into()]).unwrap();
        }

        let others = HostValue::array([HostValue::Instance(old), "noise".into(), HostValue::Null]);
        let union = call(&young, "metasearch", &[others.clone()]).unwrap();
        assert_eq!(keys(union), vec!["1", "3"]);

        let isect = call(&young, "metasearch", &[others, 1.into()]).unwrap();
        assert!(keys(isect).is_empty());
    }

    #[test]
    fn searchout_removes_rows() {
        let dir = tempdir().unwrap();
        let store = people(&dir);
        let q = QueryHandle::new(&store);
        call(&q, "addcond", &["status".into(), (op::STREQ as i32).into(), "gone".into()]).unwrap();
        assert_eq!(call(&q, "searchout", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(store.with(|db| db.rnum()), 2);
    }

    #[test]
    fn finalized_store_fails_cleanly() {
        let dir = tempdir().unwrap();
        let q = {
            let store = people(&dir);
            QueryHandle::new(&store)
        };
        assert_eq!(call(&q, "search", &[]).unwrap(), HostValue::Null);
        assert_eq!(call(&q, "searchout", &[]).unwrap(), HostValue::Bool(false));
        assert!(matches!(call(&q, "addcond", &[]), Err(CallError::BadArguments(_))));
    }
}
