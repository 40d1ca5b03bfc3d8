//! Per-class method dispatch.

mod abstract_store;
mod fixed;
mod keyed;
mod ordered;
mod tabular;

use crate::bridge::AsyncBridge;
use crate::cursor;
use crate::error::CallError;
use crate::instance::{HostObject, Instance};
use crate::query;
use crate::value::HostValue;

/// Calls `method` on the object wrapped by `instance`.
pub(crate) fn call(
    bridge: &AsyncBridge,
    instance: &Instance,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    match instance.object() {
        HostObject::Keyed(h) => keyed::call(bridge, h, method, args),
        HostObject::Ordered(h) => ordered::call(h, method, args),
        HostObject::Fixed(h) => fixed::call(h, method, args),
        HostObject::Tabular(h) => tabular::call(h, method, args),
        HostObject::Abstract(h) => abstract_store::call(h, method, args),
        HostObject::Cursor(c) => cursor::call(c, method, args),
        HostObject::Query(q) => query::call(q, method, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::handle::StoreHandle;
    use cabinet_engine::{AbstractDb, BTreeDb, FixedDb, HashDb, TableDb};
    use tempfile::tempdir;

    fn bridge() -> AsyncBridge {
        AsyncBridge::new(&BridgeConfig::new().workers(1)).unwrap()
    }

    fn open(b: &AsyncBridge, instance: &Instance, path: &std::path::Path) {
        let mode = HostValue::from(6);
        let opened = call(b, instance, "open", &[path.to_str().unwrap().into(), mode]).unwrap();
        assert_eq!(opened, HostValue::Bool(true));
    }

    fn strings(value: &HostValue) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| String::from_utf8(v.as_bytes().unwrap().to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn keyed_tune_defaults_read_back() {
        let b = bridge();
        let store = Instance::new(HostObject::Keyed(StoreHandle::<HashDb>::new()));
        let defaults = call(&b, &store, "tuning", &[]).unwrap();
        let nulls = vec![HostValue::Null; 4];
        assert_eq!(call(&b, &store, "tune", &nulls).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "tuning", &[]).unwrap(), defaults);

        assert_eq!(call(&b, &store, "tune", &[1000.into()]).unwrap(), HostValue::Bool(true));
        let tuned = call(&b, &store, "tuning", &[]).unwrap();
        assert_eq!(tuned.get("bnum"), Some(&HostValue::Number(1000.0)));
    }

    #[test]
    fn keyed_putasync_and_transactions() {
        let b = bridge();
        let dir = tempdir().unwrap();
        let store = Instance::new(HostObject::Keyed(StoreHandle::<HashDb>::new()));
        open(&b, &store, &dir.path().join("k.tch"));

        let queued = call(&b, &store, "putasync", &["a".into(), "1".into()]).unwrap();
        assert_eq!(queued, HostValue::Bool(true));
        assert_eq!(call(&b, &store, "tranbegin", &[]).unwrap(), HostValue::Bool(true));
        call(&b, &store, "put", &["b".into(), "2".into()]).unwrap();
        assert_eq!(call(&b, &store, "tranabort", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "get", &["b".into()]).unwrap(), HostValue::Null);

        assert_eq!(call(&b, &store, "tranbegin", &[]).unwrap(), HostValue::Bool(true));
        call(&b, &store, "put", &["b".into(), "2".into()]).unwrap();
        assert_eq!(call(&b, &store, "trancommit", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "get", &["b".into()]).unwrap(), HostValue::from("2"));
        assert_eq!(call(&b, &store, "get", &["a".into()]).unwrap(), HostValue::from("1"));
        assert_eq!(call(&b, &store, "sync", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "optimize", &[]).unwrap(), HostValue::Bool(true));

        let copy = dir.path().join("copy.tch");
        assert_eq!(
            call(&b, &store, "copy", &[copy.to_str().unwrap().into()]).unwrap(),
            HostValue::Bool(true)
        );
        assert_eq!(call(&b, &store, "vanish", &[]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "rnum", &[]).unwrap(), HostValue::Number(0.0));

        let backup = Instance::new(HostObject::Keyed(StoreHandle::<HashDb>::new()));
        assert_eq!(
            call(&b, &backup, "open", &[copy.to_str().unwrap().into()]).unwrap(),
            HostValue::Bool(true)
        );
        assert_eq!(call(&b, &backup, "rnum", &[]).unwrap(), HostValue::Number(2.0));
    }

    #[test]
    fn ordered_duplicates_and_ranges() {
        let b = bridge();
        let dir = tempdir().unwrap();
        let store = Instance::new(HostObject::Ordered(StoreHandle::<BTreeDb>::new()));
        open(&b, &store, &dir.path().join("o.tcb"));

        for key in ["a", "b", "c", "d"] {
            call(&b, &store, "put", &[key.into(), "v".into()]).unwrap();
        }
        call(&b, &store, "putdup", &["b".into(), "w".into()]).unwrap();
        assert_eq!(call(&b, &store, "vnum", &["b".into()]).unwrap(), HostValue::Number(2.0));
        let list = call(&b, &store, "getlist", &["b".into()]).unwrap();
        assert_eq!(strings(&list), ["v", "w"]);

        let all = call(&b, &store, "range", &[]).unwrap();
        assert_eq!(strings(&all), ["a", "b", "c", "d"]);
        let inner = call(&b, &store, "range", &["a".into(), true.into(), "c".into()]).unwrap();
        assert_eq!(strings(&inner), ["a", "b"]);
        let closed = call(
            &b,
            &store,
            "range",
            &["b".into(), HostValue::Null, "d".into(), true.into(), 1.into()],
        )
        .unwrap();
        assert_eq!(strings(&closed), ["c"]);

        let replaced = HostValue::array(["x".into(), HostValue::Null, "y".into()]);
        assert_eq!(
            call(&b, &store, "putlist", &["z".into(), replaced]).unwrap(),
            HostValue::Bool(true)
        );
        assert_eq!(strings(&call(&b, &store, "getlist", &["z".into()]).unwrap()), ["x", "y"]);
        assert_eq!(call(&b, &store, "outlist", &["z".into()]).unwrap(), HostValue::Bool(true));
        assert_eq!(call(&b, &store, "getlist", &["z".into()]).unwrap(), HostValue::Null);
        assert!(call(&b, &store, "putlist", &["z".into(), "x".into()]).is_err());
    }

    #[test]
    fn fixed_range_reads_max_from_second_argument() {
        let b = bridge();
        let dir = tempdir().unwrap();
        let store = Instance::new(HostObject::Fixed(StoreHandle::<FixedDb>::new()));
        open(&b, &store, &dir.path().join("f.tcf"));
        for id in 1..=5 {
            call(&b, &store, "put", &[id.into(), "x".into()]).unwrap();
        }
        let all = call(&b, &store, "range", &["[min,max]".into()]).unwrap();
        assert_eq!(strings(&all), ["1", "2", "3", "4", "5"]);
        let two = call(&b, &store, "range", &["[min,max]".into(), 2.into()]).unwrap();
        assert_eq!(strings(&two), ["1", "2"]);
        assert!(matches!(
            call(&b, &store, "fwmkeys", &["1".into()]),
            Err(CallError::UnknownMethod { .. })
        ));
    }

    #[test]
    fn tabular_rows_round_trip_as_records() {
        let b = bridge();
        let dir = tempdir().unwrap();
        let store = Instance::new(HostObject::Tabular(StoreHandle::<TableDb>::new()));
        open(&b, &store, &dir.path().join("t.tct"));

        let row = HostValue::object([("name", "ann".into()), ("age", HostValue::from(30))]);
        assert_eq!(call(&b, &store, "put", &["1".into(), row]).unwrap(), HostValue::Bool(true));
        let got = call(&b, &store, "get", &["1".into()]).unwrap();
        assert_eq!(got.get("name"), Some(&HostValue::from("ann")));
        assert_eq!(got.get("age"), Some(&HostValue::from("30")));
        assert_eq!(call(&b, &store, "get", &["2".into()]).unwrap(), HostValue::Null);
        assert!(call(&b, &store, "put", &["1".into(), "flat".into()]).is_err());

        let uid = call(&b, &store, "genuid", &[]).unwrap();
        assert!(uid.as_number().unwrap() >= 1.0);
    }

    #[test]
    fn abstract_misc_and_size() {
        let b = bridge();
        let store = Instance::new(HostObject::Abstract(StoreHandle::<AbstractDb>::new()));
        assert_eq!(call(&b, &store, "open", &["+".into()]).unwrap(), HostValue::Bool(true));
        let pairs = HostValue::array(["a".into(), "1".into(), "b".into(), "2".into()]);
        assert_eq!(
            call(&b, &store, "misc", &["putlist".into(), pairs]).unwrap(),
            HostValue::array([])
        );
        let got = call(&b, &store, "misc", &["getlist".into(), HostValue::array(["b".into()])]).unwrap();
        assert_eq!(strings(&got), ["b", "2"]);
        assert_eq!(call(&b, &store, "misc", &["bogus".into()]).unwrap(), HostValue::Null);
        assert_eq!(call(&b, &store, "rnum", &[]).unwrap(), HostValue::Number(2.0));
        assert_eq!(call(&b, &store, "optimize", &[]).unwrap(), HostValue::Bool(true));
        assert!(call(&b, &store, "size", &[]).unwrap().as_number().is_some());
    }
}
