//! Method tables shared by every store kind.
//!
//! Each function handles the methods of one capability trait and returns
//! `Ok(None)` for names it does not know, so a kind's dispatcher can try
//! its own extras first and fall through the shared tables in order.

use crate::args::{bind, ArgType, Fallback, Param, ANY, NUMBER, STRING, TUNING};
use crate::error::{ArgumentError, CallError};
use crate::handle::StoreHandle;
use crate::marshal::native_to_sequence;
use crate::value::HostValue;
use cabinet_engine::{errmsg, BackendKind, FlatDb, NativeDb, OpenMode, PrefixScan};

/// Result of a shared method table: `None` when the name is not handled.
pub(crate) type Handled = Result<Option<HostValue>, ArgumentError>;

pub(crate) const OPEN: &[Param] = &[
    STRING,
    Param::Optional(ArgType::Number, Fallback::Int(OpenMode::READER.bits() as i64)),
];
const ERRMSG: &[Param] = &[Param::Optional(ArgType::Number, Fallback::Absent)];
const ACCUMULATE: &[Param] = &[ANY, NUMBER];

/// Tries each method table in order and returns the first handled result,
/// or [`CallError::UnknownMethod`].
macro_rules! resolve {
    ($kind:expr, $method:expr, $($table:expr),+ $(,)?) => {{
        $(
            if let Some(value) = $table? {
                return Ok(value);
            }
        )+
        Err($crate::methods::unknown($kind, $method))
    }};
}
pub(crate) use resolve;

pub(crate) fn unknown(kind: BackendKind, method: &str) -> CallError {
    CallError::UnknownMethod {
        class: kind.class_name(),
        method: method.to_string(),
    }
}

/// Maps the `addint` sentinel to `null`.
pub(crate) fn int_result(n: i32) -> HostValue {
    if n == i32::MIN {
        HostValue::Null
    } else {
        HostValue::from(n)
    }
}

/// Maps the `adddouble` sentinel to `null`.
pub(crate) fn double_result(n: f64) -> HostValue {
    if n.is_nan() {
        HostValue::Null
    } else {
        HostValue::Number(n)
    }
}

/// Lifecycle, transactions, iteration and status.
pub(crate) fn lifecycle<D: NativeDb>(h: &StoreHandle<D>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "errmsg" => {
            let args = bind(args, ERRMSG)?;
            let code = if args.defaulted(0) {
                h.with(|db| db.ecode().code())
            } else {
                args.int32(0) as i32
            };
            HostValue::string(errmsg(code))
        }
        "ecode" => HostValue::from(h.with(|db| db.ecode().code())),
        "open" => {
            let args = bind(args, OPEN)?;
            let path = args.text(0);
            let mode = OpenMode::from_bits(args.int32(1));
            h.with(|db| db.open(&path, mode)).into()
        }
        "close" => h.with(|db| db.close()).into(),
        "out" => {
            let key = bind(args, &[ANY])?.bytes(0);
            h.with(|db| db.out(&key)).into()
        }
        "vsiz" => {
            let key = bind(args, &[ANY])?.bytes(0);
            HostValue::Number(h.with(|db| db.vsiz(&key)) as f64)
        }
        "iterinit" => h.with(|db| db.iterinit()).into(),
        "iternext" => h.with(|db| db.iternext()).into(),
        "addint" => {
            let args = bind(args, ACCUMULATE)?;
            let (key, num) = (args.bytes(0), args.int32(1) as i32);
            int_result(h.with(|db| db.addint(&key, num)))
        }
        "adddouble" => {
            let args = bind(args, ACCUMULATE)?;
            let (key, num) = (args.bytes(0), args.float(1));
            double_result(h.with(|db| db.adddouble(&key, num)))
        }
        "sync" => h.with(|db| db.sync()).into(),
        "vanish" => h.with(|db| db.vanish()).into(),
        "copy" => {
            let path = bind(args, &[STRING])?.text(0);
            h.with(|db| db.copy(&path)).into()
        }
        "tranbegin" => h.with(|db| db.tranbegin()).into(),
        "trancommit" => h.with(|db| db.trancommit()).into(),
        "tranabort" => h.with(|db| db.tranabort()).into(),
        "path" => h
            .with(|db| db.path())
            .map_or(HostValue::Null, HostValue::string),
        "rnum" => HostValue::Number(h.with(|db| db.rnum()) as f64),
        "fsiz" => HostValue::Number(h.with(|db| db.fsiz()) as f64),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Byte-valued writes and lookups.
pub(crate) fn flat<D: FlatDb>(h: &StoreHandle<D>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "put" | "putkeep" | "putcat" => {
            let args = bind(args, &[ANY, ANY])?;
            let (key, value) = (args.bytes(0), args.bytes(1));
            h.with(|db| match method {
                "put" => db.put(&key, &value),
                "putkeep" => db.putkeep(&key, &value),
                _ => db.putcat(&key, &value),
            })
            .into()
        }
        "get" => {
            let key = bind(args, &[ANY])?.bytes(0);
            h.with(|db| db.get(&key)).into()
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// Prefix scans.
pub(crate) fn scan<D: PrefixScan>(h: &StoreHandle<D>, method: &str, args: &[HostValue]) -> Handled {
    match method {
        "fwmkeys" => {
            let args = bind(args, &[ANY, TUNING])?;
            let (prefix, max) = (args.bytes(0), args.int32(1));
            Ok(Some(native_to_sequence(h.with(|db| db.fwmkeys(&prefix, max)))))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_engine::{ErrorCode, HashDb};
    use tempfile::tempdir;

    fn opened(dir: &tempfile::TempDir) -> StoreHandle<HashDb> {
        let h = StoreHandle::<HashDb>::new();
        let path = dir.path().join("m.tch");
        let mode = f64::from((OpenMode::WRITER | OpenMode::CREATE).bits());
        let opened = lifecycle(&h, "open", &[path.to_str().unwrap().into(), mode.into()]).unwrap();
        assert_eq!(opened, Some(HostValue::Bool(true)));
        h
    }

    #[test]
    fn put_get_and_missing() {
        let dir = tempdir().unwrap();
        let h = opened(&dir);
        assert_eq!(flat(&h, "put", &["k".into(), "v".into()]).unwrap(), Some(true.into()));
        assert_eq!(flat(&h, "get", &["k".into()]).unwrap(), Some("v".into()));
        assert_eq!(flat(&h, "get", &["missing".into()]).unwrap(), Some(HostValue::Null));
        assert_eq!(lifecycle(&h, "vsiz", &["k".into()]).unwrap(), Some(HostValue::Number(1.0)));
        assert_eq!(flat(&h, "put", &["k".into()]), Err(ArgumentError { position: 1 }));
    }

    #[test]
    fn counters_and_sentinels() {
        let dir = tempdir().unwrap();
        let h = opened(&dir);
        let add = |n: i32| lifecycle(&h, "addint", &["n".into(), n.into()]).unwrap().unwrap();
        assert_eq!(add(5), HostValue::Number(5.0));
        assert_eq!(add(5), HostValue::Number(10.0));

        flat(&h, "put", &["s".into(), "hello".into()]).unwrap();
        assert_eq!(
            lifecycle(&h, "addint", &["s".into(), 1.into()]).unwrap(),
            Some(HostValue::Null)
        );
        assert_eq!(
            lifecycle(&h, "adddouble", &["s".into(), 1.5.into()]).unwrap(),
            Some(HostValue::Null)
        );
        assert_eq!(
            lifecycle(&h, "adddouble", &["d".into(), 1.5.into()]).unwrap(),
            Some(HostValue::Number(1.5))
        );
        assert!(lifecycle(&h, "addint", &["n".into(), "5".into()]).is_err());
    }

    #[test]
    fn errmsg_takes_optional_code() {
        let h = StoreHandle::<HashDb>::new();
        assert_eq!(lifecycle(&h, "close", &[]).unwrap(), Some(false.into()));
        assert_eq!(lifecycle(&h, "errmsg", &[]).unwrap(), Some("invalid operation".into()));
        assert_eq!(
            lifecycle(&h, "ecode", &[]).unwrap(),
            Some(HostValue::from(ErrorCode::Invalid.code()))
        );
        assert_eq!(
            lifecycle(&h, "errmsg", &[22.into()]).unwrap(),
            Some("no record found".into())
        );
        assert_eq!(lifecycle(&h, "errmsg", &[HostValue::Null]).unwrap(), Some("invalid operation".into()));
    }

    #[test]
    fn open_mode_defaults_to_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.tch");
        let h = StoreHandle::<HashDb>::new();
        assert_eq!(
            lifecycle(&h, "open", &[path.to_str().unwrap().into()]).unwrap(),
            Some(false.into())
        );
        assert_eq!(h.with(|db| db.ecode()), ErrorCode::NoFile);
        assert!(lifecycle(&h, "open", &[1.into()]).is_err());
    }

    #[test]
    fn prefix_scan_and_iteration() {
        let dir = tempdir().unwrap();
        let h = opened(&dir);
        for key in ["ab", "ac", "b"] {
            flat(&h, "put", &[key.into(), "x".into()]).unwrap();
        }
        let found = scan(&h, "fwmkeys", &["a".into()]).unwrap().unwrap();
        assert_eq!(found, HostValue::array(["ab".into(), "ac".into()]));
        let found = scan(&h, "fwmkeys", &["".into(), 1.into()]).unwrap().unwrap();
        assert_eq!(found.as_array().map(<[HostValue]>::len), Some(1));

        assert_eq!(lifecycle(&h, "iterinit", &[]).unwrap(), Some(true.into()));
        let mut seen = 0;
        while lifecycle(&h, "iternext", &[]).unwrap() != Some(HostValue::Null) {
            seen += 1;
        }
        assert_eq!(seen, 3);
        assert_eq!(lifecycle(&h, "bogus", &[]).unwrap(), None);
    }
}
