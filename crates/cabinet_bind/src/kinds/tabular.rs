//! `TabularStore`: table database.
//!
//! Values are rows: host objects on the way in, records on the way out.

use crate::args::{bind, ArgType, Param, ANY, NUMBER, TUNING};
use crate::error::CallError;
use crate::handle::StoreHandle;
use crate::marshal::{native_to_record, record_to_native};
use crate::methods::{self, resolve, Handled};
use crate::value::HostValue;
use cabinet_engine::{NativeDb, TableDb, TableTuning};

const PUT: &[Param] = &[ANY, Param::Required(ArgType::Object)];

fn tuning_object(t: TableTuning) -> HostValue {
    HostValue::object([
        ("bnum", HostValue::Number(t.bnum as f64)),
        ("apow", HostValue::Number(t.apow as f64)),
        ("fpow", HostValue::Number(t.fpow as f64)),
        ("opts", HostValue::Number(f64::from(t.opts.bits()))),
        ("rcnum", HostValue::Number(t.rcnum as f64)),
        ("lcnum", HostValue::Number(t.lcnum as f64)),
        ("ncnum", HostValue::Number(t.ncnum as f64)),
        ("xmsiz", HostValue::Number(t.xmsiz as f64)),
        ("dfunit", HostValue::Number(t.dfunit as f64)),
    ])
}

fn extras(h: &StoreHandle<TableDb>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "tune" | "optimize" => {
            let a = bind(args, &[TUNING; 4])?;
            let (bnum, apow, fpow, opts) = (a.int(0), a.int32(1), a.int32(2), a.int32(3));
            h.with(|db| {
                if method == "tune" {
                    db.tune(bnum, apow, fpow, opts)
                } else {
                    db.optimize(bnum, apow, fpow, opts)
                }
            })
            .into()
        }
        "setcache" => {
            let a = bind(args, &[TUNING; 3])?;
            h.with(|db| db.setcache(a.int32(0), a.int32(1), a.int32(2)))
                .into()
        }
        "setxmsiz" => {
            let a = bind(args, &[TUNING])?;
            h.with(|db| db.setxmsiz(a.int(0))).into()
        }
        "setdfunit" => {
            let a = bind(args, &[TUNING])?;
            h.with(|db| db.setdfunit(a.int32(0))).into()
        }
        "tuning" => tuning_object(h.with(|db| db.tuning())),
        "put" | "putkeep" | "putcat" => {
            let a = bind(args, PUT)?;
            let pkey = a.bytes(0);
            let row = record_to_native(a.object(1).unwrap_or_default());
            h.with(|db| match method {
                "put" => db.put(&pkey, &row),
                "putkeep" => db.putkeep(&pkey, &row),
                _ => db.putcat(&pkey, &row),
            })
            .into()
        }
        "get" => {
            let pkey = bind(args, &[ANY])?.bytes(0);
            h.with(|db| db.get(&pkey))
                .map_or(HostValue::Null, native_to_record)
        }
        "setindex" => {
            let a = bind(args, &[ANY, NUMBER])?;
            let column = a.bytes(0);
            h.with(|db| db.setindex(&column, a.int32(1))).into()
        }
        "genuid" => HostValue::Number(h.with(|db| db.genuid()) as f64),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(crate) fn call(
    h: &StoreHandle<TableDb>,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    resolve!(
        TableDb::KIND,
        method,
        extras(h, method, args),
        methods::scan(h, method, args),
        methods::lifecycle(h, method, args),
    )
}
