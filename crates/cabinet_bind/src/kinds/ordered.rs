//! `OrderedStore`: B+tree database.

use crate::args::{bind, ArgType, Fallback, Param, ANY, TUNING};
use crate::error::CallError;
use crate::handle::StoreHandle;
use crate::marshal::{native_to_sequence, sequence_to_native};
use crate::methods::{self, resolve, Handled};
use crate::value::HostValue;
use cabinet_engine::{BTreeDb, NativeDb, TreeTuning};

const OPTIONAL: Param = Param::Optional(ArgType::Any, Fallback::Absent);
const RANGE: &[Param] = &[OPTIONAL, OPTIONAL, OPTIONAL, OPTIONAL, TUNING];
const PUTLIST: &[Param] = &[ANY, Param::Required(ArgType::Array)];

fn tuning_object(t: TreeTuning) -> HostValue {
    HostValue::object([
        ("lmemb", HostValue::Number(t.lmemb as f64)),
        ("nmemb", HostValue::Number(t.nmemb as f64)),
        ("bnum", HostValue::Number(t.bnum as f64)),
        ("apow", HostValue::Number(t.apow as f64)),
        ("fpow", HostValue::Number(t.fpow as f64)),
        ("opts", HostValue::Number(f64::from(t.opts.bits()))),
        ("lcnum", HostValue::Number(t.lcnum as f64)),
        ("ncnum", HostValue::Number(t.ncnum as f64)),
        ("xmsiz", HostValue::Number(t.xmsiz as f64)),
        ("dfunit", HostValue::Number(t.dfunit as f64)),
    ])
}

fn extras(h: &StoreHandle<BTreeDb>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "tune" | "optimize" => {
            let a = bind(args, &[TUNING; 6])?;
            let p: Vec<i64> = (0..6).map(|i| a.int32(i)).collect();
            let bnum = a.int(2);
            h.with(|db| {
                if method == "tune" {
                    db.tune(p[0], p[1], bnum, p[3], p[4], p[5])
                } else {
                    db.optimize(p[0], p[1], bnum, p[3], p[4], p[5])
                }
            })
            .into()
        }
        "setcache" => {
            let a = bind(args, &[TUNING; 2])?;
            h.with(|db| db.setcache(a.int32(0), a.int32(1))).into()
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
        "putdup" => {
            let a = bind(args, &[ANY, ANY])?;
            let (key, value) = (a.bytes(0), a.bytes(1));
            h.with(|db| db.putdup(&key, &value)).into()
        }
        "putlist" => {
            let a = bind(args, PUTLIST)?;
            let key = a.bytes(0);
            let values = sequence_to_native(a.array(1).unwrap_or_default());
            h.with(|db| db.putlist(&key, &values)).into()
        }
        "outlist" => {
            let key = bind(args, &[ANY])?.bytes(0);
            h.with(|db| db.outlist(&key)).into()
        }
        "getlist" => {
            let key = bind(args, &[ANY])?.bytes(0);
            h.with(|db| db.getlist(&key))
                .map_or(HostValue::Null, native_to_sequence)
        }
        "vnum" => {
            let key = bind(args, &[ANY])?.bytes(0);
            HostValue::Number(h.with(|db| db.vnum(&key)) as f64)
        }
        "range" => {
            let a = bind(args, RANGE)?;
            let (bkey, ekey) = (a.opt_bytes(0), a.opt_bytes(2));
            let (binc, einc) = (a.flag(1, false), a.flag(3, false));
            let max = a.int32(4);
            native_to_sequence(h.with(|db| {
                db.range(bkey.as_deref(), binc, ekey.as_deref(), einc, max)
            }))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(crate) fn call(
    h: &StoreHandle<BTreeDb>,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    resolve!(
        BTreeDb::KIND,
        method,
        extras(h, method, args),
        methods::flat(h, method, args),
        methods::scan(h, method, args),
        methods::lifecycle(h, method, args),
    )
}
