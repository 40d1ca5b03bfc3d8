//! `KeyedStore`: hash database.

use crate::args::{bind, ArgType, Fallback, Param, ANY, TUNING};
use crate::bridge::AsyncBridge;
use crate::error::CallError;
use crate::handle::StoreHandle;
use crate::methods::{self, resolve, Handled, OPEN};
use crate::value::HostValue;
use cabinet_engine::{HashDb, HashTuning, NativeDb, OpenMode};

const OPEN_ASYNC: &[Param] = &[
    OPEN[0],
    OPEN[1],
    Param::Optional(ArgType::Function, Fallback::Absent),
];

fn tuning_object(t: HashTuning) -> HostValue {
    HostValue::object([
        ("bnum", HostValue::Number(t.bnum as f64)),
        ("apow", HostValue::Number(t.apow as f64)),
        ("fpow", HostValue::Number(t.fpow as f64)),
        ("opts", HostValue::Number(f64::from(t.opts.bits()))),
        ("rcnum", HostValue::Number(t.rcnum as f64)),
        ("xmsiz", HostValue::Number(t.xmsiz as f64)),
        ("dfunit", HostValue::Number(t.dfunit as f64)),
    ])
}

fn extras(bridge: &AsyncBridge, h: &StoreHandle<HashDb>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "tune" => {
            let a = bind(args, &[TUNING; 4])?;
            h.with(|db| db.tune(a.int(0), a.int32(1), a.int32(2), a.int32(3)))
                .into()
        }
        "setcache" => {
            let a = bind(args, &[TUNING])?;
            h.with(|db| db.setcache(a.int32(0))).into()
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
        "openAsync" => {
            let a = bind(args, OPEN_ASYNC)?;
            let mode = OpenMode::from_bits(a.int32(1));
            bridge.submit_open(h, a.text(0), mode, a.function(2));
            HostValue::Undefined
        }
        "putasync" => {
            let a = bind(args, &[ANY, ANY])?;
            let (key, value) = (a.bytes(0), a.bytes(1));
            h.with(|db| db.putasync(&key, &value)).into()
        }
        "optimize" => {
            let a = bind(args, &[TUNING; 4])?;
            h.with(|db| db.optimize(a.int(0), a.int32(1), a.int32(2), a.int32(3)))
                .into()
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(crate) fn call(
    bridge: &AsyncBridge,
    h: &StoreHandle<HashDb>,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    resolve!(
        HashDb::KIND,
        method,
        extras(bridge, h, method, args),
        methods::flat(h, method, args),
        methods::scan(h, method, args),
        methods::lifecycle(h, method, args),
    )
}
