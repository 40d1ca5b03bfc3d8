//! `FixedStore`: fixed-length database.
//!
//! Keys are decimal ids or one of `min`, `max`, `prev`, `next`. There is
//! no prefix scan; `range` takes an interval expression instead.

use crate::args::{bind, ANY, TUNING};
use crate::error::CallError;
use crate::handle::StoreHandle;
use crate::marshal::native_to_sequence;
use crate::methods::{self, resolve, Handled};
use crate::value::HostValue;
use cabinet_engine::{FixedDb, NativeDb};

fn extras(h: &StoreHandle<FixedDb>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "tune" | "optimize" => {
            let a = bind(args, &[TUNING; 2])?;
            let (width, limsiz) = (a.int32(0), a.int(1));
            h.with(|db| {
                if method == "tune" {
                    db.tune(width, limsiz)
                } else {
                    db.optimize(width, limsiz)
                }
            })
            .into()
        }
        "tuning" => {
            let t = h.with(|db| db.tuning());
            HostValue::object([
                ("width", HostValue::Number(t.width as f64)),
                ("limsiz", HostValue::Number(t.limsiz as f64)),
                ("limid", HostValue::Number(t.limid() as f64)),
            ])
        }
        "range" => {
            let a = bind(args, &[ANY, TUNING])?;
            let (interval, max) = (a.bytes(0), a.int32(1));
            native_to_sequence(h.with(|db| db.range(&interval, max)))
        }
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(crate) fn call(
    h: &StoreHandle<FixedDb>,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    resolve!(
        FixedDb::KIND,
        method,
        extras(h, method, args),
        methods::flat(h, method, args),
        methods::lifecycle(h, method, args),
    )
}
