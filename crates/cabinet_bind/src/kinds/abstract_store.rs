//! `AbstractStore`: a store chosen by the name passed to `open`.
//!
//! `open` uses the shared lifecycle table; the name's suffix and `#`
//! parameters pick the backend and its mode.

use crate::args::{bind, ArgType, Fallback, Param, STRING};
use crate::error::CallError;
use crate::handle::StoreHandle;
use crate::marshal::{native_to_sequence, sequence_to_native};
use crate::methods::{self, resolve, Handled};
use crate::value::HostValue;
use cabinet_engine::{AbstractDb, NativeDb};

const OPTIMIZE: &[Param] = &[Param::Optional(ArgType::Any, Fallback::Absent)];
const MISC: &[Param] = &[STRING, Param::Optional(ArgType::Array, Fallback::Absent)];

fn extras(h: &StoreHandle<AbstractDb>, method: &str, args: &[HostValue]) -> Handled {
    let value: HostValue = match method {
        "optimize" => {
            let a = bind(args, OPTIMIZE)?;
            let params = (!a.defaulted(0)).then(|| a.text(0));
            h.with(|db| db.optimize(params.as_deref())).into()
        }
        "misc" => {
            let a = bind(args, MISC)?;
            let name = a.text(0);
            let list = sequence_to_native(a.array(1).unwrap_or_default());
            h.with(|db| db.misc(&name, &list))
                .map_or(HostValue::Null, native_to_sequence)
        }
        "size" => HostValue::Number(h.with(|db| db.size()) as f64),
        _ => return Ok(None),
    };
    Ok(Some(value))
}

pub(crate) fn call(
    h: &StoreHandle<AbstractDb>,
    method: &str,
    args: &[HostValue],
) -> Result<HostValue, CallError> {
    resolve!(
        AbstractDb::KIND,
        method,
        extras(h, method, args),
        methods::flat(h, method, args),
        methods::scan(h, method, args),
        methods::lifecycle(h, method, args),
    )
}
