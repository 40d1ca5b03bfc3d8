//! Conversions between JavaScript values and native parameters.
//!
//! Keys, values and column names are stringified the way JavaScript's
//! `String()` does it. `null` and `undefined` elements of arrays and
//! records are skipped. A required argument that is `undefined` is treated
//! as missing.

use cabinet_bind::{to_int32, to_int64};
use cabinet_engine::{NativeList, NativeMap, OpenMode};
use napi::{Env, Error, JsObject, JsString, JsUnknown, Result, Status, ValueType};

/// Error thrown for a missing or mistyped argument.
pub(crate) fn bad_arguments() -> Error {
    Error::new(Status::InvalidArg, "Bad arguments")
}

fn is_nullish(value: &JsUnknown) -> Result<bool> {
    Ok(matches!(value.get_type()?, ValueType::Null | ValueType::Undefined))
}

/// A required argument of any type, stringified.
pub(crate) fn bytes(value: JsUnknown) -> Result<Vec<u8>> {
    if value.get_type()? == ValueType::Undefined {
        return Err(bad_arguments());
    }
    Ok(value.coerce_to_string()?.into_utf8()?.into_owned()?.into_bytes())
}

/// An optional argument of any type; `null` and `undefined` are absent.
pub(crate) fn opt_bytes(value: Option<JsUnknown>) -> Result<Option<Vec<u8>>> {
    match value {
        Some(value) if !is_nullish(&value)? => bytes(value).map(Some),
        _ => Ok(None),
    }
}

/// An optional flag using JavaScript truthiness.
pub(crate) fn flag(value: Option<JsUnknown>) -> Result<bool> {
    match value {
        Some(value) => value.coerce_to_bool()?.get_value(),
        None => Ok(false),
    }
}

/// Array elements, stringified, without the nullish ones.
pub(crate) fn sequence(items: Vec<JsUnknown>) -> Result<NativeList> {
    let mut list = Vec::with_capacity(items.len());
    for item in items {
        if !is_nullish(&item)? {
            list.push(bytes(item)?);
        }
    }
    Ok(list)
}

/// A plain object's enumerable properties as a native record.
pub(crate) fn record(value: JsUnknown) -> Result<NativeMap> {
    if value.get_type()? != ValueType::Object || value.is_array()? {
        return Err(bad_arguments());
    }
    let object = JsObject::try_from(value)?;
    let names = object.get_property_names()?;
    let mut map = NativeMap::new();
    for i in 0..names.get_array_length()? {
        let name: JsString = names.get_element(i)?;
        let name = name.into_utf8()?.into_owned()?;
        let column: JsUnknown = object.get_named_property(&name)?;
        if !is_nullish(&column)? {
            map.insert(name.into_bytes(), bytes(column)?);
        }
    }
    Ok(map)
}

/// Native bytes as a JavaScript string.
pub(crate) fn text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// A native list as an array of strings.
pub(crate) fn strings(list: NativeList) -> Vec<String> {
    list.into_iter().map(text).collect()
}

/// A native record as a plain object, in column order.
pub(crate) fn record_object(env: &Env, map: NativeMap) -> Result<JsObject> {
    let mut object = env.create_object()?;
    for (column, value) in map {
        let value = env.create_string(&text(value))?;
        object.set_named_property(&text(column), value)?;
    }
    Ok(object)
}

/// An optional 32-bit tuning parameter; absent means engine default.
pub(crate) fn tuning32(n: Option<f64>) -> i64 {
    n.map_or(-1, |n| i64::from(to_int32(n)))
}

/// An optional 64-bit tuning parameter; absent means engine default.
pub(crate) fn tuning64(n: Option<f64>) -> i64 {
    n.map_or(-1, to_int64)
}

/// Open mode bits, defaulting to read-only.
pub(crate) fn open_mode(mode: Option<f64>) -> OpenMode {
    OpenMode::from_bits(mode.map_or(OpenMode::READER.bits() as i64, |m| i64::from(to_int32(m))))
}
