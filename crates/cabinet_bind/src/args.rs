//! Argument validation.
//!
//! Every exposed operation declares its parameters as a slice of [`Param`].
//! [`bind`] checks a call against it and yields [`Args`], whose accessors
//! coerce values into native parameter types. A required parameter that is
//! missing or has the wrong type fails with [`ArgumentError`]. An optional
//! parameter that is missing, `null` or `undefined` takes its declared
//! fallback.

use crate::error::ArgumentError;
use crate::instance::Instance;
use crate::value::{HostFunction, HostValue};
use cabinet_engine::BackendKind;
use std::rc::Rc;

/// Accepted type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    /// Anything, as long as the argument is present.
    Any,
    /// A number.
    Number,
    /// A string.
    String,
    /// An array.
    Array,
    /// A plain object.
    Object,
    /// A function.
    Function,
    /// A wrapped native object of the given class.
    Instance(BackendKind),
}

impl ArgType {
    fn accepts(self, value: &HostValue) -> bool {
        match self {
            ArgType::Any => true,
            ArgType::Number => matches!(value, HostValue::Number(_)),
            ArgType::String => matches!(value, HostValue::String(_)),
            ArgType::Array => matches!(value, HostValue::Array(_)),
            ArgType::Object => matches!(value, HostValue::Object(_)),
            ArgType::Function => matches!(value, HostValue::Function(_)),
            ArgType::Instance(kind) => {
                matches!(value, HostValue::Instance(instance) if instance.class() == kind)
            }
        }
    }
}

/// Value an optional parameter takes when omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// A fixed integer, such as `-1` for "engine default".
    Int(i64),
    /// No value; accessors report `None`.
    Absent,
}

/// One declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    /// Must be present and of the given type.
    Required(ArgType),
    /// May be omitted or nullish.
    Optional(ArgType, Fallback),
}

/// Shorthand for a required parameter of any type.
pub const ANY: Param = Param::Required(ArgType::Any);
/// Shorthand for a required number.
pub const NUMBER: Param = Param::Required(ArgType::Number);
/// Shorthand for a required string.
pub const STRING: Param = Param::Required(ArgType::String);
/// Shorthand for an optional number defaulting to `-1`.
pub const TUNING: Param = Param::Optional(ArgType::Number, Fallback::Int(-1));

#[derive(Debug, Clone)]
enum Slot {
    Given(HostValue),
    Default(Fallback),
}

/// Arguments that passed validation.
#[derive(Debug, Clone)]
pub struct Args {
    slots: Vec<Slot>,
}

/// Checks `values` against `params`.
pub fn bind(values: &[HostValue], params: &[Param]) -> Result<Args, ArgumentError> {
    let mut slots = Vec::with_capacity(params.len());
    for (position, param) in params.iter().enumerate() {
        let value = values.get(position);
        let slot = match (*param, value) {
            (Param::Required(ty), Some(value)) if ty.accepts(value) => Slot::Given(value.clone()),
            (Param::Required(_), _) => return Err(ArgumentError { position }),
            (Param::Optional(_, fallback), None) => Slot::Default(fallback),
            (Param::Optional(_, fallback), Some(value)) if value.is_nullish() => {
                Slot::Default(fallback)
            }
            (Param::Optional(ty, _), Some(value)) if ty.accepts(value) => {
                Slot::Given(value.clone())
            }
            (Param::Optional(..), Some(_)) => return Err(ArgumentError { position }),
        };
        slots.push(slot);
    }
    Ok(Args { slots })
}

/// Truncates a host number to 64 bits. NaN becomes 0 and infinities
/// saturate.
pub fn to_int64(n: f64) -> i64 {
    if n.is_nan() {
        0
    } else {
        n.trunc() as i64
    }
}

/// Converts a host number to a 32-bit integer, wrapping modulo 2^32.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n.trunc().rem_euclid(4_294_967_296.0) as u32) as i32
}

impl Args {
    fn given(&self, i: usize) -> Option<&HostValue> {
        match self.slots.get(i) {
            Some(Slot::Given(value)) => Some(value),
            _ => None,
        }
    }

    /// True when argument `i` took its fallback.
    pub fn defaulted(&self, i: usize) -> bool {
        !matches!(self.slots.get(i), Some(Slot::Given(_)))
    }

    /// Argument `i` as bytes. Empty when absent.
    pub fn bytes(&self, i: usize) -> Vec<u8> {
        self.given(i).map(HostValue::to_bytes).unwrap_or_default()
    }

    /// Argument `i` as bytes, or `None` when absent.
    pub fn opt_bytes(&self, i: usize) -> Option<Vec<u8>> {
        self.given(i).map(HostValue::to_bytes)
    }

    /// Argument `i` as a string, for paths and names.
    pub fn text(&self, i: usize) -> String {
        String::from_utf8_lossy(&self.bytes(i)).into_owned()
    }

    /// Argument `i` truncated to 64 bits, or its integer fallback.
    pub fn int(&self, i: usize) -> i64 {
        match self.slots.get(i) {
            Some(Slot::Given(value)) => value.as_number().map_or(0, to_int64),
            Some(Slot::Default(Fallback::Int(n))) => *n,
            _ => 0,
        }
    }

    /// Argument `i` as a 32-bit integer, or its integer fallback.
    pub fn int32(&self, i: usize) -> i64 {
        match self.given(i) {
            Some(value) => i64::from(value.as_number().map_or(0, to_int32)),
            None => self.int(i),
        }
    }

    /// Argument `i` as a double. NaN when absent.
    pub fn float(&self, i: usize) -> f64 {
        self.given(i)
            .and_then(HostValue::as_number)
            .unwrap_or(f64::NAN)
    }

    /// Argument `i` as a boolean using host truthiness, or `default`.
    pub fn flag(&self, i: usize, default: bool) -> bool {
        match self.given(i) {
            Some(HostValue::Bool(b)) => *b,
            Some(HostValue::Number(n)) => *n != 0.0 && !n.is_nan(),
            Some(HostValue::String(s)) => !s.is_empty(),
            Some(HostValue::Undefined | HostValue::Null) => false,
            Some(_) => true,
            None => default,
        }
    }

    /// Argument `i` as array elements.
    pub fn array(&self, i: usize) -> Option<&[HostValue]> {
        self.given(i).and_then(HostValue::as_array)
    }

    /// Argument `i` as object properties.
    pub fn object(&self, i: usize) -> Option<&[(Vec<u8>, HostValue)]> {
        self.given(i).and_then(HostValue::as_object)
    }

    /// Argument `i` as a function.
    pub fn function(&self, i: usize) -> Option<HostFunction> {
        match self.given(i) {
            Some(HostValue::Function(f)) => Some(Rc::clone(f)),
            _ => None,
        }
    }

    /// Argument `i` as a wrapped native object.
    pub fn instance(&self, i: usize) -> Option<Rc<Instance>> {
        self.given(i).and_then(HostValue::as_instance).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: &[Param] = &[STRING, Param::Optional(ArgType::Number, Fallback::Int(1))];

    #[test]
    fn required_must_be_present_and_typed() {
        assert_eq!(bind(&[], OPEN).unwrap_err(), ArgumentError { position: 0 });
        assert_eq!(
            bind(&[HostValue::from(1)], OPEN).unwrap_err(),
            ArgumentError { position: 0 }
        );
        let args = bind(&["a.db".into()], OPEN).unwrap();
        assert_eq!(args.text(0), "a.db");
    }

    #[test]
    fn any_accepts_nullish_when_present() {
        let args = bind(&[HostValue::Null, HostValue::Undefined], &[ANY, ANY]).unwrap();
        assert_eq!(args.bytes(0), b"null");
        assert_eq!(args.bytes(1), b"undefined");
        assert!(bind(&[HostValue::Null], &[ANY, ANY]).is_err());
    }

    #[test]
    fn optional_takes_fallback() {
        let args = bind(&["p".into()], OPEN).unwrap();
        assert!(args.defaulted(1));
        assert_eq!(args.int(1), 1);

        let args = bind(&["p".into(), HostValue::Null], OPEN).unwrap();
        assert_eq!(args.int(1), 1);

        let args = bind(&["p".into(), 6.into()], OPEN).unwrap();
        assert!(!args.defaulted(1));
        assert_eq!(args.int(1), 6);

        assert_eq!(
            bind(&["p".into(), "6".into()], OPEN).unwrap_err(),
            ArgumentError { position: 1 }
        );
    }

    #[test]
    fn tuning_defaults_to_minus_one() {
        let args = bind(&vec![HostValue::Null; 4], &[TUNING; 4]).unwrap();
        assert!((0..4).all(|i| args.int(i) == -1));
    }

    #[test]
    fn absent_optional_without_value() {
        let params = [Param::Optional(ArgType::Number, Fallback::Absent)];
        let args = bind(&[], &params).unwrap();
        assert!(args.defaulted(0));
        assert_eq!(args.opt_bytes(0), None);
        assert!(args.float(0).is_nan());
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(to_int64(3.9), 3);
        assert_eq!(to_int64(-3.9), -3);
        assert_eq!(to_int64(f64::NAN), 0);
        assert_eq!(to_int64(1e300), i64::MAX);
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
        assert_eq!(to_int32(-1.5), -1);
    }

    #[test]
    fn function_and_array_accessors() {
        let params = [
            Param::Required(ArgType::Array),
            Param::Optional(ArgType::Function, Fallback::Absent),
        ];
        let f = HostValue::function(|_| Ok(HostValue::Undefined));
        let args = bind(&[HostValue::array(["a".into()]), f], &params).unwrap();
        assert_eq!(args.array(0).map(<[HostValue]>::len), Some(1));
        assert!(args.function(1).is_some());

        let args = bind(&[HostValue::array([])], &params).unwrap();
        assert!(args.function(1).is_none());
    }
}
