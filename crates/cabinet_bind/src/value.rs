//! Dynamic host values.
//!
//! [`HostValue`] models what a single-threaded dynamic runtime hands to a
//! native extension: primitives, byte strings, arrays, plain objects,
//! functions and wrapped native instances. Composite values are shared
//! through `Rc`, so a `HostValue` is `!Send` and never leaves the host
//! thread.

use crate::error::HostException;
use crate::instance::Instance;
use std::fmt;
use std::rc::Rc;

/// A callable host function.
pub type HostFunction = Rc<dyn Fn(&[HostValue]) -> Result<HostValue, HostException>>;

/// A value owned by the host runtime.
#[derive(Clone, Default)]
pub enum HostValue {
    /// `undefined`.
    #[default]
    Undefined,
    /// `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// A byte string. Embedded NUL bytes are preserved.
    String(Rc<[u8]>),
    /// An ordered array.
    Array(Rc<[HostValue]>),
    /// A plain object with unique keys in property order.
    Object(Rc<[(Vec<u8>, HostValue)]>),
    /// A function.
    Function(HostFunction),
    /// A wrapped native object.
    Instance(Rc<Instance>),
}

impl HostValue {
    /// Builds a string value from raw bytes.
    pub fn string(bytes: impl AsRef<[u8]>) -> Self {
        HostValue::String(Rc::from(bytes.as_ref()))
    }

    /// Builds a number value.
    pub fn number(n: impl Into<f64>) -> Self {
        HostValue::Number(n.into())
    }

    /// Builds an array value.
    pub fn array(items: impl IntoIterator<Item = HostValue>) -> Self {
        HostValue::Array(items.into_iter().collect())
    }

    /// Builds an object value. A repeated key keeps its first position and
    /// its last value.
    pub fn object<K: AsRef<[u8]>>(entries: impl IntoIterator<Item = (K, HostValue)>) -> Self {
        let mut props: Vec<(Vec<u8>, HostValue)> = Vec::new();
        for (key, value) in entries {
            let key = key.as_ref();
            match props.iter_mut().find(|(k, _)| k.as_slice() == key) {
                Some(slot) => slot.1 = value,
                None => props.push((key.to_vec(), value)),
            }
        }
        HostValue::Object(props.into())
    }

    /// Wraps a closure as a host function.
    pub fn function(
        f: impl Fn(&[HostValue]) -> Result<HostValue, HostException> + 'static,
    ) -> Self {
        HostValue::Function(Rc::new(f))
    }

    /// True for `null` and `undefined`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, HostValue::Undefined | HostValue::Null)
    }

    /// Raw bytes of a string value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostValue::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Numeric value of a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            HostValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean value of a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of an array.
    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Properties of an object.
    pub fn as_object(&self) -> Option<&[(Vec<u8>, HostValue)]> {
        match self {
            HostValue::Object(props) => Some(props),
            _ => None,
        }
    }

    /// The wrapped native object of an instance.
    pub fn as_instance(&self) -> Option<&Rc<Instance>> {
        match self {
            HostValue::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Property `key` of an object.
    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&HostValue> {
        let key = key.as_ref();
        self.as_object()?
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v)
    }

    /// Host type name, as `typeof` would report it.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null | HostValue::Array(_) | HostValue::Object(_) => "object",
            HostValue::Instance(_) => "object",
            HostValue::Bool(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Function(_) => "function",
        }
    }

    /// The host's "to string" conversion, as raw bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            HostValue::Undefined => b"undefined".to_vec(),
            HostValue::Null => b"null".to_vec(),
            HostValue::Bool(b) => b.to_string().into_bytes(),
            HostValue::Number(n) => number_to_string(*n).into_bytes(),
            HostValue::String(bytes) => bytes.to_vec(),
            HostValue::Array(items) => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    if !item.is_nullish() {
                        out.extend_from_slice(&item.to_bytes());
                    }
                }
                out
            }
            HostValue::Object(_) | HostValue::Instance(_) => b"[object Object]".to_vec(),
            HostValue::Function(_) => b"function () { [native code] }".to_vec(),
        }
    }
}

/// Renders a number the way the host prints it.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return n.to_string();
    }
    let text = format!("{n:e}");
    match text.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
        _ => text,
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::string(s)
    }
}

impl From<f64> for HostValue {
    fn from(n: f64) -> Self {
        HostValue::Number(n)
    }
}

impl From<i32> for HostValue {
    fn from(n: i32) -> Self {
        HostValue::Number(f64::from(n))
    }
}

impl From<Option<Vec<u8>>> for HostValue {
    fn from(bytes: Option<Vec<u8>>) -> Self {
        bytes.map_or(HostValue::Null, HostValue::string)
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Undefined, HostValue::Undefined) => true,
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Number(a), HostValue::Number(b)) => a == b,
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Array(a), HostValue::Array(b)) => a == b,
            (HostValue::Object(a), HostValue::Object(b)) => a == b,
            (HostValue::Function(a), HostValue::Function(b)) => Rc::ptr_eq(a, b),
            (HostValue::Instance(a), HostValue::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Undefined => f.write_str("undefined"),
            HostValue::Null => f.write_str("null"),
            HostValue::Bool(b) => write!(f, "{b}"),
            HostValue::Number(n) => f.write_str(&number_to_string(*n)),
            HostValue::String(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            HostValue::Array(items) => f.debug_list().entries(items.iter()).finish(),
            HostValue::Object(props) => f
                .debug_map()
                .entries(
                    props
                        .iter()
                        .map(|(k, v)| (String::from_utf8_lossy(k), v)),
                )
                .finish(),
            HostValue::Function(_) => f.write_str("[Function]"),
            HostValue::Instance(instance) => write!(f, "[object {}]", instance.class()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_like_the_host() {
        assert_eq!(number_to_string(1.0), "1");
        assert_eq!(number_to_string(1.5), "1.5");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(number_to_string(-42.0), "-42");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1.5e-7), "1.5e-7");
    }

    #[test]
    fn scalars_to_bytes() {
        assert_eq!(HostValue::Bool(true).to_bytes(), b"true");
        assert_eq!(HostValue::Null.to_bytes(), b"null");
        assert_eq!(HostValue::Undefined.to_bytes(), b"undefined");
        assert_eq!(HostValue::string(b"a\0b").to_bytes(), b"a\0b");
        assert_eq!(
            HostValue::array([1.into(), HostValue::Null, "x".into()]).to_bytes(),
            b"1,,x"
        );
        assert_eq!(HostValue::object([("a", 1.into())]).to_bytes(), b"[object Object]");
    }

    #[test]
    fn object_keys_are_unique() {
        let obj = HostValue::object([("a", 1.into()), ("b", 2.into()), ("a", 3.into())]);
        let props = obj.as_object().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].0, b"a");
        assert_eq!(obj.get("a"), Some(&HostValue::Number(3.0)));
        assert_eq!(obj.get("zz"), None);
    }

    #[test]
    fn type_names() {
        assert_eq!(HostValue::Undefined.type_name(), "undefined");
        assert_eq!(HostValue::Null.type_name(), "object");
        assert_eq!(HostValue::function(|_| Ok(HostValue::Undefined)).type_name(), "function");
        assert!(HostValue::Null.is_nullish());
        assert!(!HostValue::Bool(false).is_nullish());
    }

    #[test]
    fn functions_compare_by_identity() {
        let f = HostValue::function(|_| Ok(HostValue::Null));
        let g = HostValue::function(|_| Ok(HostValue::Null));
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }
}
