//! Conversions between host values and native lists and maps.
//!
//! Every byte string crosses the boundary as an owned slice with its own
//! length, so embedded NUL bytes survive both directions.

use crate::value::HostValue;
use cabinet_engine::{NativeList, NativeMap};

/// Builds a native list from host array elements.
///
/// Each element goes through the host "to string" rule. `null` and
/// `undefined` elements are skipped.
pub fn sequence_to_native(items: &[HostValue]) -> NativeList {
    items
        .iter()
        .filter(|item| !item.is_nullish())
        .map(HostValue::to_bytes)
        .collect()
}

/// Builds a host array of byte strings, in native order.
pub fn native_to_sequence(list: NativeList) -> HostValue {
    HostValue::array(list.into_iter().map(HostValue::string))
}

/// Builds a native map from host object properties.
///
/// Properties whose value is `null` or `undefined` are dropped.
pub fn record_to_native(props: &[(Vec<u8>, HostValue)]) -> NativeMap {
    props
        .iter()
        .filter(|(_, value)| !value.is_nullish())
        .map(|(key, value)| (key.clone(), value.to_bytes()))
        .collect()
}

/// Builds a host object in native (key-sorted) order.
pub fn native_to_record(map: NativeMap) -> HostValue {
    HostValue::object(
        map.into_iter()
            .map(|(key, value)| (key, HostValue::string(value))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sequence_skips_nullish() {
        let items = [
            HostValue::from("a"),
            HostValue::Null,
            HostValue::from(2),
            HostValue::Undefined,
            HostValue::Bool(false),
        ];
        assert_eq!(
            sequence_to_native(&items),
            vec![b"a".to_vec(), b"2".to_vec(), b"false".to_vec()]
        );
    }

    #[test]
    fn record_drops_nullish() {
        let obj = HostValue::object([
            ("name", HostValue::from("ann")),
            ("gone", HostValue::Null),
            ("age", HostValue::from(30)),
            ("also", HostValue::Undefined),
        ]);
        let map = record_to_native(obj.as_object().unwrap());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(b"age".as_slice()), Some(&b"30".to_vec()));
    }

    #[test]
    fn embedded_nul_survives() {
        let list = vec![b"a\0b".to_vec(), b"\0".to_vec()];
        let host = native_to_sequence(list.clone());
        assert_eq!(sequence_to_native(host.as_array().unwrap()), list);
    }

    #[test]
    fn record_comes_back_key_sorted() {
        let map: NativeMap = [(b"b".to_vec(), b"2".to_vec()), (b"a".to_vec(), b"1".to_vec())]
            .into_iter()
            .collect();
        let obj = native_to_record(map);
        let keys: Vec<&[u8]> = obj.as_object().unwrap().iter().map(|(k, _)| k.as_slice()).collect();
        assert_eq!(keys, vec![b"a".as_slice(), b"b".as_slice()]);
    }

    proptest! {
        #[test]
        fn sequence_round_trip(list in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..16), 0..32)) {
            let host = native_to_sequence(list.clone());
            prop_assert_eq!(sequence_to_native(host.as_array().unwrap()), list);
        }

        #[test]
        fn record_round_trip(
            entries in prop::collection::btree_map(
                prop::collection::vec(any::<u8>(), 0..8),
                prop::option::of(prop::collection::vec(any::<u8>(), 0..16)),
                0..16,
            )
        ) {
            let obj = HostValue::object(entries.iter().map(|(k, v)| {
                (k.clone(), v.clone().map_or(HostValue::Null, HostValue::string))
            }));
            let native = record_to_native(obj.as_object().unwrap());
            let back = native_to_record(native);

            let expected: NativeMap = entries
                .into_iter()
                .filter_map(|(k, v)| v.map(|v| (k, v)))
                .collect();
            let got: NativeMap = back
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.clone(), v.as_bytes().unwrap().to_vec()))
                .collect();
            prop_assert_eq!(got, expected);
        }
    }
}
