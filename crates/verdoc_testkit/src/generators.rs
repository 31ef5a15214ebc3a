//! Property-based test generators using proptest.
//!
//! Keys are drawn with dots on purpose so escaping has work to do.

use proptest::prelude::*;
use std::collections::BTreeMap;
use verdoc_storage::Value;

/// Strategy for text keys that often contain `.`.
pub fn dotted_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,4}(\\.[a-z0-9]{1,4}){0,2}").expect("Invalid regex")
}

/// Strategy for text keys that may already contain the dot stand-in.
pub fn stand_in_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z\u{2764}]{1,4}(\\.[a-z0-9\u{2764}]{1,4}){0,2}")
        .expect("Invalid regex")
}

/// Strategy for scalar values, including text with dots.
pub fn leaf_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        dotted_key_strategy().prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for map keys: mostly dotted text, sometimes integers.
pub fn map_key_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => dotted_key_strategy().prop_map(Value::Text),
        1 => any::<i32>().prop_map(|n| Value::Integer(i64::from(n))),
    ]
}

/// Strategy for nested values mixing maps, arrays, and sets.
pub fn nested_value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(4, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::set),
            prop::collection::vec((map_key_strategy(), inner), 0..5).prop_map(Value::Map),
        ]
    })
}

/// Strategy for nested maps whose keys mix dots and the dot stand-in.
pub fn stand_in_value_strategy() -> impl Strategy<Value = Value> {
    leaf_value_strategy().prop_recursive(3, 32, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::vec((stand_in_key_strategy().prop_map(Value::Text), inner), 0..5)
                .prop_map(Value::Map),
        ]
    })
}

/// Strategy for profile labels with dotted keys.
pub fn labels_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map(dotted_key_strategy(), "[a-z ]{0,12}", 0..6)
}

/// Strategy for note titles.
pub fn title_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 ]{1,24}").expect("Invalid regex")
}

/// Returns true if any text key anywhere in `value` contains `needle`.
pub fn any_text_key_contains(value: &Value, needle: &str) -> bool {
    match value {
        Value::Map(pairs) => pairs.iter().any(|(k, v)| {
            k.as_text().is_some_and(|k| k.contains(needle)) || any_text_key_contains(v, needle)
        }),
        Value::Array(items) | Value::Set(items) => {
            items.iter().any(|v| any_text_key_contains(v, needle))
        }
        _ => false,
    }
}

/// Replaces every text key with the empty string, leaving the rest.
///
/// Two values with equal shapes compare equal once their text keys are
/// erased.
pub fn erase_text_keys(value: &Value) -> Value {
    match value {
        Value::Map(pairs) => Value::Map(
            pairs
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(_) => Value::Text(String::new()),
                        other => other.clone(),
                    };
                    (key, erase_text_keys(v))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(erase_text_keys).collect()),
        Value::Set(items) => Value::set(items.iter().map(erase_text_keys).collect()),
        other => other.clone(),
    }
}
