//! Dynamic document value type.

use crate::id::RecordId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A dynamic document value.
///
/// Map keys are arbitrary values, so a nested map may carry integer or
/// boolean keys next to text keys. Only text keys are subject to the
/// store's key restrictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Store-assigned record identifier.
    Id(RecordId),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Unordered collection of distinct values, kept sorted.
    Set(Vec<Value>),
    /// Map of key-value pairs, in insertion order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Creates a set value, sorting and deduplicating the members.
    pub fn set(mut items: Vec<Value>) -> Self {
        items.sort();
        items.dedup();
        Value::Set(items)
    }

    /// Creates a map value from text-keyed pairs.
    pub fn text_map<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Rank of the value's type bracket in the sort order.
    ///
    /// Integers and floats share a bracket so that they compare numerically.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Map(_) => 3,
            Value::Array(_) => 4,
            Value::Set(_) => 5,
            Value::Bytes(_) => 6,
            Value::Id(_) => 7,
            Value::Bool(_) => 8,
        }
    }

    /// Returns true if both values fall in the same comparison bracket.
    ///
    /// Range conditions only match values of the same bracket.
    pub fn same_kind(&self, other: &Value) -> bool {
        self.type_rank() == other.type_rank()
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as a record id, if it is one.
    pub fn as_id(&self) -> Option<RecordId> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a text key in this map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follows a dotted path through nested text-keyed maps.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |value, segment| value.get(segment))
    }

    /// Converts into a JSON value.
    ///
    /// Non-text map keys are rendered with their JSON form as the key.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Integer(n) => Json::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Value::Id(id) => Json::String(id.to_hex()),
            Value::Array(items) | Value::Set(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(pairs) => {
                let mut object = serde_json::Map::with_capacity(pairs.len());
                for (key, value) in pairs {
                    let key = match key {
                        Value::Text(s) => s.clone(),
                        other => other.to_json().to_string(),
                    };
                    object.insert(key, value.to_json());
                }
                Json::Object(object)
            }
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        let rank = self.type_rank().cmp(&other.type_rank());
        if rank != Ordering::Equal {
            return rank;
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b))
            }
            (Value::Integer(a), Value::Float(b)) => cmp_integer_float(*a, *b),
            (Value::Float(a), Value::Integer(b)) => cmp_integer_float(*b, *a).reverse(),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Id(a), Value::Id(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Array(a), Value::Array(b)) | (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Exact ordering of an integer against a float.
///
/// NaNs sort at the ends by sign, as `total_cmp` places them.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn cmp_integer_float(a: i64, b: f64) -> Ordering {
    const BOUND: f64 = 9_223_372_036_854_775_808.0;

    if b.is_nan() {
        return if b.is_sign_negative() {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }
    if b >= BOUND {
        return Ordering::Less;
    }
    if b < -BOUND {
        return Ordering::Greater;
    }
    let whole = b.trunc();
    match a.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(b - whole)).unwrap_or(Ordering::Equal),
        unequal => unequal,
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Id(id)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Integer(2), Value::Float(2.0));
        assert!(Value::Integer(1) < Value::Float(1.5));
        assert!(Value::Float(-3.0) < Value::Integer(0));
        assert!(Value::Float(-1.5) < Value::Integer(-1));
        assert!(Value::Integer(-2) < Value::Float(-1.5));
        assert_eq!(Value::Float(-0.0), Value::Integer(0));
        assert_eq!(Value::Float(-0.0), Value::Float(0.0));
    }

    #[test]
    fn large_integers_compare_exactly_against_floats() {
        let big = 1_i64 << 53;
        let float = Value::Float(big as f64);
        assert_eq!(Value::Integer(big), float);
        assert!(Value::Integer(big + 1) > float);
        assert_ne!(Value::Integer(big + 1), float);

        assert!(Value::Integer(i64::MAX) < Value::Float(9_223_372_036_854_775_808.0));
        assert!(Value::Integer(i64::MIN) == Value::Float(-9_223_372_036_854_775_808.0));
        assert!(Value::Integer(i64::MIN) > Value::Float(f64::NEG_INFINITY));
        assert!(Value::Integer(i64::MAX) < Value::Float(f64::NAN));
        assert!(Value::Integer(i64::MIN) > Value::Float(-f64::NAN));

        let mut keys = std::collections::BTreeSet::new();
        keys.insert(Value::Integer(big));
        keys.insert(Value::Integer(big + 1));
        assert!(keys.contains(&float));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn accessors_match_kind() {
        assert_eq!(Value::Float(0.5).as_float(), Some(0.5));
        assert_eq!(Value::Integer(3).as_float(), Some(3.0));
        assert_eq!(Value::Text("3".into()).as_float(), None);

        let array = Value::Array(vec![1.into(), "two".into()]);
        assert_eq!(array.as_array().map(<[Value]>::len), Some(2));
        assert_eq!(Value::set(vec![1.into()]).as_array(), None);
    }

    #[test]
    fn type_brackets_order_before_content() {
        assert!(Value::Null < Value::Integer(i64::MIN));
        assert!(Value::Integer(i64::MAX) < Value::Text(String::new()));
        assert!(Value::Text("zzz".into()) < Value::Bool(false));
        assert!(!Value::Integer(1).same_kind(&Value::Text("1".into())));
    }

    #[test]
    fn set_is_sorted_and_deduplicated() {
        let set = Value::set(vec![3.into(), 1.into(), 3.into(), 2.into()]);
        assert_eq!(set, Value::Set(vec![1.into(), 2.into(), 3.into()]));
    }

    #[test]
    fn get_path_walks_text_keys() {
        let value = Value::text_map([(
            "outer",
            Value::text_map([("inner", Value::Integer(7))]),
        )]);
        assert_eq!(value.get_path("outer.inner"), Some(&Value::Integer(7)));
        assert_eq!(value.get_path("outer.missing"), None);
        assert_eq!(value.get_path("outer.inner.deeper"), None);
    }

    #[test]
    fn non_text_keys_are_not_found_by_name() {
        let value = Value::Map(vec![(Value::Integer(1), Value::Text("one".into()))]);
        assert_eq!(value.get("1"), None);
    }

    #[test]
    fn json_rendering() {
        let value = Value::Map(vec![
            (Value::Text("name".into()), Value::Text("a".into())),
            (Value::Integer(5), Value::Bool(true)),
            (Value::Text("tags".into()), Value::set(vec!["x".into()])),
        ]);
        let json = value.to_json();
        assert_eq!(json["name"], "a");
        assert_eq!(json["5"], true);
        assert_eq!(json["tags"][0], "x");
    }

    #[test]
    fn option_conversion() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
