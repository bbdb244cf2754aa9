//! The preference value model.
//!
//! A stored preference is always one of six kinds. [`Value`] is the closed sum
//! type over those kinds and [`ValueKind`] is its tag, whose numeric code is
//! shared by the on-disk table, the backup document and the legacy database.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Number, Value as Json};

use crate::error::ValueError;

/// Type tag of a [`Value`].
///
/// The discriminants are the wire codes used by backup documents and the
/// legacy `valueType` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ValueKind {
    Boolean = 0,
    Float = 1,
    Int = 2,
    Long = 3,
    String = 4,
    StringSet = 5,
}

impl ValueKind {
    /// Every kind, in code order.
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Boolean,
        ValueKind::Float,
        ValueKind::Int,
        ValueKind::Long,
        ValueKind::String,
        ValueKind::StringSet,
    ];

    /// Numeric wire code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Try to parse from a numeric wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Boolean),
            1 => Some(Self::Float),
            2 => Some(Self::Int),
            3 => Some(Self::Long),
            4 => Some(Self::String),
            5 => Some(Self::StringSet),
            _ => None,
        }
    }

    /// Symbolic name, as accepted by [`ValueKind::from_tag`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Float => "FLOAT",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::String => "STRING",
            Self::StringSet => "STRING_SET",
        }
    }

    /// Try to parse from a symbolic name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Decode a backup `type` field.
    ///
    /// Decoding is lenient about the form of the tag: an integer code, any
    /// number (truncated to a code) or a symbolic name are all accepted. A tag
    /// that resolves to no kind is an error.
    pub fn from_tag(tag: &Json) -> Result<Self, ValueError> {
        let kind = match tag {
            Json::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .and_then(Self::from_code),
            Json::String(name) => Self::from_name(name),
            _ => None,
        };
        kind.ok_or_else(|| ValueError::UnknownKind(tag.to_string()))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored preference value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Float(f32),
    Int(i32),
    Long(i64),
    String(String),
    StringSet(BTreeSet<String>),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Float(_) => ValueKind::Float,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::String(_) => ValueKind::String,
            Value::StringSet(_) => ValueKind::StringSet,
        }
    }

    /// Check that the value can be stored durably.
    ///
    /// Only finite floats are representable in SQLite and in JSON.
    pub fn validate(&self) -> Result<(), ValueError> {
        match self {
            Value::Float(f) if !f.is_finite() => Err(ValueError::NonFinite(*f)),
            _ => Ok(()),
        }
    }

    /// Encode as the JSON `value` field of a backup holder.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Boolean(b) => Json::Bool(*b),
            Value::Float(f) => Number::from_f64(f64::from(*f))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Int(i) => Json::from(*i),
            Value::Long(l) => Json::from(*l),
            Value::String(s) => Json::String(s.clone()),
            Value::StringSet(set) => Json::Array(set.iter().cloned().map(Json::String).collect()),
        }
    }

    /// Decode a JSON `value` field as the given kind.
    ///
    /// Strict: the JSON shape must match the kind.
    pub fn from_json(kind: ValueKind, json: &Json) -> Result<Self, ValueError> {
        let mismatch = || ValueError::Mismatch {
            expected: kind,
            found: json_type_name(json).to_string(),
        };
        match kind {
            ValueKind::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
            ValueKind::Float => {
                let f = json.as_f64().ok_or_else(mismatch)? as f32;
                if f.is_finite() {
                    Ok(Value::Float(f))
                } else {
                    Err(ValueError::OutOfRange(kind, json.to_string()))
                }
            }
            ValueKind::Int => {
                let i = json.as_i64().ok_or_else(mismatch)?;
                i32::try_from(i)
                    .map(Value::Int)
                    .map_err(|_| ValueError::OutOfRange(kind, i.to_string()))
            }
            ValueKind::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
            ValueKind::String => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            ValueKind::StringSet => {
                let items = json.as_array().ok_or_else(mismatch)?;
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string).ok_or_else(mismatch))
                    .collect::<Result<BTreeSet<_>, _>>()
                    .map(Value::StringSet)
            }
        }
    }
}

fn json_type_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "integer",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::String(s) => f.write_str(s),
            Value::StringSet(set) => {
                f.write_str("[")?;
                for (i, item) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<BTreeSet<String>> for Value {
    fn from(set: BTreeSet<String>) -> Self {
        Value::StringSet(set)
    }
}

/// A Rust type that can be read from and written to the store.
///
/// Reading yields `None` when the stored kind does not convert. The two
/// integer kinds read into each other where the value fits, because legacy
/// data stores every integer as a Long.
pub trait PreferenceValue: Clone + PartialEq + Send + Sync + 'static {
    /// The kind written by [`PreferenceValue::into_value`].
    const KIND: ValueKind;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl PreferenceValue for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }
}

impl PreferenceValue for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl PreferenceValue for i32 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Long(l) => i32::try_from(*l).ok(),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl PreferenceValue for i64 {
    const KIND: ValueKind = ValueKind::Long;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Long(l) => Some(*l),
            Value::Int(i) => Some(i64::from(*i)),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Long(self)
    }
}

impl PreferenceValue for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl PreferenceValue for BTreeSet<String> {
    const KIND: ValueKind = ValueKind::StringSet;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::StringSet(set) => Some(set.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::StringSet(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_codes_roundtrip() {
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_code(i64::from(kind.code())), Some(kind));
            assert_eq!(ValueKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ValueKind::from_code(6), None);
        assert_eq!(ValueKind::from_code(-1), None);
    }

    #[test]
    fn test_tag_decoding_is_lenient() {
        assert_eq!(ValueKind::from_tag(&json!(4)).unwrap(), ValueKind::String);
        assert_eq!(ValueKind::from_tag(&json!(3.0)).unwrap(), ValueKind::Long);
        assert_eq!(ValueKind::from_tag(&json!(1.9)).unwrap(), ValueKind::Float);
        assert_eq!(
            ValueKind::from_tag(&json!("STRING_SET")).unwrap(),
            ValueKind::StringSet
        );
    }

    #[test]
    fn test_unknown_tag_is_error() {
        assert!(matches!(
            ValueKind::from_tag(&json!(9)),
            Err(ValueError::UnknownKind(_))
        ));
        assert!(ValueKind::from_tag(&json!("string")).is_err());
        assert!(ValueKind::from_tag(&json!(null)).is_err());
        assert!(ValueKind::from_tag(&json!([0])).is_err());
    }

    #[test]
    fn test_json_roundtrip_each_kind() {
        let values = [
            Value::Boolean(true),
            Value::Float(1.5),
            Value::Int(-7),
            Value::Long(1 << 40),
            Value::String("socks".into()),
            Value::StringSet(["a".to_string(), "b".to_string()].into()),
        ];
        for value in values {
            let decoded = Value::from_json(value.kind(), &value.to_json()).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_from_json_rejects_mismatch() {
        assert!(matches!(
            Value::from_json(ValueKind::Boolean, &json!("true")),
            Err(ValueError::Mismatch { expected: ValueKind::Boolean, .. })
        ));
        assert!(Value::from_json(ValueKind::Long, &json!(1.5)).is_err());
        assert!(Value::from_json(ValueKind::StringSet, &json!(["a", 1])).is_err());
        assert!(Value::from_json(ValueKind::String, &json!(null)).is_err());
    }

    #[test]
    fn test_int_out_of_range() {
        assert!(matches!(
            Value::from_json(ValueKind::Int, &json!(i64::MAX)),
            Err(ValueError::OutOfRange(ValueKind::Int, _))
        ));
    }

    #[test]
    fn test_non_finite_float_rejected() {
        assert!(Value::Float(f32::NAN).validate().is_err());
        assert!(Value::Float(f32::INFINITY).validate().is_err());
        assert!(Value::Float(0.25).validate().is_ok());
    }

    #[test]
    fn test_integer_kinds_read_into_each_other() {
        assert_eq!(i32::from_value(&Value::Long(9000)), Some(9000));
        assert_eq!(i32::from_value(&Value::Long(i64::MAX)), None);
        assert_eq!(i64::from_value(&Value::Int(-3)), Some(-3));
        assert_eq!(bool::from_value(&Value::Int(1)), None);
    }

    #[test]
    fn test_display() {
        let set = Value::StringSet(["b".to_string(), "a".to_string()].into());
        assert_eq!(set.to_string(), "[a, b]");
        assert_eq!(Value::Boolean(false).to_string(), "false");
        assert_eq!(Value::String("x".into()).to_string(), "x");
    }
}
