//! Conversion between proto3 JSON values and runtime values.

use cel_walk::{MapKey, Value, ValueMap};

use crate::model::{JsonDouble, JsonNumber, ListValue, MapEntry, MapValue, ProtoValue};

/// A value that has no counterpart on the other side.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("unsupported map key kind: {0}")]
    UnsupportedKey(String),
    #[error("value of kind '{0}' has no proto form")]
    Unsupported(String),
}

/// Converts a test-file value into a runtime value.
pub fn from_proto(value: &ProtoValue) -> Result<Value, ValueError> {
    Ok(match value {
        ProtoValue::NullValue(_) => Value::Null,
        ProtoValue::BoolValue(b) => Value::Bool(*b),
        ProtoValue::Int64Value(n) => Value::Int(parse_number(n)?),
        ProtoValue::Uint64Value(n) => Value::UInt(parse_number(n)?),
        ProtoValue::DoubleValue(d) => Value::Double(parse_double(d)?),
        ProtoValue::StringValue(s) => Value::string(s.as_str()),
        ProtoValue::BytesValue(b) => Value::bytes(b.as_slice()),
        ProtoValue::ListValue(list) => Value::list(
            list.values
                .iter()
                .map(from_proto)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        ProtoValue::MapValue(map) => {
            let mut entries = ValueMap::new();
            for entry in &map.entries {
                let key = from_proto(&entry.key)?;
                let key = MapKey::from_value(&key)
                    .ok_or_else(|| ValueError::UnsupportedKey(key.kind_name().to_string()))?;
                entries.insert(key, from_proto(&entry.value)?);
            }
            Value::from(entries)
        }
    })
}

/// Converts a runtime value back into its test-file form.
pub fn to_proto(value: &Value) -> Result<ProtoValue, ValueError> {
    Ok(match value {
        Value::Null => ProtoValue::NullValue(None),
        Value::Bool(b) => ProtoValue::BoolValue(*b),
        Value::Int(i) => ProtoValue::Int64Value(JsonNumber::Number(*i)),
        Value::UInt(u) => ProtoValue::Uint64Value(JsonNumber::Number(*u)),
        Value::Double(d) if d.is_finite() => ProtoValue::DoubleValue(JsonDouble::Number(*d)),
        Value::Double(d) => ProtoValue::DoubleValue(JsonDouble::Text(
            if d.is_nan() {
                "NaN"
            } else if d.is_sign_positive() {
                "Infinity"
            } else {
                "-Infinity"
            }
            .to_string(),
        )),
        Value::String(s) => ProtoValue::StringValue(s.to_string()),
        Value::Bytes(b) => ProtoValue::BytesValue(b.to_vec()),
        Value::List(items) => ProtoValue::ListValue(ListValue {
            values: items.iter().map(to_proto).collect::<Result<_, _>>()?,
        }),
        Value::Map(map) => ProtoValue::MapValue(MapValue {
            entries: map
                .iter()
                .map(|(key, value)| {
                    Ok(MapEntry {
                        key: to_proto(&key.to_value())?,
                        value: to_proto(value)?,
                    })
                })
                .collect::<Result<_, ValueError>>()?,
        }),
        other => return Err(ValueError::Unsupported(other.kind_name().to_string())),
    })
}

fn parse_number<T: std::str::FromStr + Copy>(n: &JsonNumber<T>) -> Result<T, ValueError> {
    match n {
        JsonNumber::Number(n) => Ok(*n),
        JsonNumber::Text(text) => text
            .parse()
            .map_err(|_| ValueError::InvalidNumber(text.clone())),
    }
}

fn parse_double(d: &JsonDouble) -> Result<f64, ValueError> {
    match d {
        JsonDouble::Number(n) => Ok(*n),
        JsonDouble::Text(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other
                .parse()
                .map_err(|_| ValueError::InvalidNumber(text.clone())),
        },
    }
}

/// Structural match used to compare results: kinds must agree, NaN
/// matches NaN, and maps match regardless of entry order.
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Double(a), Value::Double(e)) => (a.is_nan() && e.is_nan()) || a == e,
        (Value::List(a), Value::List(e)) => {
            a.len() == e.len() && a.iter().zip(e.iter()).all(|(a, e)| values_match(a, e))
        }
        (Value::Map(a), Value::Map(e)) => {
            a.len() == e.len()
                && e.iter().all(|(key, expected)| {
                    a.get(key).is_some_and(|actual| values_match(actual, expected))
                })
        }
        _ => actual == expected,
    }
}
