use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

/// Field name to value mapping; used for session answers and record payloads.
pub type Fields = BTreeMap<String, FieldValue>;

/// Every value type the document store can hold for a survey answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    /// Unset, blank text, or an empty collection.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::String(text) => text.trim().is_empty(),
            FieldValue::Array(values) => values.is_empty(),
            FieldValue::Map(fields) => fields.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(value) => Some(*value as f64),
            FieldValue::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn type_label(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Double(_) => "double",
            FieldValue::String(_) => "string",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::Array(_) => "array",
            FieldValue::Map(_) => "map",
        }
    }

    /// Converts a JSON answer. Integral numbers stay integers; RFC 3339 strings stay strings.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(flag) => FieldValue::Boolean(*flag),
            Value::Number(number) => match number.as_i64() {
                Some(integer) => FieldValue::Integer(integer),
                None => FieldValue::Double(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(text) => FieldValue::String(text.clone()),
            Value::Array(values) => {
                FieldValue::Array(values.iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), FieldValue::from_json(value)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Boolean(flag) => Value::Bool(*flag),
            FieldValue::Integer(value) => Value::Number(Number::from(*value)),
            FieldValue::Double(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(text) => Value::String(text.clone()),
            FieldValue::Timestamp(at) => Value::String(at.to_rfc3339()),
            FieldValue::Array(values) => {
                Value::Array(values.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, ""),
            FieldValue::Boolean(flag) => write!(f, "{}", flag),
            FieldValue::Integer(value) => write!(f, "{}", value),
            FieldValue::Double(value) => write!(f, "{}", value),
            FieldValue::String(text) => write!(f, "{}", text),
            FieldValue::Timestamp(at) => write!(f, "{}", at.to_rfc3339()),
            FieldValue::Array(values) => {
                let items = values.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{}", items.join(", "))
            }
            FieldValue::Map(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(values: Vec<FieldValue>) -> Self {
        FieldValue::Array(values)
    }
}

impl From<Fields> for FieldValue {
    fn from(fields: Fields) -> Self {
        FieldValue::Map(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_values_count_as_empty() {
        assert!(FieldValue::Null.is_empty());
        assert!(FieldValue::from("   ").is_empty());
        assert!(FieldValue::Array(vec![]).is_empty());
        assert!(!FieldValue::from(0_i64).is_empty());
        assert!(!FieldValue::from(false).is_empty());
    }

    #[test]
    fn json_integers_stay_integers() {
        let value = FieldValue::from_json(&json!({ "age": 30, "ratio": 0.5, "tags": ["a"] }));
        let FieldValue::Map(fields) = value else {
            panic!("expected map");
        };
        assert_eq!(fields["age"], FieldValue::Integer(30));
        assert_eq!(fields["ratio"], FieldValue::Double(0.5));
        assert_eq!(fields["tags"], FieldValue::Array(vec!["a".into()]));
    }

    #[test]
    fn display_joins_arrays() {
        let value = FieldValue::Array(vec!["Empleo".into(), "Salud".into()]);
        assert_eq!(value.to_string(), "Empleo, Salud");
    }
}
