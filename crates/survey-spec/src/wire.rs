//! Typed document encoding used by the Firestore REST API.
//!
//! Each [`FieldValue`] variant maps to exactly one tagged JSON object, e.g.
//! `{"integerValue": "30"}` or `{"mapValue": {"fields": {...}}}`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::value::{FieldValue, Fields};

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("field value at '{path}' is not a tagged object")]
    NotTagged { path: String },
    #[error("unsupported value tag '{tag}' at '{path}'")]
    UnknownTag { tag: String, path: String },
    #[error("malformed {tag} at '{path}'")]
    Malformed { tag: &'static str, path: String },
}

pub fn encode(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => encode_null(),
        FieldValue::Boolean(flag) => encode_boolean(*flag),
        FieldValue::Integer(number) => encode_integer(*number),
        FieldValue::Double(number) => encode_double(*number),
        FieldValue::String(text) => encode_string(text),
        FieldValue::Timestamp(at) => encode_timestamp(at),
        FieldValue::Array(values) => encode_array(values),
        FieldValue::Map(fields) => encode_map(fields),
    }
}

fn encode_null() -> Value {
    json!({ "nullValue": null })
}

fn encode_boolean(flag: bool) -> Value {
    json!({ "booleanValue": flag })
}

// int64 travels as a decimal string.
fn encode_integer(number: i64) -> Value {
    json!({ "integerValue": number.to_string() })
}

// JSON has no literal for NaN or the infinities; the REST API spells them as strings.
fn encode_double(number: f64) -> Value {
    if number.is_nan() {
        json!({ "doubleValue": "NaN" })
    } else if number.is_infinite() {
        let text = if number > 0.0 { "Infinity" } else { "-Infinity" };
        json!({ "doubleValue": text })
    } else {
        json!({ "doubleValue": number })
    }
}

fn encode_string(text: &str) -> Value {
    json!({ "stringValue": text })
}

fn encode_timestamp(at: &DateTime<Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
}

fn encode_array(values: &[FieldValue]) -> Value {
    json!({ "arrayValue": { "values": values.iter().map(encode).collect::<Vec<_>>() } })
}

fn encode_map(fields: &Fields) -> Value {
    json!({ "mapValue": { "fields": encode_fields(fields) } })
}

/// Encodes a top-level field mapping (the `fields` member of a document).
pub fn encode_fields(fields: &Fields) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode(value)))
            .collect::<Map<_, _>>(),
    )
}

/// Wraps fields into a document body for create and patch requests.
pub fn encode_document(fields: &Fields) -> Value {
    json!({ "fields": encode_fields(fields) })
}

pub fn decode(value: &Value) -> Result<FieldValue, WireError> {
    decode_at(value, "")
}

/// Decodes the `fields` member of a document; a missing member is an empty document.
pub fn decode_fields(fields: Option<&Value>) -> Result<Fields, WireError> {
    decode_fields_at(fields, "")
}

fn decode_fields_at(fields: Option<&Value>, path: &str) -> Result<Fields, WireError> {
    let Some(fields) = fields else {
        return Ok(Fields::new());
    };
    let map = fields.as_object().ok_or(WireError::Malformed {
        tag: "fields",
        path: path.to_string(),
    })?;
    map.iter()
        .map(|(key, value)| {
            let child = format!("{}/{}", path, key);
            decode_at(value, &child).map(|decoded| (key.clone(), decoded))
        })
        .collect()
}

fn decode_at(value: &Value, path: &str) -> Result<FieldValue, WireError> {
    let object = value.as_object().ok_or_else(|| WireError::NotTagged {
        path: path.to_string(),
    })?;
    let (tag, inner) = match object.iter().next() {
        Some(entry) if object.len() == 1 => entry,
        _ => {
            return Err(WireError::NotTagged {
                path: path.to_string(),
            });
        }
    };
    let malformed = |tag: &'static str| WireError::Malformed {
        tag,
        path: path.to_string(),
    };

    match tag.as_str() {
        "nullValue" => Ok(FieldValue::Null),
        "booleanValue" => inner
            .as_bool()
            .map(FieldValue::Boolean)
            .ok_or_else(|| malformed("booleanValue")),
        "integerValue" => match inner {
            Value::String(text) => text
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| malformed("integerValue")),
            Value::Number(number) => number
                .as_i64()
                .map(FieldValue::Integer)
                .ok_or_else(|| malformed("integerValue")),
            _ => Err(malformed("integerValue")),
        },
        "doubleValue" => match inner {
            Value::Number(number) => number
                .as_f64()
                .map(FieldValue::Double)
                .ok_or_else(|| malformed("doubleValue")),
            Value::String(text) => match text.as_str() {
                "NaN" => Ok(FieldValue::Double(f64::NAN)),
                "Infinity" => Ok(FieldValue::Double(f64::INFINITY)),
                "-Infinity" => Ok(FieldValue::Double(f64::NEG_INFINITY)),
                _ => Err(malformed("doubleValue")),
            },
            _ => Err(malformed("doubleValue")),
        },
        "stringValue" => inner
            .as_str()
            .map(|text| FieldValue::String(text.to_string()))
            .ok_or_else(|| malformed("stringValue")),
        "timestampValue" => inner
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|at| FieldValue::Timestamp(at.with_timezone(&Utc)))
            .ok_or_else(|| malformed("timestampValue")),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => Vec::new(),
                Some(Value::Array(values)) => values
                    .iter()
                    .enumerate()
                    .map(|(index, item)| decode_at(item, &format!("{}/{}", path, index)))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(malformed("arrayValue")),
            };
            Ok(FieldValue::Array(values))
        }
        "mapValue" => decode_fields_at(inner.get("fields"), path).map(FieldValue::Map),
        other => Err(WireError::UnknownTag {
            tag: other.to_string(),
            path: path.to_string(),
        }),
    }
}
