//! Row value types shared between the node and the query engine.
//!
//! The engine contract speaks in row maps: string-keyed maps of
//! [`FieldValue`]s. Upstream records, topic messages, and query results are
//! all converted to this shape before they cross the engine boundary.

use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

/// The row shape consumed and produced by the query engine.
pub type RowMap = HashMap<String, FieldValue>;

/// A value in a row field.
///
/// Covers the types a JSON-carrying rule graph produces. Nested structures
/// are supported through `Array` and `Map`.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Boolean value (true/false)
    Boolean(bool),
    /// Absent/null value
    Null,
    /// Array of values
    Array(Vec<FieldValue>),
    /// Map of key-value pairs with string keys
    Map(HashMap<String, FieldValue>),
}

impl FieldValue {
    /// Name of this value's type, for error messages and logs.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Integer(_) => "INTEGER",
            FieldValue::Float(_) => "FLOAT",
            FieldValue::String(_) => "STRING",
            FieldValue::Boolean(_) => "BOOLEAN",
            FieldValue::Null => "NULL",
            FieldValue::Array(_) => "ARRAY",
            FieldValue::Map(_) => "MAP",
        }
    }

    /// Convert a JSON value into a field value.
    ///
    /// JSON numbers become `Integer` when they fit in `i64`, `Float`
    /// otherwise. Objects become `Map`, arrays become `Array`.
    pub fn from_json(value: JsonValue) -> FieldValue {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FieldValue::Integer(i)
                } else {
                    FieldValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => FieldValue::String(s),
            JsonValue::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_json).collect())
            }
            JsonValue::Object(fields) => FieldValue::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this field value back into a JSON value.
    ///
    /// Non-finite floats have no JSON representation and render as null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Integer(i) => JsonValue::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Array(items) => {
                JsonValue::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Map(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Array(arr) => {
                write!(f, "[")?;
                for (i, v) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            FieldValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Convert a JSON object into a row map.
///
/// Non-object values land under a single `payload` column, so scalar
/// message bodies still produce a usable row.
pub fn row_from_json(value: JsonValue) -> RowMap {
    match value {
        JsonValue::Object(fields) => fields
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect(),
        other => {
            let mut row = RowMap::new();
            row.insert("payload".to_string(), FieldValue::from_json(other));
            row
        }
    }
}
