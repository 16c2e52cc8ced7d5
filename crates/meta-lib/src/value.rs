//! Host metadata values
//!
//! The monitoring API stores arbitrary JSON under a metadata key, but a check
//! can only compare strings, numbers and booleans. `MetaValue` is the closed
//! set of values the comparator understands; anything else is rejected when
//! decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A single metadata value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum MetaValue {
    String(String),
    Number(f64),
    Bool(bool),
    /// JSON `null`, or a value that was never set
    #[default]
    Absent,
}

/// A JSON value that has no `MetaValue` counterpart (arrays and objects)
#[derive(Debug, Clone, Error)]
#[error("unsupported type value: type={type_name}, value={value}")]
pub struct UnsupportedValue {
    pub type_name: &'static str,
    pub value: String,
}

impl MetaValue {
    /// Name of the value's type as shown in check messages
    pub fn type_name(&self) -> &'static str {
        match self {
            MetaValue::String(_) => "string",
            MetaValue::Number(_) => "number",
            MetaValue::Bool(_) => "boolean",
            MetaValue::Absent => "null",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, MetaValue::Absent)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::String(s) => f.write_str(s),
            MetaValue::Number(n) => write!(f, "{}", n),
            MetaValue::Bool(b) => write!(f, "{}", b),
            MetaValue::Absent => f.write_str("null"),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<Value> for MetaValue {
    type Error = UnsupportedValue;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(MetaValue::Absent),
            Value::Bool(b) => Ok(MetaValue::Bool(b)),
            Value::String(s) => Ok(MetaValue::String(s)),
            Value::Number(ref n) => match n.as_f64() {
                Some(f) => Ok(MetaValue::Number(f)),
                None => Err(UnsupportedValue {
                    type_name: json_type_name(&value),
                    value: value.to_string(),
                }),
            },
            Value::Array(_) | Value::Object(_) => Err(UnsupportedValue {
                type_name: json_type_name(&value),
                value: value.to_string(),
            }),
        }
    }
}

impl From<MetaValue> for Value {
    fn from(value: MetaValue) -> Self {
        match value {
            MetaValue::String(s) => Value::String(s),
            // Non-finite numbers have no JSON form and become null
            MetaValue::Number(n) => Value::from(n),
            MetaValue::Bool(b) => Value::Bool(b),
            MetaValue::Absent => Value::Null,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::String(s.to_string())
    }
}

impl From<f64> for MetaValue {
    fn from(n: f64) -> Self {
        MetaValue::Number(n)
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}
