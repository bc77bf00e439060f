use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Dialect-neutral database value.
///
/// A tagged sum type rather than `serde_json::Value` so parameter binding
/// and `GoType`/`JsonType` derivation stay exact: every dialect driver
/// converts between this and its native parameter type at the connector
/// boundary. Filter/order/field compilers and the SQL builders never see
/// anything but `Value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// JSON/JSONB/variant payloads, and arbitrary structured literals the
    /// filter DSL cannot otherwise express.
    Json(JsonValue),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Neutral type name as used by `Column::go_type` (§3 of the spec).
    pub fn go_type(&self) -> &'static str {
        match self {
            Value::Null => "any",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Text(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "time",
            Value::Json(_) => "any",
        }
    }

    pub fn as_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int64(i) => i.to_string(),
            Value::Float64(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => format!("<{} bytes>", b.len()),
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Json(j) => j.to_string(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_display_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_type_mapping() {
        assert_eq!(Value::Int64(1).go_type(), "int64");
        assert_eq!(Value::Text("x".into()).go_type(), "string");
        assert_eq!(Value::Null.go_type(), "any");
    }

    #[test]
    fn is_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int64(0).is_null());
    }

    #[test]
    fn display_matches_as_display_string() {
        let v = Value::Text("hi".into());
        assert_eq!(format!("{v}"), "hi");
    }
}
