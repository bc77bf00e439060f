//! Conversion between `faucet_core::Value` and the Snowflake SQL API v2's
//! wire format, where every bind parameter and every result cell is
//! transmitted as a string tagged with a Snowflake logical type name.

use std::collections::BTreeMap;

use chrono::DateTime;
use faucet_core::Value;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Binding {
    #[serde(rename = "type")]
    pub type_name: &'static str,
    pub value: Option<String>,
}

fn to_binding(value: &Value) -> Binding {
    match value {
        Value::Null => Binding { type_name: "TEXT", value: None },
        Value::Bool(b) => Binding {
            type_name: "BOOLEAN",
            value: Some(b.to_string()),
        },
        Value::Int64(i) => Binding {
            type_name: "FIXED",
            value: Some(i.to_string()),
        },
        Value::Float64(f) => Binding {
            type_name: "REAL",
            value: Some(f.to_string()),
        },
        Value::Text(s) => Binding {
            type_name: "TEXT",
            value: Some(s.clone()),
        },
        Value::Bytes(b) => Binding {
            type_name: "BINARY",
            value: Some(hex::encode(b)),
        },
        Value::Timestamp(t) => Binding {
            type_name: "TIMESTAMP_NTZ",
            value: Some(format!("{}.{:09}", t.timestamp(), t.timestamp_subsec_nanos())),
        },
        Value::Json(j) => Binding {
            type_name: "VARIANT",
            value: Some(j.to_string()),
        },
    }
}

/// Build the `bindings` map of a `SqlApiRequestBody`, keyed by 1-based
/// position as a string per the API's convention.
pub fn build_bindings(params: &[Value]) -> BTreeMap<String, Binding> {
    params
        .iter()
        .enumerate()
        .map(|(i, v)| ((i + 1).to_string(), to_binding(v)))
        .collect()
}

/// Parse one result cell. `sf_type` is the lowercase `rowType[].type` from
/// `resultSetMetaData`; `raw` is the cell's string form, `None` for SQL NULL.
pub fn parse_snowflake_value(raw: Option<&str>, sf_type: &str) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };

    match sf_type {
        "fixed" => raw
            .parse::<i64>()
            .map(Value::Int64)
            .or_else(|_| raw.parse::<f64>().map(Value::Float64))
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        "real" | "float" | "double" => raw
            .parse::<f64>()
            .map(Value::Float64)
            .unwrap_or_else(|_| Value::Text(raw.to_string())),
        "boolean" => match raw {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => Value::Text(raw.to_string()),
        },
        "binary" => hex::decode(raw).map(Value::Bytes).unwrap_or_else(|_| Value::Text(raw.to_string())),
        "date" => parse_epoch_days(raw),
        "timestamp_ntz" | "timestamp_ltz" | "timestamp_tz" => parse_epoch_seconds(raw),
        "variant" | "object" | "array" => {
            serde_json::from_str(raw).map(Value::Json).unwrap_or_else(|_| Value::Text(raw.to_string()))
        }
        _ => Value::Text(raw.to_string()),
    }
}

fn parse_epoch_seconds(raw: &str) -> Value {
    let (secs_str, frac) = raw.split_once('.').unwrap_or((raw, "0"));
    let Ok(secs) = secs_str.parse::<i64>() else {
        return Value::Text(raw.to_string());
    };
    let nanos: u32 = format!("{frac:0<9}").chars().take(9).collect::<String>().parse().unwrap_or(0);
    DateTime::from_timestamp(secs, nanos).map(Value::Timestamp).unwrap_or_else(|| Value::Text(raw.to_string()))
}

fn parse_epoch_days(raw: &str) -> Value {
    let Ok(days) = raw.parse::<i64>() else {
        return Value::Text(raw.to_string());
    };
    DateTime::from_timestamp(days * 86_400, 0).map(Value::Timestamp).unwrap_or_else(|| Value::Text(raw.to_string()))
}
