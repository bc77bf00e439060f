//! Conversion between [`Value`] and `postgres`'s wire types.

use chrono::{DateTime, Utc};
use faucet_core::Value;
use postgres::types::{Json, ToSql, Type};
use postgres::Row as PgRow;

/// Box a `Value` as a `postgres` bind parameter. `Null` binds as a typed
/// `Option::None` so the driver doesn't have to guess the column's wire
/// type on an untyped NULL.
pub fn to_sql_param(value: &Value) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int64(i) => Box::new(*i),
        Value::Float64(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Timestamp(t) => Box::new(*t),
        Value::Json(j) => Box::new(Json(j.clone())),
    }
}

pub fn params_to_sql(values: &[Value]) -> Vec<Box<dyn ToSql + Sync>> {
    values.iter().map(to_sql_param).collect()
}

pub fn as_param_refs(boxed: &[Box<dyn ToSql + Sync>]) -> Vec<&(dyn ToSql + Sync)> {
    boxed.iter().map(|b| b.as_ref()).collect()
}

/// Convert a single column of a `postgres::Row` to a [`Value`], dispatching
/// on the column's wire type name. Unrecognized types fall back to their
/// text representation.
pub fn column_to_value(row: &PgRow, index: usize) -> Value {
    let column = &row.columns()[index];
    match *column.type_() {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int64(v as i64))
            .unwrap_or(Value::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(index)
            .ok()
            .flatten()
            .map(|v| Value::Int64(v as i64))
            .unwrap_or(Value::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(index)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(index)
            .ok()
            .flatten()
            .map(|v| Value::Float64(v as f64))
            .unwrap_or(Value::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(index)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(index)
            .ok()
            .flatten()
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(index)
            .ok()
            .flatten()
            .map(Value::Json)
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<_, Option<String>>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}

pub fn row_to_columns(row: &PgRow) -> Vec<(String, Value)> {
    (0..row.len())
        .map(|i| (row.columns()[i].name().to_string(), column_to_value(row, i)))
        .collect()
}
