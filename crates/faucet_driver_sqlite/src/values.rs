//! Conversion between [`Value`] and `rusqlite`'s wire types.

use chrono::{DateTime, Utc};
use faucet_core::Value;
use rusqlite::types::{ToSql, ValueRef};
use rusqlite::Row as SqliteRow;

pub fn to_sql_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int64(i) => Box::new(*i),
        Value::Float64(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Timestamp(t) => Box::new(t.to_rfc3339()),
        Value::Json(j) => Box::new(j.to_string()),
    }
}

pub fn params_to_sql(values: &[Value]) -> Vec<Box<dyn ToSql>> {
    values.iter().map(to_sql_param).collect()
}

pub fn as_param_refs(boxed: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
    boxed.iter().map(|b| b.as_ref()).collect()
}

pub fn column_to_value(row: &SqliteRow, index: usize) -> Value {
    match row.get_ref(index) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Integer(i)) => Value::Int64(i),
        Ok(ValueRef::Real(f)) => Value::Float64(f),
        Ok(ValueRef::Text(t)) => {
            let s = String::from_utf8_lossy(t).to_string();
            match DateTime::parse_from_rfc3339(&s) {
                Ok(dt) => Value::Timestamp(dt.with_timezone(&Utc)),
                Err(_) => Value::Text(s),
            }
        }
        Ok(ValueRef::Blob(b)) => Value::Bytes(b.to_vec()),
        Err(_) => Value::Null,
    }
}

pub fn row_to_columns(row: &SqliteRow, column_names: &[String]) -> Vec<(String, Value)> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), column_to_value(row, i)))
        .collect()
}
