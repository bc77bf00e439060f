//! Conversion between [`Value`] and `tiberius`'s wire types.

use chrono::{NaiveDateTime, TimeZone, Utc};
use faucet_core::Value;
use tiberius::{ColumnType, Row as MssqlRow, ToSql};

pub fn to_sql_param(value: &Value) -> Box<dyn ToSql> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Int64(i) => Box::new(*i),
        Value::Float64(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Timestamp(t) => Box::new(t.naive_utc()),
        Value::Json(j) => Box::new(j.to_string()),
    }
}

pub fn params_to_sql(values: &[Value]) -> Vec<Box<dyn ToSql>> {
    values.iter().map(to_sql_param).collect()
}

pub fn as_param_refs(boxed: &[Box<dyn ToSql>]) -> Vec<&dyn ToSql> {
    boxed.iter().map(|b| b.as_ref()).collect()
}

pub fn column_to_value(row: &MssqlRow, index: usize) -> Value {
    let column_type = row.columns().get(index).map(|c| c.column_type());

    match column_type {
        Some(ColumnType::Bit) | Some(ColumnType::Bitn) => row
            .try_get::<bool, _>(index)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        Some(ColumnType::Int1) | Some(ColumnType::Int2) | Some(ColumnType::Int4) | Some(ColumnType::Intn) => {
            row.try_get::<i32, _>(index)
                .ok()
                .flatten()
                .map(|v| Value::Int64(v as i64))
                .unwrap_or(Value::Null)
        }
        Some(ColumnType::Int8) => row
            .try_get::<i64, _>(index)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        Some(ColumnType::Float4)
        | Some(ColumnType::Float8)
        | Some(ColumnType::Floatn)
        | Some(ColumnType::Money)
        | Some(ColumnType::Money4)
        | Some(ColumnType::Decimaln)
        | Some(ColumnType::Numericn) => row
            .try_get::<f64, _>(index)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        Some(ColumnType::BigBinary) | Some(ColumnType::BigVarBin) | Some(ColumnType::Image) => row
            .try_get::<&[u8], _>(index)
            .ok()
            .flatten()
            .map(|b| Value::Bytes(b.to_vec()))
            .unwrap_or(Value::Null),
        Some(ColumnType::Datetime)
        | Some(ColumnType::Datetime4)
        | Some(ColumnType::Datetimen)
        | Some(ColumnType::Datetime2)
        | Some(ColumnType::Daten)
        | Some(ColumnType::Timen) => row
            .try_get::<NaiveDateTime, _>(index)
            .ok()
            .flatten()
            .map(|dt| Value::Timestamp(Utc.from_utc_datetime(&dt)))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<&str, _>(index)
            .ok()
            .flatten()
            .map(|s| Value::Text(s.to_string()))
            .unwrap_or(Value::Null),
    }
}

pub fn row_to_columns(row: &MssqlRow) -> Vec<(String, Value)> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name().to_string(), column_to_value(row, i)))
        .collect()
}
