//! Conversion between [`Value`] and the `mysql` crate's wire value type.

use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Utc};
use faucet_core::Value;
use mysql::Value as MyValue;

pub fn to_mysql_value(value: &Value) -> MyValue {
    match value {
        Value::Null => MyValue::NULL,
        Value::Bool(b) => MyValue::Int(*b as i64),
        Value::Int64(i) => MyValue::Int(*i),
        Value::Float64(f) => MyValue::Double(*f),
        Value::Text(s) => MyValue::Bytes(s.clone().into_bytes()),
        Value::Bytes(b) => MyValue::Bytes(b.clone()),
        Value::Timestamp(t) => MyValue::Date(
            t.year() as u16,
            t.month() as u8,
            t.day() as u8,
            t.hour() as u8,
            t.minute() as u8,
            t.second() as u8,
            t.timestamp_subsec_micros(),
        ),
        Value::Json(j) => MyValue::Bytes(j.to_string().into_bytes()),
    }
}

pub fn params_to_mysql(values: &[Value]) -> mysql::Params {
    mysql::Params::Positional(values.iter().map(to_mysql_value).collect())
}

pub fn from_mysql_value(raw: &MyValue) -> Value {
    match raw {
        MyValue::NULL => Value::Null,
        MyValue::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Bytes(b.clone()),
        },
        MyValue::Int(i) => Value::Int64(*i),
        MyValue::UInt(u) => Value::Int64(*u as i64),
        MyValue::Float(f) => Value::Float64(*f as f64),
        MyValue::Double(d) => Value::Float64(*d),
        MyValue::Date(year, month, day, hour, minute, second, micros) => {
            let naive = NaiveDate::from_ymd_opt(*year as i32, *month as u32, *day as u32)
                .and_then(|d| d.and_hms_micro_opt(*hour as u32, *minute as u32, *second as u32, *micros));
            match naive {
                Some(n) => Value::Timestamp(Utc.from_utc_datetime(&n)),
                None => Value::Null,
            }
        }
        MyValue::Time(..) => Value::Text(raw.as_sql(true)),
    }
}
