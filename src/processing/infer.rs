//! Storage type inference for columns of a table that does not exist yet.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::{ColumnDescriptor, DataSet, StorageType, Value};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a date or date-time string in one of the accepted layouts.
///
/// Bare dates resolve to midnight; RFC 3339 values keep their local wall-clock time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(parsed);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(s, fmt) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local())
}

fn is_integer(v: &Value) -> bool {
    match v {
        Value::Int64(_) => true,
        Value::Utf8(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_float(v: &Value) -> bool {
    match v {
        Value::Int64(_) => true,
        Value::Float64(f) => f.is_finite(),
        Value::Utf8(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_timestamp(v: &Value) -> bool {
    match v {
        Value::Timestamp(_) => true,
        Value::Utf8(s) => parse_timestamp(s).is_some(),
        _ => false,
    }
}

/// Propose a storage type for one column's values.
///
/// The first rule that holds for **every** non-null value wins: integer (64-bit range), then
/// float, then timestamp. Anything else, including an all-null column, is variable text.
pub fn infer_storage_type<'a, I>(values: I) -> StorageType
where
    I: IntoIterator<Item = &'a Value>,
{
    let non_null: Vec<&Value> = values.into_iter().filter(|v| !v.is_null()).collect();
    if non_null.is_empty() {
        return StorageType::VariableText;
    }

    if non_null.iter().all(|v| is_integer(v)) {
        StorageType::Integer64
    } else if non_null.iter().all(|v| is_float(v)) {
        StorageType::Float64
    } else if non_null.iter().all(|v| is_timestamp(v)) {
        StorageType::Timestamp
    } else {
        StorageType::VariableText
    }
}

/// One inferred descriptor per column of `dataset`, in column order.
pub fn infer_columns(dataset: &DataSet) -> Vec<ColumnDescriptor> {
    dataset
        .columns
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            ColumnDescriptor::inferred(name.clone(), infer_storage_type(dataset.column_values(idx)))
        })
        .collect()
}
