#![cfg(feature = "excel")]

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::{ImportError, ImportResult};
use crate::processing::parse_timestamp;
use crate::types::{DataSet, Value};

use super::csv::header_or_unnamed;

/// Read a spreadsheet (`.xlsx`, `.xls`, `.ods`, etc.) into an in-memory `DataSet`.
///
/// Behavior:
/// - Picks `sheet_name` if provided; otherwise uses the first sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Reads at most `max_rows` data rows when given
/// - Converts cells into [`Value`]s (integral numbers become integers, dates become timestamps)
pub fn ingest_excel_from_path(
    path: impl AsRef<Path>,
    sheet_name: Option<&str>,
    max_rows: Option<usize>,
) -> ImportResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = match sheet_name {
        Some(s) => s.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::SchemaMismatch {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    let (columns, rows) =
        ingest_sheet_range(&range, max_rows).map_err(|e| wrap_schema_err_with_sheet(&sheet, e))?;
    Ok(DataSet::new(columns, rows))
}

/// Read multiple sheets from a workbook and concatenate all rows into one `DataSet`.
///
/// - If `sheet_names` is `None`, reads **all sheets** in workbook order.
/// - If `sheet_names` is `Some(&[...])`, reads only those sheets (in the provided order).
///
/// Every sheet must carry the same header row. `max_rows` bounds the total row count.
pub fn ingest_excel_workbook_from_path(
    path: impl AsRef<Path>,
    sheet_names: Option<&[&str]>,
    max_rows: Option<usize>,
) -> ImportResult<DataSet> {
    let mut workbook = open_workbook_auto(path)?;

    let sheets: Vec<String> = match sheet_names {
        Some(names) => names.iter().map(|s| s.to_string()).collect(),
        None => workbook.sheet_names().to_vec(),
    };
    if sheets.is_empty() {
        return Err(ImportError::SchemaMismatch {
            message: "workbook has no sheets".to_string(),
        });
    }

    let mut columns: Option<Vec<String>> = None;
    let mut all_rows: Vec<Vec<Value>> = Vec::new();
    for sheet in sheets {
        let remaining = max_rows.map(|m| m.saturating_sub(all_rows.len()));
        if remaining == Some(0) {
            break;
        }

        let range = workbook.worksheet_range(&sheet)?;
        let (sheet_columns, mut sheet_rows) = ingest_sheet_range(&range, remaining)
            .map_err(|e| wrap_schema_err_with_sheet(&sheet, e))?;

        match &columns {
            None => columns = Some(sheet_columns),
            Some(expected) if *expected != sheet_columns => {
                return Err(ImportError::SchemaMismatch {
                    message: format!(
                        "sheet '{sheet}': headers {sheet_columns:?} differ from {expected:?}"
                    ),
                });
            }
            Some(_) => {}
        }
        all_rows.append(&mut sheet_rows);
    }

    Ok(DataSet::new(columns.unwrap_or_default(), all_rows))
}

fn ingest_sheet_range(
    range: &calamine::Range<Data>,
    max_rows: Option<usize>,
) -> ImportResult<(Vec<String>, Vec<Vec<Value>>)> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| ImportError::SchemaMismatch {
            message: "sheet has no non-empty rows (no header row found)".to_string(),
        })?;

    let columns: Vec<String> = range
        .rows()
        .nth(header_row_idx)
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, c)| header_or_unnamed(idx, &cell_to_header_string(c)))
                .collect()
        })
        .unwrap_or_default();

    let rows = range
        .rows()
        .skip(header_row_idx + 1)
        .take(max_rows.unwrap_or(usize::MAX))
        .map(|row| {
            (0..columns.len())
                .map(|idx| convert_cell(row.get(idx).unwrap_or(&Data::Empty)))
                .collect()
        })
        .collect();

    Ok((columns, rows))
}

fn wrap_schema_err_with_sheet(sheet: &str, err: ImportError) -> ImportError {
    match err {
        ImportError::SchemaMismatch { message } => ImportError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(d) => d.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => "".to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => float_to_value(*f),
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Bool(b) => Value::Utf8(b.to_string()),
        Data::DateTime(d) => d
            .as_datetime()
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::Utf8(d.to_string())),
        Data::DateTimeIso(s) => parse_timestamp(s)
            .map(Value::Timestamp)
            .unwrap_or_else(|| Value::Utf8(s.clone())),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
    }
}

/// Integral floats within `i64` range become integers.
fn float_to_value(f: f64) -> Value {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    if f.fract() == 0.0 && f >= -LIMIT && f < LIMIT {
        Value::Int64(f as i64)
    } else {
        Value::Float64(f)
    }
}
