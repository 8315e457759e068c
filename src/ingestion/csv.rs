//! Delimited-text ingestion.

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::types::{DataSet, Value};

/// Read a delimited file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - The first record is the header row; blank headers become `Unnamed: {index}`.
/// - Every cell is surfaced as text (empty fields included); cleaning decides what is null.
/// - Short rows are padded with nulls; rows with more fields than headers are rejected.
/// - `max_rows` stops reading after that many data rows.
pub fn ingest_csv_from_path(
    path: impl AsRef<Path>,
    delimiter: u8,
    max_rows: Option<usize>,
) -> ImportResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, max_rows)
}

/// Read CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    max_rows: Option<usize>,
) -> ImportResult<DataSet> {
    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, h)| header_or_unnamed(idx, h))
        .collect();

    let limit = max_rows.unwrap_or(usize::MAX);
    let mut rows: Vec<Vec<Value>> = Vec::new();
    for (row_idx0, result) in rdr.records().take(limit).enumerate() {
        // 1-based line number for users; +1 again because the header is line 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        if record.len() > columns.len() {
            return Err(ImportError::SchemaMismatch {
                message: format!(
                    "row {user_row} has {} fields but the header has {}",
                    record.len(),
                    columns.len()
                ),
            });
        }

        let mut row: Vec<Value> = Vec::with_capacity(columns.len());
        row.extend(record.iter().map(|field| Value::Utf8(field.to_owned())));
        row.resize(columns.len(), Value::Null);
        rows.push(row);
    }

    Ok(DataSet::new(columns, rows))
}

pub(crate) fn header_or_unnamed(idx: usize, header: &str) -> String {
    if header.trim().is_empty() {
        format!("Unnamed: {idx}")
    } else {
        header.to_owned()
    }
}
