//! Bulk loading with a row-by-row fallback.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{ImportError, ImportResult};
use crate::store::{InsertStatement, RelationalStore, TableName};
use crate::types::{DataSet, Value};

/// A row the store rejected during the row-level fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowFailure {
    /// 0-based index into the loaded data.
    pub row_index: usize,
    pub values: Vec<Value>,
    pub error: String,
}

/// What a load did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub table: String,
    /// Rows handed to the loader.
    pub attempted: usize,
    /// Rows committed.
    pub inserted: usize,
    pub failures: Vec<RowFailure>,
}

/// Inserts a [`DataSet`] into an existing table.
///
/// One batched insert is tried first. If the store rejects it, every row is retried exactly
/// once on its own, rejected rows are recorded as [`RowFailure`]s, the survivors are
/// committed, and the batch failure is returned as [`ImportError::BatchInsertFailure`]
/// carrying the [`LoadReport`]. The report is returned even when the final commit fails;
/// `inserted` is then 0.
pub struct BulkLoader<'a, S: RelationalStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: RelationalStore + ?Sized> BulkLoader<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn load(&mut self, table: &TableName, data: &DataSet) -> ImportResult<LoadReport> {
        let mut report = LoadReport {
            table: table.to_string(),
            attempted: data.row_count(),
            inserted: 0,
            failures: Vec::new(),
        };
        if data.row_count() == 0 {
            log::info!("nothing to insert into '{table}'");
            return Ok(report);
        }

        let insert = InsertStatement::new(table.clone(), data.columns.clone())?;
        let batch_err = match self.store.insert_batch(&insert, &data.rows) {
            Ok(()) => {
                self.commit(table)?;
                report.inserted = data.row_count();
                log::info!("inserted {} rows into '{table}'", report.inserted);
                return Ok(report);
            }
            Err(e) => e,
        };

        log::error!(
            "batch insert into '{table}' failed: {batch_err}; inserting {} rows one at a time",
            data.row_count()
        );
        for (row_index, row) in data.rows.iter().enumerate() {
            match self.store.insert_row(&insert, row) {
                Ok(()) => report.inserted += 1,
                Err(e) => {
                    log::error!(
                        "row {row_index} rejected by '{table}': {e}; values: {}",
                        display_row(row)
                    );
                    report.failures.push(RowFailure {
                        row_index,
                        values: row.clone(),
                        error: e.message,
                    });
                }
            }
        }
        match self.store.commit() {
            Ok(()) => log::warn!(
                "{} of {} rows inserted into '{table}' after batch failure",
                report.inserted,
                report.attempted
            ),
            Err(e) => {
                log::error!(
                    "commit after row-by-row insert into '{table}' failed: {e}; no rows were kept"
                );
                report.inserted = 0;
            }
        }

        Err(ImportError::BatchInsertFailure {
            table: table.to_string(),
            report: Box::new(report),
            source: batch_err,
        })
    }

    fn commit(&mut self, table: &TableName) -> ImportResult<()> {
        self.store
            .commit()
            .map_err(|e| ImportError::store(table.as_str(), e))
    }
}

fn display_row(row: &[Value]) -> String {
    row.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write `failures` to `path` as a JSON array of `{row_index, values, error}`.
pub fn write_failure_log(path: impl AsRef<Path>, failures: &[RowFailure]) -> ImportResult<()> {
    let mut w = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut w, failures)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{BulkLoader, RowFailure};
    use crate::error::ImportError;
    use crate::store::{MemoryStore, StoreCall, TableName};
    use crate::types::{ColumnDescriptor, DataSet, StorageType, Value};

    fn store() -> MemoryStore {
        MemoryStore::new().with_table(
            "t",
            vec![
                ColumnDescriptor::inferred("id", StorageType::Integer64),
                ColumnDescriptor::inferred("name", StorageType::VariableText),
            ],
        )
    }

    fn data(ids: &[&str]) -> DataSet {
        DataSet::new(
            vec!["id".to_string(), "name".to_string()],
            ids.iter()
                .map(|id| vec![Value::Utf8(id.to_string()), Value::Utf8(format!("n{id}"))])
                .collect(),
        )
    }

    #[test]
    fn clean_batch_commits_everything() {
        let mut store = store();
        let table = TableName::parse("t").unwrap();
        let report = BulkLoader::new(&mut store).load(&table, &data(&["1", "2"])).unwrap();

        assert_eq!(report.inserted, 2);
        assert!(report.failures.is_empty());
        assert_eq!(store.rows("t").len(), 2);
        assert!(!store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::InsertRow { .. })));
    }

    #[test]
    fn bad_row_falls_back_and_reports_failure() {
        let mut store = store();
        let table = TableName::parse("t").unwrap();
        let err = BulkLoader::new(&mut store)
            .load(&table, &data(&["1", "oops", "3"]))
            .unwrap_err();

        let ImportError::BatchInsertFailure { report, .. } = err else {
            panic!("expected batch failure");
        };
        assert_eq!(report.attempted, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(
            report.failures.iter().map(|f| f.row_index).collect::<Vec<_>>(),
            vec![1]
        );
        assert_eq!(report.failures[0].values[0], Value::Utf8("oops".to_string()));
        assert_eq!(store.rows("t").len(), 2);

        let row_calls = store
            .calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::InsertRow { .. }))
            .count();
        assert_eq!(row_calls, 3);
    }

    #[test]
    fn failed_commit_after_fallback_keeps_the_report() {
        let mut store = store().fail_commits();
        let table = TableName::parse("t").unwrap();
        let err = BulkLoader::new(&mut store)
            .load(&table, &data(&["1", "oops"]))
            .unwrap_err();

        let ImportError::BatchInsertFailure { report, .. } = &err else {
            panic!("expected batch failure, got {err:?}");
        };
        assert_eq!(report.attempted, 2);
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row_index, 1);
        assert!(store.rows("t").is_empty());
    }

    #[test]
    fn empty_data_issues_no_insert() {
        let mut store = store();
        let table = TableName::parse("t").unwrap();
        let report = BulkLoader::new(&mut store).load(&table, &data(&[])).unwrap();
        assert_eq!(report.attempted, 0);
        assert!(!store.has_mutations());
    }

    #[test]
    fn row_failure_serializes_values_plainly() {
        let f = RowFailure {
            row_index: 4,
            values: vec![Value::Int64(1), Value::Null, Value::Utf8("x".to_string())],
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"row_index": 4, "values": [1, null, "x"], "error": "boom"})
        );
    }
}
