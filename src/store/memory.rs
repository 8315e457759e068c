//! In-process store that keeps tables in memory and records every call.

use std::collections::BTreeMap;

use crate::processing::parse_timestamp;
use crate::types::{ColumnDescriptor, ColumnType, StorageType, Value};

use super::sql::{Ddl, Dialect, InsertStatement, TableName};
use super::{RelationalStore, StoreError};

/// One call received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    TableExists(String),
    TableColumns(String),
    /// Rendered DDL statement.
    Ddl(String),
    InsertBatch { table: String, rows: usize },
    InsertRow { table: String },
    Commit,
}

/// A table held by a [`MemoryStore`].
///
/// Rows span every table column; columns an insert did not name are null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryTable {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

/// A store whose tables live in memory.
///
/// Schema statements apply immediately; inserted rows become visible in [`MemoryStore::rows`]
/// on [`RelationalStore::commit`]. Values are checked against the column's storage family the
/// way a typed database converts parameters, so a malformed cell makes its row fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, MemoryTable>,
    pending: Vec<(String, Vec<Value>)>,
    calls: Vec<StoreCall>,
    fail_creates: bool,
    fail_commits: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing table.
    pub fn with_table(mut self, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.tables.insert(
            table.to_string(),
            MemoryTable {
                columns,
                rows: Vec::new(),
            },
        );
        self
    }

    /// Make every subsequent `CREATE TABLE` fail.
    pub fn fail_creates(mut self) -> Self {
        self.fail_creates = true;
        self
    }

    /// Make every subsequent commit fail, discarding the pending rows.
    pub fn fail_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    pub fn table(&self, table: &str) -> Option<&MemoryTable> {
        self.tables.get(table)
    }

    /// Committed rows of `table` (empty when the table does not exist).
    pub fn rows(&self, table: &str) -> &[Vec<Value>] {
        self.tables.get(table).map(|t| t.rows.as_slice()).unwrap_or(&[])
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[StoreCall] {
        &self.calls
    }

    /// Whether any call changed (or tried to change) data or schema.
    pub fn has_mutations(&self) -> bool {
        self.calls.iter().any(|c| {
            matches!(
                c,
                StoreCall::Ddl(_) | StoreCall::InsertBatch { .. } | StoreCall::InsertRow { .. }
            )
        })
    }

    fn build_row(
        &self,
        insert: &InsertStatement,
        values: &[Value],
    ) -> Result<Vec<Value>, StoreError> {
        let table = self.tables.get(insert.table.as_str()).ok_or_else(|| {
            StoreError::new(format!("invalid object name '{}'", insert.table))
        })?;
        if values.len() != insert.columns.len() {
            return Err(StoreError::new(format!(
                "expected {} parameters, got {}",
                insert.columns.len(),
                values.len()
            )));
        }

        let mut row = vec![Value::Null; table.columns.len()];
        for (name, value) in insert.columns.iter().zip(values) {
            let idx = table
                .columns
                .iter()
                .position(|c| &c.name == name)
                .ok_or_else(|| StoreError::new(format!("invalid column name '{name}'")))?;
            check_value(&table.columns[idx], value)?;
            row[idx] = value.clone();
        }
        Ok(row)
    }
}

fn check_value(column: &ColumnDescriptor, value: &Value) -> Result<(), StoreError> {
    let fits = match (column.column_type.family(), value) {
        (_, Value::Null) => true,
        (StorageType::VariableText, _) => true,
        (StorageType::Integer64, Value::Int64(_)) => true,
        (StorageType::Integer64, Value::Float64(f)) => f.fract() == 0.0,
        (StorageType::Integer64, Value::Utf8(s)) => s.trim().parse::<i64>().is_ok(),
        (StorageType::Float64, Value::Int64(_) | Value::Float64(_)) => true,
        (StorageType::Float64, Value::Utf8(s)) => s.trim().parse::<f64>().is_ok(),
        (StorageType::Timestamp, Value::Timestamp(_)) => true,
        (StorageType::Timestamp, Value::Utf8(s)) => parse_timestamp(s).is_some(),
        _ => false,
    };
    if !fits {
        return Err(StoreError::new(format!(
            "conversion failed when converting '{value}' to {} for column '{}'",
            column.column_type.label(),
            column.name
        )));
    }

    if let (ColumnType::Catalog(t), Value::Utf8(s)) = (&column.column_type, value) {
        if let Some(max) = t.max_length.filter(|&m| m >= 0) {
            if s.chars().count() as i64 > max {
                return Err(StoreError::new(format!(
                    "string data would be truncated in column '{}' ({} > {max} characters)",
                    column.name,
                    s.chars().count()
                )));
            }
        }
    }
    Ok(())
}

impl RelationalStore for MemoryStore {
    fn dialect(&self) -> Dialect {
        Dialect::SqlServer
    }

    fn table_exists(&mut self, table: &TableName) -> Result<bool, StoreError> {
        self.calls.push(StoreCall::TableExists(table.to_string()));
        Ok(self.tables.contains_key(table.as_str()))
    }

    fn table_columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>, StoreError> {
        self.calls.push(StoreCall::TableColumns(table.to_string()));
        self.tables
            .get(table.as_str())
            .map(|t| t.columns.clone())
            .ok_or_else(|| StoreError::new(format!("invalid object name '{table}'")))
    }

    fn execute_ddl(&mut self, ddl: &Ddl) -> Result<(), StoreError> {
        let sql = ddl.to_sql(self.dialect());
        self.calls.push(StoreCall::Ddl(sql.clone()));
        let name = ddl.table().to_string();

        match ddl {
            Ddl::Create(create) => {
                if self.fail_creates {
                    return Err(StoreError::new("create table rejected").with_statement(sql));
                }
                if self.tables.contains_key(&name) {
                    return Err(StoreError::new(format!(
                        "there is already an object named '{name}' in the database"
                    ))
                    .with_statement(sql));
                }
                self.tables.insert(
                    name,
                    MemoryTable {
                        columns: create.columns.clone(),
                        rows: Vec::new(),
                    },
                );
            }
            Ddl::Drop(_) => {
                if self.tables.remove(&name).is_none() {
                    return Err(StoreError::new(format!("cannot drop table '{name}'"))
                        .with_statement(sql));
                }
                self.pending.retain(|(t, _)| *t != name);
            }
        }
        Ok(())
    }

    fn insert_batch(
        &mut self,
        insert: &InsertStatement,
        rows: &[Vec<Value>],
    ) -> Result<(), StoreError> {
        self.calls.push(StoreCall::InsertBatch {
            table: insert.table.to_string(),
            rows: rows.len(),
        });
        let sql = insert.to_sql(self.dialect());
        let built = rows
            .iter()
            .map(|r| self.build_row(insert, r))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| e.with_statement(sql))?;
        let table = insert.table.to_string();
        self.pending.extend(built.into_iter().map(|r| (table.clone(), r)));
        Ok(())
    }

    fn insert_row(&mut self, insert: &InsertStatement, row: &[Value]) -> Result<(), StoreError> {
        self.calls.push(StoreCall::InsertRow {
            table: insert.table.to_string(),
        });
        let built = self
            .build_row(insert, row)
            .map_err(|e| e.with_statement(insert.to_sql(self.dialect())))?;
        self.pending.push((insert.table.to_string(), built));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.calls.push(StoreCall::Commit);
        if self.fail_commits {
            self.pending.clear();
            return Err(StoreError::new("transaction log is full"));
        }
        for (table, row) in self.pending.drain(..) {
            if let Some(t) = self.tables.get_mut(&table) {
                t.rows.push(row);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStore, StoreCall};
    use crate::store::sql::{CreateTable, Ddl, InsertStatement, TableName};
    use crate::store::RelationalStore;
    use crate::types::{CatalogType, ColumnDescriptor, StorageType, Value};

    fn table() -> TableName {
        TableName::parse("people").unwrap()
    }

    #[test]
    fn rows_become_visible_on_commit() {
        let mut store = MemoryStore::new()
            .with_table("people", vec![ColumnDescriptor::inferred("id", StorageType::Integer64)]);
        let insert = InsertStatement::new(table(), vec!["id".to_string()]).unwrap();

        store.insert_row(&insert, &[Value::Int64(1)]).unwrap();
        assert!(store.rows("people").is_empty());
        store.commit().unwrap();
        assert_eq!(store.rows("people"), &[vec![Value::Int64(1)]]);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut store = MemoryStore::new()
            .with_table("people", vec![ColumnDescriptor::inferred("id", StorageType::Integer64)]);
        let insert = InsertStatement::new(table(), vec!["id".to_string()]).unwrap();

        let err = store
            .insert_batch(
                &insert,
                &[vec![Value::Int64(1)], vec![Value::Utf8("x".to_string())]],
            )
            .unwrap_err();
        assert!(err.message.contains("conversion failed"));
        assert!(err.statement.is_some());
        store.commit().unwrap();
        assert!(store.rows("people").is_empty());
    }

    #[test]
    fn enforces_declared_lengths_and_columns() {
        let mut store = MemoryStore::new().with_table(
            "people",
            vec![ColumnDescriptor::catalog("zip", CatalogType::with_length("nvarchar", 5))],
        );
        let insert = InsertStatement::new(table(), vec!["zip".to_string()]).unwrap();
        assert!(store.insert_row(&insert, &[Value::Utf8("12345".to_string())]).is_ok());
        assert!(store.insert_row(&insert, &[Value::Utf8("123456".to_string())]).is_err());

        let unknown = InsertStatement::new(table(), vec!["city".to_string()]).unwrap();
        assert!(store.insert_row(&unknown, &[Value::Null]).is_err());
    }

    #[test]
    fn records_ddl_calls() {
        let mut store = MemoryStore::new();
        let create = CreateTable::new(
            table(),
            vec![ColumnDescriptor::inferred("id", StorageType::Integer64)],
        )
        .unwrap();
        store.execute_ddl(&Ddl::Create(create)).unwrap();
        assert!(store.table("people").is_some());
        assert!(store.has_mutations());
        assert!(matches!(
            &store.calls()[0],
            StoreCall::Ddl(sql) if sql.starts_with("CREATE TABLE [people]")
        ));
    }
}
