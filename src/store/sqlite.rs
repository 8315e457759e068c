#![cfg(feature = "sqlite")]

use std::path::Path;

use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};

use crate::error::{ImportError, ImportResult};
use crate::types::{CatalogType, ColumnDescriptor, Value};

use super::sql::{Ddl, Dialect, InsertStatement, TableName};
use super::{RelationalStore, StoreError};

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::new(e.to_string())
    }
}

/// SQLite destination.
///
/// Work runs inside one open transaction that [`RelationalStore::commit`] ends. A batch insert is
/// wrapped in a savepoint so it either lands completely or not at all. Dropping the store
/// closes the connection, which rolls back anything not yet committed.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| ImportError::DestinationUnavailable {
            target: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { conn })
    }

    /// A private in-memory database.
    pub fn in_memory() -> ImportResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| ImportError::DestinationUnavailable {
                target: ":memory:".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { conn })
    }

    /// Underlying connection, for queries outside the import contract.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn begin_if_needed(&self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    fn execute_insert(&self, sql: &str, row: &[Value]) -> Result<(), StoreError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        stmt.execute(params_from_iter(row.iter().map(to_sql_value)))?;
        Ok(())
    }
}

fn to_sql_value(v: &Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::Timestamp(ts) => SqlValue::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        Value::Utf8(s) => SqlValue::Text(s.clone()),
    }
}

impl RelationalStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn table_exists(&mut self, table: &TableName) -> Result<bool, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table.as_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn table_columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table.as_str()], |row| {
                let name: String = row.get(0)?;
                let declared: String = row.get(1)?;
                Ok(ColumnDescriptor::catalog(name, CatalogType::parse(&declared)))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn execute_ddl(&mut self, ddl: &Ddl) -> Result<(), StoreError> {
        let sql = ddl.to_sql(self.dialect());
        self.begin_if_needed()?;
        self.conn
            .execute_batch(&sql)
            .map_err(|e| StoreError::from(e).with_statement(sql))
    }

    fn insert_batch(
        &mut self,
        insert: &InsertStatement,
        rows: &[Vec<Value>],
    ) -> Result<(), StoreError> {
        let sql = insert.to_sql(self.dialect());
        self.begin_if_needed()?;
        self.conn.execute_batch("SAVEPOINT bulk_insert")?;

        for row in rows {
            if let Err(e) = self.execute_insert(&sql, row) {
                self.conn
                    .execute_batch("ROLLBACK TO bulk_insert; RELEASE bulk_insert")?;
                return Err(e.with_statement(sql));
            }
        }
        self.conn.execute_batch("RELEASE bulk_insert")?;
        Ok(())
    }

    fn insert_row(&mut self, insert: &InsertStatement, row: &[Value]) -> Result<(), StoreError> {
        let sql = insert.to_sql(self.dialect());
        self.begin_if_needed()?;
        self.execute_insert(&sql, row).map_err(|e| e.with_statement(sql))
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }
}
