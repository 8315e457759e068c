//! Destination store contract.
//!
//! The import core talks to the relational store only through [`RelationalStore`]: existence
//! check, catalog read, schema statements, batched and single-row inserts, and commit. Statements
//! are passed as typed values from [`sql`] and rendered by the store for its own [`Dialect`].
//!
//! Two stores ship with the crate:
//!
//! - [`MemoryStore`]: in-process tables that record every call (tests, dry runs)
//! - `SqliteStore`: a SQLite database file (feature `sqlite`)

pub mod memory;
pub mod sql;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use thiserror::Error;

use crate::error::{ImportError, ImportResult};
use crate::types::{ColumnDescriptor, Value};

pub use memory::{MemoryStore, MemoryTable, StoreCall};
pub use sql::{quote_ident, CreateTable, Ddl, Dialect, DropTable, InsertStatement, TableName};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// A rejection reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    /// Rendered statement that failed, when there is one.
    pub statement: Option<String>,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            statement: None,
        }
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }
}

/// Operations the import core needs from a relational store.
pub trait RelationalStore {
    /// SQL flavor used to render statements.
    fn dialect(&self) -> Dialect;

    fn table_exists(&mut self, table: &TableName) -> Result<bool, StoreError>;

    /// Ordered column descriptors of an existing table, with catalog types.
    fn table_columns(&mut self, table: &TableName) -> Result<Vec<ColumnDescriptor>, StoreError>;

    fn execute_ddl(&mut self, ddl: &Ddl) -> Result<(), StoreError>;

    /// Insert every row or none of them.
    fn insert_batch(
        &mut self,
        insert: &InsertStatement,
        rows: &[Vec<Value>],
    ) -> Result<(), StoreError>;

    fn insert_row(&mut self, insert: &InsertStatement, row: &[Value]) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;
}

/// Snapshot of the destination table taken once at the start of reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationState {
    Absent,
    Present(Vec<ColumnDescriptor>),
}

impl DestinationState {
    /// Read the destination's existence and catalog columns.
    pub fn read<S>(store: &mut S, table: &TableName) -> ImportResult<Self>
    where
        S: RelationalStore + ?Sized,
    {
        let exists = store
            .table_exists(table)
            .map_err(|e| ImportError::store(table.as_str(), e))?;
        if !exists {
            return Ok(Self::Absent);
        }
        let columns = store
            .table_columns(table)
            .map_err(|e| ImportError::store(table.as_str(), e))?;
        Ok(Self::Present(columns))
    }
}
