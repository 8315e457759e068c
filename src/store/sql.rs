//! Typed DDL/DML statements and identifier handling.
//!
//! Statements are built from validated names only: a [`TableName`] cannot exist without
//! passing the `^[a-zA-Z0-9_]+$` check, and column identifiers are rejected when empty and
//! bracket-escaped when rendered.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{IdentifierKind, ImportError, ImportResult};
use crate::types::{ColumnDescriptor, ColumnType, StorageType};

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid table name regex"));

/// SQL flavor a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    SqlServer,
    Sqlite,
}

/// A destination table name that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName(String);

impl TableName {
    /// Validate `name` against `^[a-zA-Z0-9_]+$`.
    pub fn parse(name: &str) -> ImportResult<Self> {
        if TABLE_NAME.is_match(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(ImportError::InvalidIdentifier {
                kind: IdentifierKind::Table,
                value: name.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Bracket-quote an identifier, doubling any `]`.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn check_column(name: &str) -> ImportResult<()> {
    if name.trim().is_empty() {
        return Err(ImportError::InvalidIdentifier {
            kind: IdentifierKind::Column,
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Render a column type for `dialect`.
pub fn sql_type(column_type: &ColumnType, dialect: Dialect) -> String {
    match (column_type, dialect) {
        (ColumnType::Inferred(StorageType::VariableText), Dialect::Sqlite) => "TEXT".to_string(),
        (ColumnType::Inferred(t), _) => t.label().to_string(),
        (ColumnType::Catalog(t), Dialect::Sqlite) if t.max_length == Some(-1) => {
            t.base.to_ascii_uppercase()
        }
        (ColumnType::Catalog(t), _) => t.label().to_ascii_uppercase(),
    }
}

/// `CREATE TABLE` with one column per descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTable {
    pub table: TableName,
    pub columns: Vec<ColumnDescriptor>,
}

impl CreateTable {
    pub fn new(table: TableName, columns: Vec<ColumnDescriptor>) -> ImportResult<Self> {
        if columns.is_empty() {
            return Err(ImportError::SchemaMismatch {
                message: format!("cannot create table '{table}' without columns"),
            });
        }
        for c in &columns {
            check_column(&c.name)?;
        }
        Ok(Self { table, columns })
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let column_defs = self
            .columns
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), sql_type(&c.column_type, dialect)))
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!(
            "CREATE TABLE {} (\n    {column_defs}\n);",
            quote_ident(self.table.as_str())
        )
    }
}

/// `DROP TABLE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTable {
    pub table: TableName,
}

impl DropTable {
    pub fn to_sql(&self, _dialect: Dialect) -> String {
        format!("DROP TABLE {}", quote_ident(self.table.as_str()))
    }
}

/// A schema statement issued through [`super::RelationalStore::execute_ddl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    Create(CreateTable),
    Drop(DropTable),
}

impl Ddl {
    pub fn table(&self) -> &TableName {
        match self {
            Self::Create(c) => &c.table,
            Self::Drop(d) => &d.table,
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Self::Create(c) => c.to_sql(dialect),
            Self::Drop(d) => d.to_sql(dialect),
        }
    }
}

/// Parameterized `INSERT` naming the columns it fills, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub table: TableName,
    pub columns: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: TableName, columns: Vec<String>) -> ImportResult<Self> {
        for c in &columns {
            check_column(c)?;
        }
        Ok(Self { table, columns })
    }

    pub fn to_sql(&self, _dialect: Dialect) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({columns}) VALUES ({placeholders})",
            quote_ident(self.table.as_str())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{quote_ident, CreateTable, Dialect, InsertStatement, TableName};
    use crate::error::ImportError;
    use crate::types::{CatalogType, ColumnDescriptor, StorageType};

    #[test]
    fn table_names_are_validated() {
        assert!(TableName::parse("exhibitors_2024").is_ok());
        for bad in ["bad name;", "", "t]; DROP TABLE x", "naïve", "a-b"] {
            assert!(matches!(
                TableName::parse(bad),
                Err(ImportError::InvalidIdentifier { .. })
            ));
        }
    }

    #[test]
    fn identifiers_are_bracket_escaped() {
        assert_eq!(quote_ident("name"), "[name]");
        assert_eq!(quote_ident("a]b"), "[a]]b]");
    }

    #[test]
    fn create_table_renders_per_dialect() {
        let table = TableName::parse("contacts").unwrap();
        let stmt = CreateTable::new(
            table,
            vec![
                ColumnDescriptor::inferred("id", StorageType::Integer64),
                ColumnDescriptor::inferred("name", StorageType::VariableText),
                ColumnDescriptor::catalog("zip", CatalogType::with_length("nvarchar", 20)),
                ColumnDescriptor::catalog("notes", CatalogType::with_length("nvarchar", -1)),
            ],
        )
        .unwrap();

        assert_eq!(
            stmt.to_sql(Dialect::SqlServer),
            "CREATE TABLE [contacts] (\n    [id] BIGINT,\n    [name] NVARCHAR(MAX),\n    [zip] NVARCHAR(20),\n    [notes] NVARCHAR(MAX)\n);"
        );
        assert_eq!(
            stmt.to_sql(Dialect::Sqlite),
            "CREATE TABLE [contacts] (\n    [id] BIGINT,\n    [name] TEXT,\n    [zip] NVARCHAR(20),\n    [notes] NVARCHAR\n);"
        );
    }

    #[test]
    fn empty_column_identifiers_are_rejected() {
        let table = TableName::parse("t").unwrap();
        assert!(InsertStatement::new(table.clone(), vec![String::new()]).is_err());
        assert!(CreateTable::new(table, vec![]).is_err());
    }

    #[test]
    fn insert_uses_placeholders() {
        let stmt = InsertStatement::new(
            TableName::parse("t").unwrap(),
            vec!["a".to_string(), "b".to_string()],
        )
        .unwrap();
        assert_eq!(stmt.to_sql(Dialect::Sqlite), "INSERT INTO [t] ([a], [b]) VALUES (?, ?)");
    }
}
