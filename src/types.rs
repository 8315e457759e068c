//! Core data model types for an import.
//!
//! File readers produce an in-memory [`DataSet`] of untyped-by-schema [`Value`] cells. The
//! destination side is described with [`ColumnDescriptor`]s, whose [`ColumnType`] is either a
//! [`StorageType`] proposed by inference or a [`CatalogType`] read from the store's catalog.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Storage type proposed for a column of a table that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    /// 64-bit signed integer.
    Integer64,
    /// 64-bit floating point number.
    Float64,
    /// Date and time without time zone.
    Timestamp,
    /// Text of unbounded length.
    VariableText,
}

impl StorageType {
    /// Type label used when presenting the column (SQL Server spelling).
    pub fn label(self) -> &'static str {
        match self {
            Self::Integer64 => "BIGINT",
            Self::Float64 => "FLOAT",
            Self::Timestamp => "DATETIME",
            Self::VariableText => "NVARCHAR(MAX)",
        }
    }
}

const LENGTH_TYPES: &[&str] = &["varchar", "nvarchar", "char", "nchar", "binary", "varbinary"];
const DECIMAL_TYPES: &[&str] = &["decimal", "numeric"];

/// Column type as declared in the destination's catalog.
///
/// `max_length == Some(-1)` means an unbounded (`MAX`) length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogType {
    /// Lowercase base type name (`nvarchar`, `decimal`, `bigint`, ...).
    pub base: String,
    pub max_length: Option<i64>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

impl CatalogType {
    /// A parameterless type.
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim().to_ascii_lowercase(),
            max_length: None,
            precision: None,
            scale: None,
        }
    }

    /// A length-parameterized type; `-1` renders as `MAX`.
    pub fn with_length(base: impl Into<String>, max_length: i64) -> Self {
        Self {
            max_length: Some(max_length),
            ..Self::new(base)
        }
    }

    /// A precision/scale type such as `decimal(10,2)`.
    pub fn with_precision(base: impl Into<String>, precision: u32, scale: u32) -> Self {
        Self {
            precision: Some(precision),
            scale: Some(scale),
            ..Self::new(base)
        }
    }

    /// Parse a declared type such as `NVARCHAR(255)`, `nvarchar(max)` or `DECIMAL(10, 2)`.
    ///
    /// Parameters that do not fit the base type's shape are dropped.
    pub fn parse(declared: &str) -> Self {
        let declared = declared.trim();
        let Some((base, rest)) = declared.split_once('(') else {
            return Self::new(declared);
        };
        let params: Vec<&str> = rest
            .trim_end()
            .trim_end_matches(')')
            .split(',')
            .map(str::trim)
            .collect();

        let mut ty = Self::new(base);
        if LENGTH_TYPES.contains(&ty.base.as_str()) {
            ty.max_length = match params.first() {
                Some(p) if p.eq_ignore_ascii_case("max") => Some(-1),
                Some(p) => p.parse().ok(),
                None => None,
            };
        } else {
            ty.precision = params.first().and_then(|p| p.parse().ok());
            ty.scale = params.get(1).and_then(|p| p.parse().ok());
        }
        ty
    }

    /// Human-readable label, e.g. `nvarchar(255)`, `nvarchar(MAX)`, `decimal(10,2)`.
    pub fn label(&self) -> String {
        if LENGTH_TYPES.contains(&self.base.as_str()) {
            match self.max_length {
                Some(-1) => format!("{}(MAX)", self.base),
                Some(len) => format!("{}({len})", self.base),
                None => self.base.clone(),
            }
        } else if DECIMAL_TYPES.contains(&self.base.as_str()) {
            match (self.precision, self.scale) {
                (Some(p), Some(s)) => format!("{}({p},{s})", self.base),
                _ => self.base.clone(),
            }
        } else {
            self.base.clone()
        }
    }

    /// Closest storage family of this catalog type.
    pub fn family(&self) -> StorageType {
        let base = self.base.as_str();
        if base.contains("int") {
            StorageType::Integer64
        } else if ["float", "real", "double", "decimal", "numeric", "money"]
            .iter()
            .any(|t| base.contains(t))
        {
            StorageType::Float64
        } else if base.contains("date") || base.contains("time") {
            StorageType::Timestamp
        } else {
            StorageType::VariableText
        }
    }
}

/// Type of one destination column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Proposed by inference for a table being created.
    Inferred(StorageType),
    /// Declared explicitly (catalog read or fixed schema).
    Catalog(CatalogType),
}

impl ColumnType {
    pub fn label(&self) -> String {
        match self {
            Self::Inferred(t) => t.label().to_string(),
            Self::Catalog(t) => t.label(),
        }
    }

    pub fn family(&self) -> StorageType {
        match self {
            Self::Inferred(t) => *t,
            Self::Catalog(t) => t.family(),
        }
    }
}

/// A `(name, type)` pair describing one destination column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn inferred(name: impl Into<String>, storage_type: StorageType) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Inferred(storage_type),
        }
    }

    pub fn catalog(name: impl Into<String>, catalog_type: CatalogType) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Catalog(catalog_type),
        }
    }

    /// `name (type)` label shown when mapping file columns onto this column.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.column_type.label())
    }
}

/// A single cell of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Date and time.
    Timestamp(NaiveDateTime),
    /// UTF-8 text.
    Utf8(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Utf8(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Self::Utf8(v) => f.write_str(v),
        }
    }
}

/// In-memory tabular value.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as `columns`. Every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Ordered column names.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from column names and rows.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate the cells of one column, top to bottom.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(idx))
    }

    /// A copy of the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Keep only the named columns, in the given order. Unknown names are ignored.
    ///
    /// The row count never changes.
    pub fn select_columns<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let idxs: Vec<usize> = names
            .iter()
            .filter_map(|n| self.index_of(n.as_ref()))
            .collect();
        let columns = idxs.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| idxs.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Self { columns, rows }
    }

    /// Rename columns in place using `rename`, which returns the new name or `None` to keep it.
    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for column in &mut self.columns {
            if let Some(new_name) = rename(column) {
                *column = new_name;
            }
        }
    }
}
