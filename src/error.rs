use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::execution::LoadReport;
use crate::store::StoreError;

/// Convenience result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Which kind of identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// Destination table name.
    Table,
    /// Column name (after normalization).
    Column,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => f.write_str("table"),
            Self::Column => f.write_str("column"),
        }
    }
}

/// Error type returned by reading, reconciliation and loading.
///
/// This is a single error enum shared by every stage of an import, so callers can match on the
/// failure class without caring which stage produced it.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet reading error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV reading error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (configuration or failure log) error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A table or column name is not a safe identifier.
    #[error("invalid {kind} identifier '{value}': use only alphanumeric characters and underscores")]
    InvalidIdentifier { kind: IdentifierKind, value: String },

    /// The input file extension is not a supported tabular format.
    #[error("unsupported file format '{extension}' ({}): use .csv, .tsv, .xlsx, .xls, .xlsm, .xlsb or .ods", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    /// Two headers normalize to the same column name.
    #[error("duplicate column '{name}' after normalizing headers {raw:?}")]
    DuplicateColumn { name: String, raw: Vec<String> },

    /// The file's shape does not fit what a step requires.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A column mapping is not usable against the destination table.
    #[error("invalid column mapping for table '{table}': {message}")]
    InvalidMapping { table: String, message: String },

    /// Appending would insert no columns at all.
    #[error("no file column matches a column of table '{table}' (file columns: {columns:?})")]
    NoMatchingColumns { table: String, columns: Vec<String> },

    /// The caller declined to resolve a schema decision for an existing table.
    #[error("import into '{table}' aborted: schema decision was cancelled")]
    SchemaDecisionAborted { table: String },

    /// The batched insert failed; surviving rows were loaded one by one.
    #[error(
        "batch insert into '{table}' failed: {source} ({} of {} rows inserted row by row, {} failed)",
        report.inserted,
        report.attempted,
        report.failures.len()
    )]
    BatchInsertFailure {
        table: String,
        report: Box<LoadReport>,
        #[source]
        source: StoreError,
    },

    /// A store operation other than the data load failed.
    #[error("store error on table '{table}': {source}")]
    Store {
        table: String,
        #[source]
        source: StoreError,
    },

    /// Connecting to the destination failed.
    #[error("destination '{target}' unavailable: {message}")]
    DestinationUnavailable { target: String, message: String },

    /// Configuration file content is not usable.
    #[error("config error: {message}")]
    Config { message: String },
}

impl ImportError {
    pub(crate) fn store(table: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            table: table.into(),
            source,
        }
    }
}
