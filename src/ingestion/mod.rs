//! File reading entrypoints and implementations.
//!
//! Most callers should use [`read_file`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`IngestionOptions`])
//! - reads into an in-memory [`crate::types::DataSet`] with the file's raw headers
//! - honors a `max_rows` hint for preview reads
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod unified;

pub use unified::{read_file, ExcelSheetSelection, IngestionFormat, IngestionOptions};
