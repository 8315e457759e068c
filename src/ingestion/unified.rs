//! Unified file reading entrypoint.
//!
//! Most callers should use [`read_file`], which reads a file into an in-memory
//! [`crate::types::DataSet`] with raw headers and raw cells.
//!
//! - If [`IngestionOptions::format`] is `None`, the format is inferred from the file extension.
//! - An unknown extension fails with [`ImportError::UnsupportedFormat`] before the file is
//!   opened.

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::types::DataSet;

use super::csv;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        Self::from_extension(ext).ok_or_else(|| ImportError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: ext.to_string(),
        })
    }
}

/// How to choose sheet(s) when reading a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// Read the first sheet (default).
    #[default]
    First,
    /// Read a single named sheet.
    Sheet(String),
    /// Read all sheets and concatenate rows.
    AllSheets,
    /// Read only the listed sheets (in order) and concatenate rows.
    Sheets(Vec<String>),
}

/// Options controlling [`read_file`].
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionOptions {
    /// If `None`, auto-detect format from file extension.
    pub format: Option<IngestionFormat>,
    /// Workbook-specific options.
    pub excel_sheet_selection: ExcelSheetSelection,
    /// Read at most this many data rows (preview reads).
    pub max_rows: Option<usize>,
}

/// Read a delimited-text or spreadsheet file.
///
/// # Examples
///
/// ```no_run
/// use sql_importer::ingestion::{read_file, IngestionOptions};
///
/// # fn main() -> Result<(), sql_importer::ImportError> {
/// let ds = read_file("contacts.csv", &IngestionOptions::default())?;
/// println!("rows={} columns={:?}", ds.row_count(), ds.columns);
/// # Ok(())
/// # }
/// ```
///
/// Preview only the first rows of a workbook's second sheet:
///
/// ```no_run
/// use sql_importer::ingestion::{read_file, ExcelSheetSelection, IngestionOptions};
///
/// # fn main() -> Result<(), sql_importer::ImportError> {
/// let opts = IngestionOptions {
///     excel_sheet_selection: ExcelSheetSelection::Sheet("Leads".to_string()),
///     max_rows: Some(10),
///     ..Default::default()
/// };
/// let ds = read_file("exhibitors.xlsx", &opts)?;
/// println!("rows={}", ds.row_count());
/// # Ok(())
/// # }
/// ```
pub fn read_file(path: impl AsRef<Path>, options: &IngestionOptions) -> ImportResult<DataSet> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => IngestionFormat::from_path(path)?,
    };

    let ds = match fmt {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path, b',', options.max_rows)?,
        IngestionFormat::Tsv => csv::ingest_csv_from_path(path, b'\t', options.max_rows)?,
        IngestionFormat::Excel => {
            read_excel_dispatch(path, &options.excel_sheet_selection, options.max_rows)?
        }
    };
    log::info!(
        "read {} rows x {} columns from {} ({fmt:?})",
        ds.row_count(),
        ds.column_count(),
        path.display()
    );
    Ok(ds)
}

fn read_excel_dispatch(
    path: &Path,
    sel: &ExcelSheetSelection,
    max_rows: Option<usize>,
) -> ImportResult<DataSet> {
    // Avoid unused warnings when the feature is off.
    let _ = (path, sel, max_rows);

    #[cfg(feature = "excel")]
    {
        use super::excel;

        match sel {
            ExcelSheetSelection::First => excel::ingest_excel_from_path(path, None, max_rows),
            ExcelSheetSelection::Sheet(name) => {
                excel::ingest_excel_from_path(path, Some(name.as_str()), max_rows)
            }
            ExcelSheetSelection::AllSheets => {
                excel::ingest_excel_workbook_from_path(path, None, max_rows)
            }
            ExcelSheetSelection::Sheets(names) => {
                let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
                excel::ingest_excel_workbook_from_path(path, Some(refs.as_slice()), max_rows)
            }
        }
    }

    #[cfg(not(feature = "excel"))]
    {
        Err(ImportError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: "spreadsheet (enable cargo feature 'excel')".to_string(),
        })
    }
}
