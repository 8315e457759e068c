//! `sql-importer` loads spreadsheet and delimited-text files into relational tables.
//!
//! An import reads a file into an in-memory [`types::DataSet`], normalizes its headers into safe
//! identifiers, cleans its cells, and then reconciles it against the destination table:
//!
//! - destination absent: the table is created with inferred column types
//! - destination present: the caller chooses to drop and recreate it, append the shared
//!   columns, or map file columns onto table columns explicitly
//!
//! Rows are then inserted with one batched insert, falling back to row-by-row inserts (and a
//! failure log) when the batch is rejected.
//!
//! ## What you can read
//!
//! **File formats (auto-detected by extension):**
//!
//! - **CSV**: `.csv`
//! - **TSV**: `.tsv`
//! - **Spreadsheets** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`
//!
//! Any other extension fails with [`ImportError::UnsupportedFormat`] before a destination is
//! touched.
//!
//! ## Quick example: import into SQLite
//!
//! ```no_run
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> Result<(), sql_importer::ImportError> {
//! use sql_importer::execution::{ImportOptions, Importer, ScriptedDecisions};
//! use sql_importer::reconcile::ExistingTableAction;
//! use sql_importer::store::SqliteStore;
//!
//! let importer = Importer::new(ImportOptions::default());
//! let mut decisions = ScriptedDecisions::new(ExistingTableAction::Append);
//! let summary = importer.run_with(
//!     "exhibitors.xlsx",
//!     "exhibitors",
//!     || SqliteStore::open("imports.db"),
//!     &mut decisions,
//! )?;
//! println!("Imported {} rows into '{}'", summary.rows_inserted, summary.table);
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```
//!
//! ## Driving decisions yourself
//!
//! [`reconcile::reconcile`] is a small state machine. When the destination exists it returns
//! [`reconcile::Reconciliation::WaitingForDecision`]; resume it with
//! [`reconcile::PendingDecision::resolve`], or let [`execution::resolve_plan`] ask a
//! [`execution::DecisionSurface`] for you.
//!
//! ## Modules
//!
//! - [`ingestion`]: file reading (CSV/TSV, spreadsheets)
//! - [`processing`]: header normalization, cell cleaning, type inference
//! - [`reconcile`]: schema reconciliation and column mappings
//! - [`store`]: relational store contract, SQL statements, in-memory and SQLite stores
//! - [`execution`]: import pipeline, bulk loader, observers
//! - [`config`]: JSON configuration file
//! - [`types`]: data model
//! - [`error`]: error types used across the crate

pub mod config;
pub mod error;
pub mod execution;
pub mod ingestion;
pub mod processing;
pub mod reconcile;
pub mod store;
pub mod types;

pub use error::{ImportError, ImportResult};
