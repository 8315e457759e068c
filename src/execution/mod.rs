//! Import pipeline: read → normalize → clean → reconcile → load.
//!
//! [`Importer`] sits "above" [`crate::ingestion`], [`crate::processing`] and
//! [`crate::reconcile`] and provides:
//!
//! - fail-fast validation (table name, file format, headers) before the store is touched
//! - blocking resolution of schema decisions through a [`DecisionSurface`]
//! - schema statements and the bulk load through a [`RelationalStore`]
//! - observer hooks with alert thresholds for monitoring
//!
//! ## Example
//!
//! ```no_run
//! use sql_importer::execution::{ImportOptions, Importer, ScriptedDecisions};
//! use sql_importer::reconcile::ExistingTableAction;
//! use sql_importer::store::MemoryStore;
//!
//! # fn main() -> Result<(), sql_importer::ImportError> {
//! let importer = Importer::new(ImportOptions::default());
//! let mut store = MemoryStore::new();
//! let mut decisions = ScriptedDecisions::new(ExistingTableAction::Append);
//!
//! let summary = importer.run("contacts.csv", "contacts", &mut store, &mut decisions)?;
//! println!("Imported {} rows into '{}'", summary.rows_inserted, summary.table);
//! # Ok(())
//! # }
//! ```

pub mod loader;
mod observer;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{ImportError, ImportResult};
use crate::ingestion::{read_file, IngestionFormat, IngestionOptions};
use crate::processing::{clean, normalize_headers, CleanOptions};
use crate::reconcile::{
    reconcile, ColumnMapping, Decision, DecisionRequest, ExistingTableAction, LoadPlan,
    PlanKind, ReconcileConfig, Reconciliation,
};
use crate::store::{CreateTable, Ddl, DestinationState, DropTable, RelationalStore, TableName};
use crate::types::{ColumnDescriptor, DataSet};

pub use loader::{write_failure_log, BulkLoader, LoadReport, RowFailure};
pub use observer::{
    severity_for_error, CompositeObserver, FileObserver, ImportContext, ImportObserver,
    ImportSeverity, ImportStats, LogObserver, StdErrObserver,
};

/// Answers the reconciler's questions while an import is suspended.
///
/// Both calls block the import until they return.
pub trait DecisionSurface {
    /// The destination table exists; pick what to do with it.
    fn choose_action(
        &mut self,
        table: &TableName,
        columns: &[ColumnDescriptor],
    ) -> ExistingTableAction;

    /// Map every file column onto a destination column (or skip it). `None` cancels.
    fn map_columns(
        &mut self,
        table: &TableName,
        file_columns: &[String],
        table_columns: &[ColumnDescriptor],
    ) -> Option<ColumnMapping>;
}

/// Decisions fixed up front, for non-interactive runs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedDecisions {
    action: ExistingTableAction,
    mapping: Option<ColumnMapping>,
    asked: usize,
}

impl ScriptedDecisions {
    /// Answer every existing-table question with `action`. A mapping request is cancelled
    /// unless [`Self::with_mapping`] supplied one.
    pub fn new(action: ExistingTableAction) -> Self {
        Self {
            action,
            mapping: None,
            asked: 0,
        }
    }

    pub fn with_mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    /// How many questions were answered.
    pub fn asked(&self) -> usize {
        self.asked
    }
}

impl DecisionSurface for ScriptedDecisions {
    fn choose_action(
        &mut self,
        _table: &TableName,
        _columns: &[ColumnDescriptor],
    ) -> ExistingTableAction {
        self.asked += 1;
        self.action
    }

    fn map_columns(
        &mut self,
        _table: &TableName,
        _file_columns: &[String],
        _table_columns: &[ColumnDescriptor],
    ) -> Option<ColumnMapping> {
        self.asked += 1;
        self.mapping.clone()
    }
}

/// Drive a [`Reconciliation`] to a [`LoadPlan`], asking `surface` at each suspension.
pub fn resolve_plan<D>(mut state: Reconciliation, surface: &mut D) -> ImportResult<LoadPlan>
where
    D: DecisionSurface + ?Sized,
{
    loop {
        let pending = match state {
            Reconciliation::Ready(plan) => return Ok(plan),
            Reconciliation::WaitingForDecision(pending) => pending,
        };
        let decision = match pending.request() {
            DecisionRequest::ExistingTable { table, columns } => {
                Decision::Action(surface.choose_action(table, columns))
            }
            DecisionRequest::ColumnMapping {
                table,
                file_columns,
                table_columns,
            } => surface
                .map_columns(table, file_columns, table_columns)
                .map_or(Decision::Cancel, Decision::Mapping),
        };
        state = pending.resolve(decision)?;
    }
}

/// Options for an [`Importer`].
#[derive(Clone)]
pub struct ImportOptions {
    pub ingestion: IngestionOptions,
    pub clean: CleanOptions,
    pub reconcile: ReconcileConfig,
    /// Optional observer for import outcomes.
    pub observer: Option<Arc<dyn ImportObserver>>,
    /// Failures at or above this severity are also reported via [`ImportObserver::on_alert`].
    pub alert_at_or_above: ImportSeverity,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            ingestion: IngestionOptions::default(),
            clean: CleanOptions::default(),
            reconcile: ReconcileConfig::default(),
            observer: None,
            alert_at_or_above: ImportSeverity::Critical,
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("ingestion", &self.ingestion)
            .field("clean", &self.clean)
            .field("reconcile", &self.reconcile)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub table: String,
    pub plan: PlanKind,
    /// Rows read from the file.
    pub rows_read: usize,
    pub rows_inserted: usize,
    /// The table was created by this import.
    pub created: bool,
    /// The previous table was dropped by this import.
    pub dropped: bool,
}

/// A file that passed every check that does not need the destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImport {
    pub table: TableName,
    pub format: IngestionFormat,
    /// Normalized and cleaned data.
    pub data: DataSet,
}

/// Runs imports with fixed [`ImportOptions`].
#[derive(Debug, Clone, Default)]
pub struct Importer {
    options: ImportOptions,
}

impl Importer {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import `path` into `table` on an already open store.
    pub fn run<S, D>(
        &self,
        path: impl AsRef<Path>,
        table: &str,
        store: &mut S,
        decisions: &mut D,
    ) -> ImportResult<ImportSummary>
    where
        S: RelationalStore + ?Sized,
        D: DecisionSurface + ?Sized,
    {
        let path = path.as_ref();
        self.observed(path, table, || {
            let prepared = self.prepare(path, table)?;
            self.apply(prepared, store, decisions)
        })
    }

    /// Import `path` into `table`, opening the store with `connect` only after the file
    /// passed validation. The store is dropped when the import ends, however it ends.
    pub fn run_with<S, F, D>(
        &self,
        path: impl AsRef<Path>,
        table: &str,
        connect: F,
        decisions: &mut D,
    ) -> ImportResult<ImportSummary>
    where
        S: RelationalStore,
        F: FnOnce() -> ImportResult<S>,
        D: DecisionSurface + ?Sized,
    {
        let path = path.as_ref();
        self.observed(path, table, || {
            let prepared = self.prepare(path, table)?;
            let mut store = connect()?;
            self.apply(prepared, &mut store, decisions)
        })
    }

    /// Validate the table name and format, then read, normalize and clean the file.
    pub fn prepare(&self, path: impl AsRef<Path>, table: &str) -> ImportResult<PreparedImport> {
        let path = path.as_ref();
        let table = TableName::parse(table)?;
        let format = match self.options.ingestion.format {
            Some(f) => f,
            None => IngestionFormat::from_path(path)?,
        };
        let ingestion = IngestionOptions {
            format: Some(format),
            ..self.options.ingestion.clone()
        };
        let data = read_prepared(path, &ingestion, &self.options.clean)?;
        Ok(PreparedImport {
            table,
            format,
            data,
        })
    }

    /// Reconcile a prepared file against the destination and load it.
    pub fn apply<S, D>(
        &self,
        prepared: PreparedImport,
        store: &mut S,
        decisions: &mut D,
    ) -> ImportResult<ImportSummary>
    where
        S: RelationalStore + ?Sized,
        D: DecisionSurface + ?Sized,
    {
        let PreparedImport { table, data, .. } = prepared;
        let rows_read = data.row_count();

        let destination = DestinationState::read(store, &table)?;
        let reconciliation =
            reconcile(table.as_str(), data, &destination, &self.options.reconcile)?;
        let plan = resolve_plan(reconciliation, decisions)?;
        execute_plan(store, &table, plan, rows_read)
    }

    /// Read up to `rows` normalized, cleaned rows for display.
    pub fn preview(&self, path: impl AsRef<Path>, rows: usize) -> ImportResult<DataSet> {
        preview(path, rows, &self.options)
    }

    fn observed<F>(&self, path: &Path, table: &str, f: F) -> ImportResult<ImportSummary>
    where
        F: FnOnce() -> ImportResult<ImportSummary>,
    {
        let result = f();
        let Some(observer) = &self.options.observer else {
            return result;
        };

        let ctx = ImportContext {
            path: path.to_path_buf(),
            format: self
                .options
                .ingestion
                .format
                .or_else(|| IngestionFormat::from_path(path).ok()),
            table: table.to_string(),
        };
        match &result {
            Ok(summary) => observer.on_success(
                &ctx,
                ImportStats {
                    plan: summary.plan,
                    rows_read: summary.rows_read,
                    rows_inserted: summary.rows_inserted,
                },
            ),
            Err(e) => {
                if let ImportError::BatchInsertFailure { report, .. } = e {
                    for failure in &report.failures {
                        observer.on_row_failure(&ctx, failure);
                    }
                }
                let severity = severity_for_error(e);
                observer.on_failure(&ctx, severity, e);
                if severity >= self.options.alert_at_or_above {
                    observer.on_alert(&ctx, severity, e);
                }
            }
        }
        result
    }
}

/// Read up to `rows` rows of `path`, normalized and cleaned, without touching any store.
pub fn preview(
    path: impl AsRef<Path>,
    rows: usize,
    options: &ImportOptions,
) -> ImportResult<DataSet> {
    let ingestion = IngestionOptions {
        max_rows: Some(rows),
        ..options.ingestion.clone()
    };
    read_prepared(path.as_ref(), &ingestion, &options.clean)
}

fn read_prepared(
    path: &Path,
    ingestion: &IngestionOptions,
    clean_options: &CleanOptions,
) -> ImportResult<DataSet> {
    let mut data = read_file(path, ingestion)?;
    normalize_headers(&mut data)?;
    Ok(clean(&data, clean_options))
}

fn execute_plan<S>(
    store: &mut S,
    table: &TableName,
    plan: LoadPlan,
    rows_read: usize,
) -> ImportResult<ImportSummary>
where
    S: RelationalStore + ?Sized,
{
    let mut summary = ImportSummary {
        table: table.to_string(),
        plan: plan.kind(),
        rows_read,
        rows_inserted: 0,
        created: false,
        dropped: false,
    };

    let data = match plan {
        LoadPlan::Aborted => {
            log::warn!("import into '{table}' aborted before loading");
            return Err(ImportError::SchemaDecisionAborted {
                table: table.to_string(),
            });
        }
        LoadPlan::CreateAndInsert { columns, data } => {
            let create = CreateTable::new(table.clone(), columns)?;
            run_ddl(store, Ddl::Create(create))?;
            summary.created = true;
            data
        }
        LoadPlan::RecreateAndInsert { columns, data } => {
            let create = CreateTable::new(table.clone(), columns)?;
            log::warn!("dropping existing table '{table}' and every row in it");
            run_ddl(store, Ddl::Drop(DropTable { table: table.clone() }))?;
            summary.dropped = true;
            run_ddl(store, Ddl::Create(create))?;
            summary.created = true;
            data
        }
        LoadPlan::AppendSubset(data) | LoadPlan::RemapThenInsert(data) => data,
    };

    let report = BulkLoader::new(store).load(table, &data)?;
    summary.rows_inserted = report.inserted;
    Ok(summary)
}

fn run_ddl<S>(store: &mut S, ddl: Ddl) -> ImportResult<()>
where
    S: RelationalStore + ?Sized,
{
    let table = ddl.table().to_string();
    log::info!("executing on '{table}':\n{}", ddl.to_sql(store.dialect()));
    store
        .execute_ddl(&ddl)
        .map_err(|e| ImportError::store(table.as_str(), e))?;
    store.commit().map_err(|e| ImportError::store(table, e))
}
