use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ImportError;
use crate::ingestion::IngestionFormat;
use crate::reconcile::PlanKind;

use super::loader::RowFailure;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ImportSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (the import stopped without failing, e.g. a cancelled decision).
    Warning,
    /// Error-level event (import failed).
    Error,
    /// Critical error (destination or I/O failures).
    Critical,
}

/// Classify an import error.
pub fn severity_for_error(error: &ImportError) -> ImportSeverity {
    match error {
        ImportError::Io(_) | ImportError::DestinationUnavailable { .. } => ImportSeverity::Critical,
        ImportError::Csv(e) if e.is_io_error() => ImportSeverity::Critical,
        ImportError::SchemaDecisionAborted { .. } => ImportSeverity::Warning,
        _ => ImportSeverity::Error,
    }
}

/// Context about an import attempt.
#[derive(Debug, Clone)]
pub struct ImportContext {
    /// Input file.
    pub path: PathBuf,
    /// Format the file is read as, once known.
    pub format: Option<IngestionFormat>,
    /// Destination table as given by the caller.
    pub table: String,
}

/// Stats reported on a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub plan: PlanKind,
    pub rows_read: usize,
    pub rows_inserted: usize,
}

/// Observer interface for import outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ImportObserver: Send + Sync {
    /// Called when an import succeeds.
    fn on_success(&self, _ctx: &ImportContext, _stats: ImportStats) {}

    /// Called when an import fails.
    fn on_failure(&self, _ctx: &ImportContext, _severity: ImportSeverity, _error: &ImportError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called once per row rejected by the row-level fallback.
    fn on_row_failure(&self, _ctx: &ImportContext, _failure: &RowFailure) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ImportObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ImportObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ImportObserver for CompositeObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_row_failure(&self, ctx: &ImportContext, failure: &RowFailure) {
        for o in &self.observers {
            o.on_row_failure(ctx, failure);
        }
    }
}

/// Logs import events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ImportObserver for StdErrObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        eprintln!(
            "[import][ok] table={} path={} plan={} rows={}/{}",
            ctx.table,
            ctx.path.display(),
            stats.plan,
            stats.rows_inserted,
            stats.rows_read
        );
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        eprintln!(
            "[import][{:?}] table={} path={} err={}",
            severity,
            ctx.table,
            ctx.path.display(),
            error
        );
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        eprintln!(
            "[ALERT][import][{:?}] table={} path={} err={}",
            severity,
            ctx.table,
            ctx.path.display(),
            error
        );
    }

    fn on_row_failure(&self, ctx: &ImportContext, failure: &RowFailure) {
        eprintln!(
            "[import][row] table={} row={} err={}",
            ctx.table, failure.row_index, failure.error
        );
    }
}

/// Forwards import events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ImportObserver for LogObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        log::info!(
            "import into '{}' finished ({}): {} of {} rows inserted",
            ctx.table,
            stats.plan,
            stats.rows_inserted,
            stats.rows_read
        );
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        match severity {
            ImportSeverity::Info => log::info!("import into '{}': {error}", ctx.table),
            ImportSeverity::Warning => log::warn!("import into '{}': {error}", ctx.table),
            ImportSeverity::Error | ImportSeverity::Critical => {
                log::error!("import into '{}' failed: {error}", ctx.table)
            }
        }
    }
}

/// Appends import events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ImportObserver for FileObserver {
    fn on_success(&self, ctx: &ImportContext, stats: ImportStats) {
        self.append_line(&format!(
            "{} ok table={} path={} plan={} rows={}/{}",
            unix_ts(),
            ctx.table,
            ctx.path.display(),
            stats.plan,
            stats.rows_inserted,
            stats.rows_read
        ));
    }

    fn on_failure(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        self.append_line(&format!(
            "{} fail severity={:?} table={} path={} err={}",
            unix_ts(),
            severity,
            ctx.table,
            ctx.path.display(),
            error
        ));
    }

    fn on_alert(&self, ctx: &ImportContext, severity: ImportSeverity, error: &ImportError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} table={} path={} err={}",
            unix_ts(),
            severity,
            ctx.table,
            ctx.path.display(),
            error
        ));
    }

    fn on_row_failure(&self, ctx: &ImportContext, failure: &RowFailure) {
        let values = failure
            .values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.append_line(&format!(
            "{} row table={} row={} values=[{values}] err={}",
            unix_ts(),
            ctx.table,
            failure.row_index,
            failure.error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
