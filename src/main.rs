mod cli;
mod prompt;

use std::io;
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::{env, fmt::Write as _};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use sql_importer::config::ImporterConfig;
use sql_importer::execution::{
    write_failure_log, DecisionSurface, FileObserver, ImportOptions, Importer, ScriptedDecisions,
};
use sql_importer::ingestion::ExcelSheetSelection;
use sql_importer::reconcile::{ColumnMapping, ColumnTarget, ExistingTableAction};
use sql_importer::store::SqliteStore;
use sql_importer::types::{DataSet, Value};
use sql_importer::ImportError;

use crate::cli::{Cli, Commands, ImportArgs, PreviewArgs, SourceArgs};
use crate::prompt::TerminalDecisions;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sql_importer", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Import(args) => handle_import(&args),
        Commands::Preview(args) => handle_preview(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(source: &SourceArgs) -> Result<ImporterConfig> {
    match &source.config {
        Some(path) => {
            ImporterConfig::load(path).with_context(|| format!("Loading config from {path:?}"))
        }
        None => Ok(ImporterConfig::default()),
    }
}

fn import_options(source: &SourceArgs, config: &ImporterConfig) -> ImportOptions {
    let mut options = config.import_options();
    options.ingestion.excel_sheet_selection = if source.all_sheets {
        ExcelSheetSelection::AllSheets
    } else {
        match source.sheets.as_slice() {
            [] => ExcelSheetSelection::First,
            [one] => ExcelSheetSelection::Sheet(one.clone()),
            many => ExcelSheetSelection::Sheets(many.to_vec()),
        }
    };
    options
}

fn handle_import(args: &ImportArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    let Some(database) = args.database.clone().or_else(|| config.database.clone()) else {
        bail!("no database given: pass --database or set \"database\" in the config file");
    };

    let mut options = import_options(&args.source, &config);
    if let Some(path) = &args.log_file {
        options.observer = Some(Arc::new(FileObserver::new(path)));
    }
    let importer = Importer::new(options);

    info!(
        "Importing '{}' into table '{}' of {:?}",
        args.source.input.display(),
        args.table,
        database
    );
    let mut decisions = decision_surface(args);
    let result = importer.run_with(
        &args.source.input,
        &args.table,
        || SqliteStore::open(&database),
        decisions.as_mut(),
    );

    match result {
        Ok(summary) => {
            println!("Imported {} rows into '{}'", summary.rows_inserted, summary.table);
            Ok(())
        }
        Err(ImportError::BatchInsertFailure {
            table,
            report,
            source,
        }) => {
            if let Some(path) = &args.failure_log {
                write_failure_log(path, &report.failures)
                    .with_context(|| format!("Writing failure log to {path:?}"))?;
                eprintln!("Rejected rows written to {}", path.display());
            }
            Err(ImportError::BatchInsertFailure {
                table,
                report,
                source,
            }
            .into())
        }
        Err(e) => Err(e.into()),
    }
}

fn decision_surface(args: &ImportArgs) -> Box<dyn DecisionSurface> {
    let mapping = (!args.mappings.is_empty()).then(|| {
        args.mappings
            .iter()
            .map(|(file, table)| {
                let target = if table.is_empty() {
                    ColumnTarget::Skip
                } else {
                    ColumnTarget::Column(table.clone())
                };
                (file.clone(), target)
            })
            .collect::<ColumnMapping>()
    });

    match (args.on_existing.action(), mapping) {
        (None, None) => Box::new(TerminalDecisions::new(io::stdin().lock(), io::stderr())),
        (action, Some(mapping)) => Box::new(
            ScriptedDecisions::new(action.unwrap_or(ExistingTableAction::Remap))
                .with_mapping(mapping),
        ),
        (Some(action), None) => Box::new(ScriptedDecisions::new(action)),
    }
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let config = load_config(&args.source)?;
    let rows = args.rows.unwrap_or(config.preview_rows);
    let importer = Importer::new(import_options(&args.source, &config));

    let data = importer
        .preview(&args.source.input, rows)
        .with_context(|| format!("Reading {:?}", args.source.input))?;
    print!("{}", render_table(&data));
    println!("Showing {} records", data.row_count());
    Ok(())
}

fn render_table(data: &DataSet) -> String {
    let cells: Vec<Vec<String>> = data
        .rows
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let mut widths: Vec<usize> = data.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", format_row(&data.columns, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(out, "{}", format_row(&rule, &widths));
    for row in &cells {
        let _ = writeln!(out, "{}", format_row(row, &widths));
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string().replace(['\n', '\r', '\t'], " "),
    }
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(v, &w)| format!("{v:<w$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}
