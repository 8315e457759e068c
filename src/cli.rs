use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use sql_importer::reconcile::ExistingTableAction;

#[derive(Debug, Parser)]
#[command(author, version, about = "Import CSV and spreadsheet files into SQL tables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a file into a table, creating or reconciling the table as needed
    Import(ImportArgs),
    /// Show the first rows of a file after header normalization and cleaning
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input file (.csv, .tsv, .xlsx, .xls, .xlsm, .xlsb, .ods)
    pub input: PathBuf,
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Worksheet to read (repeatable; sheets must share headers)
    #[arg(long = "sheet", action = clap::ArgAction::Append)]
    pub sheets: Vec<String>,
    /// Read every worksheet of a workbook
    #[arg(long, conflicts_with = "sheets")]
    pub all_sheets: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Destination table (letters, digits and underscores)
    #[arg(short, long)]
    pub table: String,
    /// SQLite database file (overrides the config's `database`)
    #[arg(short, long)]
    pub database: Option<PathBuf>,
    /// What to do when the table already exists
    #[arg(long, value_enum, default_value_t = OnExisting::Ask)]
    pub on_existing: OnExisting,
    /// Column mapping entry `file_column=table_column` (repeatable; implies remap)
    #[arg(long = "map", value_parser = parse_mapping)]
    pub mappings: Vec<(String, String)>,
    /// Write rows rejected by the row-level fallback to this JSON file
    #[arg(long)]
    pub failure_log: Option<PathBuf>,
    /// Append import outcomes to this log file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Number of rows to show (overrides the config's `preview_rows`)
    #[arg(short, long, visible_alias = "preview")]
    pub rows: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnExisting {
    /// Prompt on the terminal
    Ask,
    Recreate,
    Append,
    Remap,
    Abort,
}

impl OnExisting {
    pub fn action(self) -> Option<ExistingTableAction> {
        match self {
            Self::Ask => None,
            Self::Recreate => Some(ExistingTableAction::Recreate),
            Self::Append => Some(ExistingTableAction::Append),
            Self::Remap => Some(ExistingTableAction::Remap),
            Self::Abort => Some(ExistingTableAction::Abort),
        }
    }
}

fn parse_mapping(value: &str) -> Result<(String, String), String> {
    let (file, table) = value
        .split_once('=')
        .ok_or_else(|| format!("expected file_column=table_column, got '{value}'"))?;
    let file = file.trim();
    if file.is_empty() {
        return Err(format!("missing file column in '{value}'"));
    }
    Ok((file.to_string(), table.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::parse_mapping;

    #[test]
    fn mapping_entries() {
        assert_eq!(
            parse_mapping("tel = phone"),
            Ok(("tel".to_string(), "phone".to_string()))
        );
        assert_eq!(parse_mapping("notes="), Ok(("notes".to_string(), String::new())));
        assert!(parse_mapping("tel").is_err());
        assert!(parse_mapping("=phone").is_err());
    }
}
