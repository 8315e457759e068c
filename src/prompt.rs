use std::io::{BufRead, Write};

use sql_importer::execution::DecisionSurface;
use sql_importer::reconcile::{ColumnMapping, ColumnTarget, ExistingTableAction};
use sql_importer::store::TableName;
use sql_importer::types::ColumnDescriptor;

const SKIP_LABEL: &str = "Skip Column";
const ACTION_QUESTION: &str = "[r]ecreate (drops all rows), [a]ppend, [m]ap columns, [q]uit: ";

/// Asks schema questions on a terminal. End of input cancels.
pub struct TerminalDecisions<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalDecisions<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{question}");
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

impl<R: BufRead, W: Write> DecisionSurface for TerminalDecisions<R, W> {
    fn choose_action(
        &mut self,
        table: &TableName,
        columns: &[ColumnDescriptor],
    ) -> ExistingTableAction {
        let _ = writeln!(self.output, "Table '{table}' already exists with columns:");
        for c in columns {
            let _ = writeln!(self.output, "  {}", c.display_label());
        }
        loop {
            let Some(answer) = self.ask(ACTION_QUESTION) else {
                return ExistingTableAction::Abort;
            };
            match answer.to_ascii_lowercase().as_str() {
                "r" | "recreate" => return ExistingTableAction::Recreate,
                "a" | "append" => return ExistingTableAction::Append,
                "m" | "map" | "remap" => return ExistingTableAction::Remap,
                "q" | "quit" | "abort" => return ExistingTableAction::Abort,
                _ => {
                    let _ = writeln!(self.output, "Please answer r, a, m or q.");
                }
            }
        }
    }

    fn map_columns(
        &mut self,
        table: &TableName,
        file_columns: &[String],
        table_columns: &[ColumnDescriptor],
    ) -> Option<ColumnMapping> {
        let _ = writeln!(self.output, "Map file columns onto '{table}':");
        let _ = writeln!(self.output, "  0) {SKIP_LABEL}");
        for (i, c) in table_columns.iter().enumerate() {
            let _ = writeln!(self.output, "  {}) {}", i + 1, c.display_label());
        }

        let mut mapping = ColumnMapping::new();
        for file_column in file_columns {
            let default = table_columns
                .iter()
                .position(|c| c.name.eq_ignore_ascii_case(file_column))
                .map_or(0, |i| i + 1);
            let target = loop {
                let answer =
                    self.ask(&format!("{file_column} [{default}] (number, q to cancel): "))?;
                if answer.eq_ignore_ascii_case("q") {
                    return None;
                }
                let choice = if answer.is_empty() {
                    Some(default)
                } else {
                    answer.parse::<usize>().ok()
                };
                match choice {
                    Some(0) => break ColumnTarget::Skip,
                    Some(n) if n <= table_columns.len() => {
                        break ColumnTarget::Column(table_columns[n - 1].name.clone());
                    }
                    _ => {
                        let _ = writeln!(self.output, "Choose 0 to {}.", table_columns.len());
                    }
                }
            };
            mapping.set(file_column.clone(), target);
        }
        Some(mapping)
    }
}
