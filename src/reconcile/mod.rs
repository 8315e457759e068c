//! Schema reconciliation: decide how an incoming [`DataSet`] lands in the destination table.
//!
//! [`reconcile`] returns a [`Reconciliation`]. When the destination is absent the plan is
//! ready immediately ([`LoadPlan::CreateAndInsert`]). When it already exists the reconciler
//! stops in [`Reconciliation::WaitingForDecision`]; the caller inspects
//! [`PendingDecision::request`] and resumes with [`PendingDecision::resolve`].
//!
//! ```
//! use sql_importer::reconcile::{
//!     reconcile, Decision, ExistingTableAction, LoadPlan, ReconcileConfig, Reconciliation,
//! };
//! use sql_importer::store::DestinationState;
//! use sql_importer::types::{ColumnDescriptor, DataSet, StorageType, Value};
//!
//! let incoming = DataSet::new(
//!     vec!["a".to_string(), "b".to_string()],
//!     vec![vec![Value::Utf8("1".to_string()), Value::Utf8("x".to_string())]],
//! );
//! let existing = DestinationState::Present(vec![
//!     ColumnDescriptor::inferred("a", StorageType::Integer64),
//!     ColumnDescriptor::inferred("c", StorageType::VariableText),
//! ]);
//!
//! let Reconciliation::WaitingForDecision(pending) =
//!     reconcile("t", incoming, &existing, &ReconcileConfig::default())?
//! else {
//!     unreachable!("destination exists")
//! };
//! let Reconciliation::Ready(LoadPlan::AppendSubset(data)) =
//!     pending.resolve(Decision::Action(ExistingTableAction::Append))?
//! else {
//!     unreachable!("append resolves immediately")
//! };
//! assert_eq!(data.columns, vec!["a"]);
//! # Ok::<(), sql_importer::ImportError>(())
//! ```

pub mod mapping;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{ImportError, ImportResult};
use crate::processing::infer_columns;
use crate::store::{DestinationState, TableName};
use crate::types::{ColumnDescriptor, DataSet};

pub use mapping::{ColumnMapping, ColumnTarget};

/// Fixed-schema settings passed in at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Project incoming data onto `fixed_columns` before reconciling.
    pub use_fixed_schema: bool,
    /// Ordered destination columns with declared types.
    pub fixed_columns: Vec<ColumnDescriptor>,
    /// Normalized file column name → fixed column name. Only used with `use_fixed_schema`.
    pub rename_hints: BTreeMap<String, String>,
}

/// What to do when the destination table already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistingTableAction {
    /// Drop the table and create it again from the incoming columns.
    Recreate,
    /// Insert the columns both sides share.
    Append,
    /// Ask for an explicit column mapping.
    Remap,
    Abort,
}

impl fmt::Display for ExistingTableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recreate => "recreate",
            Self::Append => "append",
            Self::Remap => "remap",
            Self::Abort => "abort",
        })
    }
}

/// How incoming data will be applied to the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPlan {
    /// Destination absent: create it with `columns`, then insert `data`.
    CreateAndInsert {
        columns: Vec<ColumnDescriptor>,
        data: DataSet,
    },
    /// Drop the destination, create it with `columns`, then insert `data`.
    RecreateAndInsert {
        columns: Vec<ColumnDescriptor>,
        data: DataSet,
    },
    /// Insert the columns shared with the destination.
    AppendSubset(DataSet),
    /// Insert data renamed through a column mapping.
    RemapThenInsert(DataSet),
    /// The caller declined to decide. Nothing further may be done to the destination.
    Aborted,
}

impl LoadPlan {
    pub fn kind(&self) -> PlanKind {
        match self {
            Self::CreateAndInsert { .. } => PlanKind::Create,
            Self::RecreateAndInsert { .. } => PlanKind::Recreate,
            Self::AppendSubset(_) => PlanKind::Append,
            Self::RemapThenInsert(_) => PlanKind::Remap,
            Self::Aborted => PlanKind::Aborted,
        }
    }

    /// Rows to insert, if the plan inserts any.
    pub fn data(&self) -> Option<&DataSet> {
        match self {
            Self::CreateAndInsert { data, .. } | Self::RecreateAndInsert { data, .. } => Some(data),
            Self::AppendSubset(data) | Self::RemapThenInsert(data) => Some(data),
            Self::Aborted => None,
        }
    }
}

/// Discriminant of a [`LoadPlan`], for summaries and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Create,
    Recreate,
    Append,
    Remap,
    Aborted,
}

impl fmt::Display for PlanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Recreate => "recreate",
            Self::Append => "append",
            Self::Remap => "remap",
            Self::Aborted => "aborted",
        })
    }
}

/// A decision supplied by the caller to resume a [`PendingDecision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Action(ExistingTableAction),
    /// A column mapping. Also accepted in place of [`ExistingTableAction::Remap`].
    Mapping(ColumnMapping),
    Cancel,
}

/// Payload the caller needs to make a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionRequest<'a> {
    /// The destination exists; pick an [`ExistingTableAction`].
    ExistingTable {
        table: &'a TableName,
        columns: &'a [ColumnDescriptor],
    },
    /// Map each file column onto a destination column or skip it.
    ColumnMapping {
        table: &'a TableName,
        file_columns: &'a [String],
        table_columns: &'a [ColumnDescriptor],
    },
}

/// Outcome of one reconciliation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    Ready(LoadPlan),
    WaitingForDecision(PendingDecision),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    ExistingTable,
    ColumnMapping,
}

/// A reconciliation suspended until the caller decides.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDecision {
    table: TableName,
    incoming: DataSet,
    destination: Vec<ColumnDescriptor>,
    new_columns: Vec<ColumnDescriptor>,
    stage: Stage,
}

impl PendingDecision {
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// What is being asked.
    pub fn request(&self) -> DecisionRequest<'_> {
        match self.stage {
            Stage::ExistingTable => DecisionRequest::ExistingTable {
                table: &self.table,
                columns: &self.destination,
            },
            Stage::ColumnMapping => DecisionRequest::ColumnMapping {
                table: &self.table,
                file_columns: &self.incoming.columns,
                table_columns: &self.destination,
            },
        }
    }

    /// Resume with `decision`.
    ///
    /// Choosing [`ExistingTableAction::Remap`] moves to a second request for the mapping
    /// itself. Cancelling (or aborting) at either stage yields [`LoadPlan::Aborted`].
    pub fn resolve(self, decision: Decision) -> ImportResult<Reconciliation> {
        match (self.stage, decision) {
            (_, Decision::Cancel | Decision::Action(ExistingTableAction::Abort)) => {
                log::warn!("schema decision for '{}' cancelled", self.table);
                Ok(Reconciliation::Ready(LoadPlan::Aborted))
            }
            (_, Decision::Mapping(mapping)) => {
                let data = mapping.apply(self.table.as_str(), &self.incoming, &self.destination)?;
                if data.column_count() == 0 {
                    return Err(ImportError::InvalidMapping {
                        table: self.table.to_string(),
                        message: "every file column is skipped".to_string(),
                    });
                }
                Ok(Reconciliation::Ready(LoadPlan::RemapThenInsert(data)))
            }
            (Stage::ExistingTable, Decision::Action(ExistingTableAction::Recreate)) => {
                Ok(Reconciliation::Ready(LoadPlan::RecreateAndInsert {
                    columns: self.new_columns,
                    data: self.incoming,
                }))
            }
            (Stage::ExistingTable, Decision::Action(ExistingTableAction::Append)) => {
                append_subset(&self.table, &self.incoming, &self.destination)
                    .map(|data| Reconciliation::Ready(LoadPlan::AppendSubset(data)))
            }
            (Stage::ExistingTable, Decision::Action(ExistingTableAction::Remap)) => {
                Ok(Reconciliation::WaitingForDecision(Self {
                    stage: Stage::ColumnMapping,
                    ..self
                }))
            }
            (Stage::ColumnMapping, Decision::Action(action)) => Err(ImportError::InvalidMapping {
                table: self.table.to_string(),
                message: format!("expected a column mapping, got action '{action}'"),
            }),
        }
    }
}

/// Start reconciling `incoming` against the destination `table`.
///
/// The table name is validated first. Fixed-schema projection (see [`ReconcileConfig`])
/// happens before anything else looks at the columns.
pub fn reconcile(
    table: &str,
    incoming: DataSet,
    destination: &DestinationState,
    config: &ReconcileConfig,
) -> ImportResult<Reconciliation> {
    let table = TableName::parse(table)?;
    let incoming = if config.use_fixed_schema {
        apply_fixed_schema(incoming, config)?
    } else {
        incoming
    };
    if incoming.column_count() == 0 {
        return Err(ImportError::SchemaMismatch {
            message: format!("no columns left to load into '{table}'"),
        });
    }

    let new_columns = new_table_columns(&incoming, config);
    match destination {
        DestinationState::Absent => Ok(Reconciliation::Ready(LoadPlan::CreateAndInsert {
            columns: new_columns,
            data: incoming,
        })),
        DestinationState::Present(columns) => {
            Ok(Reconciliation::WaitingForDecision(PendingDecision {
                table,
                incoming,
                destination: columns.clone(),
                new_columns,
                stage: Stage::ExistingTable,
            }))
        }
    }
}

/// Rename by hints, then keep the fixed columns that are present, in fixed order.
fn apply_fixed_schema(mut incoming: DataSet, config: &ReconcileConfig) -> ImportResult<DataSet> {
    incoming.rename_columns(|c| config.rename_hints.get(c).cloned());

    let mut seen = HashSet::new();
    for c in &incoming.columns {
        if !seen.insert(c.as_str()) {
            return Err(ImportError::DuplicateColumn {
                name: c.clone(),
                raw: config
                    .rename_hints
                    .iter()
                    .filter(|(_, to)| *to == c)
                    .map(|(from, _)| from.clone())
                    .chain(std::iter::once(c.clone()))
                    .collect(),
            });
        }
    }

    let fixed: Vec<&str> = config.fixed_columns.iter().map(|c| c.name.as_str()).collect();
    let projected = incoming.select_columns(&fixed);
    log::debug!(
        "fixed schema kept {} of {} columns",
        projected.column_count(),
        incoming.column_count()
    );
    Ok(projected)
}

fn new_table_columns(incoming: &DataSet, config: &ReconcileConfig) -> Vec<ColumnDescriptor> {
    if !config.use_fixed_schema {
        return infer_columns(incoming);
    }
    incoming
        .columns
        .iter()
        .filter_map(|name| config.fixed_columns.iter().find(|c| &c.name == name).cloned())
        .collect()
}

/// Restrict `incoming` to columns the destination has, in incoming order, spelled the way
/// the destination spells them.
fn append_subset(
    table: &TableName,
    incoming: &DataSet,
    destination: &[ColumnDescriptor],
) -> ImportResult<DataSet> {
    let matches: Vec<(&str, &str)> = incoming
        .columns
        .iter()
        .filter_map(|c| {
            destination
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(c))
                .map(|d| (c.as_str(), d.name.as_str()))
        })
        .collect();
    if matches.is_empty() {
        return Err(ImportError::NoMatchingColumns {
            table: table.to_string(),
            columns: incoming.columns.clone(),
        });
    }

    let keep: Vec<&str> = matches.iter().map(|(from, _)| *from).collect();
    let mut data = incoming.select_columns(&keep);
    data.rename_columns(|c| {
        matches
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, to)| to.to_string())
    });
    let dropped = incoming.column_count() - data.column_count();
    if dropped > 0 {
        log::info!(
            "appending to '{table}': {dropped} file column(s) not in the table were dropped"
        );
    }
    Ok(data)
}
