use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use sql_importer::execution::{
    preview, CompositeObserver, FileObserver, ImportContext, ImportObserver, ImportOptions,
    ImportSeverity, ImportStats, Importer, RowFailure, ScriptedDecisions,
};
use sql_importer::reconcile::{ColumnMapping, ExistingTableAction, PlanKind};
use sql_importer::store::{MemoryStore, StoreCall};
use sql_importer::types::{CatalogType, ColumnDescriptor, ColumnType, StorageType, Value};
use sql_importer::ImportError;

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sql-importer-{name}-{nanos}.{ext}"))
}

fn text(s: &str) -> Value {
    Value::Utf8(s.to_string())
}

fn orders_table() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor::catalog("order_id", CatalogType::new("bigint")),
        ColumnDescriptor::catalog("amount", CatalogType::new("float")),
        ColumnDescriptor::catalog("customer", CatalogType::with_length("nvarchar", 50)),
    ]
}

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<ImportStats>>,
    failures: Mutex<Vec<ImportSeverity>>,
    alerts: Mutex<Vec<ImportSeverity>>,
    rows: Mutex<Vec<usize>>,
}

impl ImportObserver for RecordingObserver {
    fn on_success(&self, _ctx: &ImportContext, stats: ImportStats) {
        self.successes.lock().unwrap().push(stats);
    }

    fn on_failure(&self, _ctx: &ImportContext, severity: ImportSeverity, _error: &ImportError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &ImportContext, severity: ImportSeverity, _error: &ImportError) {
        self.alerts.lock().unwrap().push(severity);
    }

    fn on_row_failure(&self, _ctx: &ImportContext, failure: &RowFailure) {
        self.rows.lock().unwrap().push(failure.row_index);
    }
}

#[test]
fn new_table_is_created_from_normalized_headers() {
    let mut store = MemoryStore::new();
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Abort);
    let summary = Importer::default()
        .run("tests/fixtures/contacts.csv", "contacts", &mut store, &mut decisions)
        .unwrap();

    assert_eq!(summary.plan, PlanKind::Create);
    assert!(summary.created);
    assert!(!summary.dropped);
    assert_eq!(summary.rows_read, 3);
    assert_eq!(summary.rows_inserted, 3);
    assert_eq!(decisions.asked(), 0);

    let table = store.table("contacts").unwrap();
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["full_name", "email", "phone", "signup_date", "visits"]);
    let types: Vec<&ColumnType> = table.columns.iter().map(|c| &c.column_type).collect();
    assert_eq!(
        types,
        vec![
            &ColumnType::Inferred(StorageType::VariableText),
            &ColumnType::Inferred(StorageType::VariableText),
            &ColumnType::Inferred(StorageType::VariableText),
            &ColumnType::Inferred(StorageType::Timestamp),
            &ColumnType::Inferred(StorageType::Integer64),
        ]
    );

    let rows = store.rows("contacts");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][2], text("555-0100"));
    assert_eq!(rows[1][2], Value::Null);
    assert_eq!(rows[2][0], text("Linus Torvalds"));
    assert_eq!(rows[2][4], Value::Null);
}

#[test]
fn invalid_table_name_touches_nothing() {
    let mut store = MemoryStore::new();
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Recreate);
    let err = Importer::default()
        .run("tests/fixtures/contacts.csv", "bad name;", &mut store, &mut decisions)
        .unwrap_err();

    assert!(matches!(err, ImportError::InvalidIdentifier { .. }));
    assert!(store.calls().is_empty());
}

#[test]
fn unsupported_format_never_connects() {
    let mut connected = false;
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Append);
    let err = Importer::default()
        .run_with(
            "tests/fixtures/contacts.json",
            "contacts",
            || {
                connected = true;
                Ok(MemoryStore::new())
            },
            &mut decisions,
        )
        .unwrap_err();

    assert!(matches!(err, ImportError::UnsupportedFormat { .. }));
    assert!(!connected);
}

#[test]
fn append_keeps_only_shared_columns() {
    let mut store = MemoryStore::new().with_table(
        "contacts",
        vec![
            ColumnDescriptor::catalog("full_name", CatalogType::with_length("nvarchar", 100)),
            ColumnDescriptor::catalog("city", CatalogType::with_length("nvarchar", 100)),
        ],
    );
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Append);
    let summary = Importer::default()
        .run("tests/fixtures/contacts.csv", "contacts", &mut store, &mut decisions)
        .unwrap();

    assert_eq!(summary.plan, PlanKind::Append);
    assert!(!summary.created);
    assert!(!store.calls().iter().any(|c| matches!(c, StoreCall::Ddl(_))));
    assert_eq!(
        store.rows("contacts")[0],
        vec![text("Ada Lovelace"), Value::Null]
    );
}

#[test]
fn recreate_drops_then_creates() {
    let mut store = MemoryStore::new().with_table(
        "contacts",
        vec![ColumnDescriptor::catalog("legacy", CatalogType::new("int"))],
    );
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Recreate);
    let summary = Importer::default()
        .run("tests/fixtures/contacts.csv", "contacts", &mut store, &mut decisions)
        .unwrap();

    assert!(summary.dropped && summary.created);
    let ddl: Vec<&str> = store
        .calls()
        .iter()
        .filter_map(|c| match c {
            StoreCall::Ddl(sql) => Some(sql.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(ddl.len(), 2);
    assert_eq!(ddl[0], "DROP TABLE [contacts]");
    assert!(ddl[1].starts_with("CREATE TABLE [contacts]"));
    assert_eq!(store.table("contacts").unwrap().columns.len(), 5);
    assert_eq!(store.rows("contacts").len(), 3);
}

#[test]
fn failed_create_after_drop_leaves_no_table() {
    let mut store = MemoryStore::new()
        .with_table(
            "contacts",
            vec![ColumnDescriptor::catalog("legacy", CatalogType::new("int"))],
        )
        .fail_creates();
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Recreate);
    let err = Importer::default()
        .run("tests/fixtures/contacts.csv", "contacts", &mut store, &mut decisions)
        .unwrap_err();

    assert!(matches!(err, ImportError::Store { .. }));
    assert!(store.table("contacts").is_none());
}

#[test]
fn remap_renames_and_skips() {
    let mut store = MemoryStore::new().with_table(
        "people",
        vec![
            ColumnDescriptor::catalog("name", CatalogType::with_length("nvarchar", 100)),
            ColumnDescriptor::catalog("tel", CatalogType::with_length("nvarchar", 20)),
        ],
    );
    let mapping = ColumnMapping::new()
        .map("full_name", "name")
        .map("phone", "tel")
        .skip("email");
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Remap).with_mapping(mapping);
    let summary = Importer::default()
        .run("tests/fixtures/contacts.csv", "people", &mut store, &mut decisions)
        .unwrap();

    assert_eq!(summary.plan, PlanKind::Remap);
    assert_eq!(decisions.asked(), 2);
    assert_eq!(
        store.rows("people")[0],
        vec![text("Ada Lovelace"), text("555-0100")]
    );
}

#[test]
fn cancelled_mapping_aborts_without_mutation() {
    let obs = Arc::new(RecordingObserver::default());
    let importer = Importer::new(ImportOptions {
        observer: Some(obs.clone()),
        alert_at_or_above: ImportSeverity::Error,
        ..Default::default()
    });
    let mut store = MemoryStore::new().with_table("contacts", orders_table());
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Remap);

    let err = importer
        .run("tests/fixtures/contacts.csv", "contacts", &mut store, &mut decisions)
        .unwrap_err();

    assert!(matches!(err, ImportError::SchemaDecisionAborted { .. }));
    assert!(!store.has_mutations());
    assert_eq!(*obs.failures.lock().unwrap(), vec![ImportSeverity::Warning]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn bad_row_is_reported_while_the_rest_commit() {
    let obs = Arc::new(RecordingObserver::default());
    let importer = Importer::new(ImportOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    });
    let mut store = MemoryStore::new().with_table("orders", orders_table());
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Append);

    let err = importer
        .run("tests/fixtures/orders.csv", "orders", &mut store, &mut decisions)
        .unwrap_err();

    let ImportError::BatchInsertFailure { table, report, .. } = &err else {
        panic!("expected BatchInsertFailure, got {err:?}");
    };
    assert_eq!(table, "orders");
    assert_eq!(report.attempted, 4);
    assert_eq!(report.inserted, 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row_index, 1);
    assert_eq!(report.failures[0].values[1], text("oops"));

    let committed: Vec<&Value> = store.rows("orders").iter().map(|r| &r[0]).collect();
    assert_eq!(committed, vec![&text("1"), &text("3"), &text("4")]);

    assert_eq!(*obs.rows.lock().unwrap(), vec![1]);
    assert_eq!(*obs.failures.lock().unwrap(), vec![ImportSeverity::Error]);
    assert!(obs.successes.lock().unwrap().is_empty());
}

#[test]
fn observer_sees_success_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let importer = Importer::new(ImportOptions {
        observer: Some(obs.clone()),
        ..Default::default()
    });
    let mut store = MemoryStore::new();
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Abort);
    importer
        .run("tests/fixtures/orders.csv", "orders", &mut store, &mut decisions)
        .unwrap();

    assert_eq!(
        *obs.successes.lock().unwrap(),
        vec![ImportStats {
            plan: PlanKind::Create,
            rows_read: 4,
            rows_inserted: 4,
        }]
    );
}

#[test]
fn missing_file_alerts_as_critical() {
    let obs = Arc::new(RecordingObserver::default());
    let log_path = tmp_file("observer", "log");
    let composite = CompositeObserver::new(vec![
        obs.clone(),
        Arc::new(FileObserver::new(&log_path)),
    ]);
    let importer = Importer::new(ImportOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    });
    let mut store = MemoryStore::new();
    let mut decisions = ScriptedDecisions::new(ExistingTableAction::Abort);

    let err = importer
        .run("tests/fixtures/does_not_exist.tsv", "t", &mut store, &mut decisions)
        .unwrap_err();
    assert!(matches!(err, ImportError::Csv(_)));
    assert_eq!(*obs.failures.lock().unwrap(), vec![ImportSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![ImportSeverity::Critical]);

    let logged = std::fs::read_to_string(&log_path).unwrap();
    assert!(logged.contains("fail severity=Critical table=t"));
    assert!(logged.contains("ALERT severity=Critical table=t"));
    let _ = std::fs::remove_file(&log_path);
}

#[test]
fn preview_reads_a_prepared_head() {
    let ds = preview("tests/fixtures/contacts.csv", 2, &ImportOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.columns[1], "email");
    assert_eq!(ds.rows[1][2], Value::Null);
}
