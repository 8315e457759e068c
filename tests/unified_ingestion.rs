use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "excel_test_writer")]
use sql_importer::ingestion::ExcelSheetSelection;
use sql_importer::ingestion::{read_file, IngestionFormat, IngestionOptions};
use sql_importer::types::Value;
use sql_importer::ImportError;

fn tmp_file(ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sql-importer-unified-{nanos}.{ext}"))
}

#[test]
fn format_from_extension() {
    assert_eq!(IngestionFormat::from_extension("CSV"), Some(IngestionFormat::Csv));
    assert_eq!(IngestionFormat::from_extension("tsv"), Some(IngestionFormat::Tsv));
    for ext in ["xlsx", "xls", "xlsm", "xlsb", "ods"] {
        assert_eq!(IngestionFormat::from_extension(ext), Some(IngestionFormat::Excel));
    }
    assert_eq!(IngestionFormat::from_extension("json"), None);
}

#[test]
fn read_file_autodetects_csv_and_tsv() {
    let csv = read_file("tests/fixtures/contacts.csv", &IngestionOptions::default()).unwrap();
    let tsv = read_file("tests/fixtures/contacts.tsv", &IngestionOptions::default()).unwrap();

    assert_eq!(csv.columns, tsv.columns);
    assert_eq!(csv.rows[..2], tsv.rows[..]);
}

#[test]
fn read_file_rejects_unknown_extension_before_opening() {
    // The file does not exist: the extension check must fail first.
    let err =
        read_file("tests/fixtures/missing.parquet", &IngestionOptions::default()).unwrap_err();
    match err {
        ImportError::UnsupportedFormat { extension, .. } => assert_eq!(extension, "parquet"),
        other => panic!("expected UnsupportedFormat, got {other:?}"),
    }
}

#[test]
fn read_file_forced_format_ignores_extension() {
    let path = tmp_file("txt");
    std::fs::write(&path, "a;b\n1;2\n").unwrap();

    let err = read_file(&path, &IngestionOptions::default()).unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat { .. }));

    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        max_rows: Some(10),
        ..Default::default()
    };
    let ds = read_file(&path, &opts).unwrap();
    assert_eq!(ds.columns, vec!["a;b"]);
    assert_eq!(ds.rows, vec![vec![Value::Utf8("1;2".to_string())]]);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn read_file_missing_csv_is_io_error() {
    let err = read_file("tests/fixtures/does_not_exist.csv", &IngestionOptions::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::Csv(_) | ImportError::Io(_)));
}

#[cfg(feature = "excel_test_writer")]
#[test]
fn read_file_excel_sheet_selection() {
    use rust_xlsxwriter::Workbook;

    let path = tmp_file("xlsx");
    let mut wb = Workbook::new();
    let ws1 = wb.add_worksheet();
    ws1.set_name("First").unwrap();
    ws1.write_string(0, 0, "id").unwrap();
    ws1.write_number(1, 0, 1).unwrap();
    let ws2 = wb.add_worksheet();
    ws2.set_name("Second").unwrap();
    ws2.write_string(0, 0, "id").unwrap();
    ws2.write_number(1, 0, 2).unwrap();
    ws2.write_number(2, 0, 3).unwrap();
    wb.save(&path).unwrap();

    let first = read_file(&path, &IngestionOptions::default()).unwrap();
    assert_eq!(first.rows, vec![vec![Value::Int64(1)]]);

    let second = read_file(
        &path,
        &IngestionOptions {
            excel_sheet_selection: ExcelSheetSelection::Sheet("Second".to_string()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(second.row_count(), 2);

    let all = read_file(
        &path,
        &IngestionOptions {
            excel_sheet_selection: ExcelSheetSelection::AllSheets,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(all.row_count(), 3);

    let listed = read_file(
        &path,
        &IngestionOptions {
            excel_sheet_selection: ExcelSheetSelection::Sheets(vec![
                "Second".to_string(),
                "First".to_string(),
            ]),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(listed.rows[2], vec![Value::Int64(1)]);

    let _ = std::fs::remove_file(&path);
}
