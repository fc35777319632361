//! End-to-end export runs against in-memory workbooks.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use xl2json_core::memory::{MemorySheet, MemoryWorkbook};
use xl2json_core::{export_workbook, CellValue, ExportOptions, SkipReason};

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Header row plus four data rows over A1:D5.
fn inventory(name: &str, offset: i32) -> MemorySheet {
    let mut sheet = MemorySheet::new(name);
    sheet.set_row("A1", ["sku", "item", "site", "qty"]).unwrap();
    for i in 0..4 {
        let row = i + 2;
        sheet
            .set_row(
                &format!("A{row}"),
                [
                    CellValue::from(format!("S-{}", offset + i)),
                    "bolt".into(),
                    "page".into(),
                    CellValue::Number(f64::from(offset + i)),
                ],
            )
            .unwrap();
    }
    sheet
}

#[test]
fn test_two_sheet_export() {
    let dest = tempfile::tempdir().unwrap();
    let mut book = MemoryWorkbook::new();
    book.push(inventory("倉庫A", 0));
    book.push(inventory("倉庫B", 10));

    let report = export_workbook(&book, &ExportOptions::default(), dest.path()).unwrap();
    assert!(report.skipped.is_empty());

    for n in 1..=2 {
        let rows = read_json(&dest.path().join(format!("sheet{n}.json")));
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.as_array().unwrap().len() == 4));
    }
    assert_eq!(
        read_json(&dest.path().join("sheet2.json"))[0],
        json!(["S-10", "bolt", "page", 10.0])
    );

    assert_eq!(
        read_json(&dest.path().join("columns.json")),
        json!(["sku", "item", "site", "qty"])
    );

    let sheet1 = dest.path().join("sheet1.json").display().to_string();
    let sheet2 = dest.path().join("sheet2.json").display().to_string();
    assert_eq!(
        read_json(&dest.path().join("index.json")),
        json!({ "倉庫A": sheet1, "倉庫B": sheet2 })
    );

    // Non-ASCII text is written as-is rather than escaped.
    let raw = fs::read_to_string(dest.path().join("index.json")).unwrap();
    assert!(raw.contains("倉庫A"));
    assert!(raw.starts_with("{\n    \""));
}

#[test]
fn test_skipped_sheets_do_not_consume_numbers() {
    let dest = tempfile::tempdir().unwrap();
    let mut book = MemoryWorkbook::new();
    book.push(inventory("First", 0));
    book.push(MemorySheet::new("Blank"));
    let mut header_only = MemorySheet::new("HeaderOnly");
    header_only.set_row("A1", ["sku", "item", "site", "qty"]).unwrap();
    book.push(header_only);
    book.push(inventory("Last", 20));

    let report = export_workbook(&book, &ExportOptions::default(), dest.path()).unwrap();

    assert_eq!(
        report.skipped,
        vec![
            ("Blank".to_string(), SkipReason::EmptyOriginCell),
            ("HeaderOnly".to_string(), SkipReason::EmptyDataRegion),
        ]
    );
    assert_eq!(report.index.len(), 2);
    assert_eq!(
        report.index.get("Last"),
        Some(dest.path().join("sheet2.json").as_path())
    );
    assert!(!dest.path().join("sheet3.json").exists());
    assert_eq!(read_json(&dest.path().join("sheet2.json"))[0][0], json!("S-20"));
}

#[test]
fn test_url_column() {
    let dest = tempfile::tempdir().unwrap();
    let mut sheet = inventory("Links", 0);
    sheet.add_hyperlink("C2", "https://example.com/s-0").unwrap();
    sheet.add_hyperlink("C4", "https://example.com/s-2").unwrap();
    let mut book = MemoryWorkbook::new();
    book.push(sheet);

    let options = ExportOptions {
        url: Some("C".into()),
        ..Default::default()
    };
    let report = export_workbook(&book, &options, dest.path()).unwrap();

    let headers = report.params.headers.unwrap();
    assert_eq!(headers.len(), 5);
    assert_eq!(headers[4], "URL");

    let rows = read_json(&dest.path().join("sheet1.json"));
    let urls: Vec<Value> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| {
            assert_eq!(row.as_array().unwrap().len(), 5);
            row[4].clone()
        })
        .collect();
    assert_eq!(
        urls,
        vec![
            json!("https://example.com/s-0"),
            Value::Null,
            json!("https://example.com/s-2"),
            Value::Null,
        ]
    );
}

#[test]
fn test_no_header_run() {
    let dest = tempfile::tempdir().unwrap();
    let mut book = MemoryWorkbook::new();
    book.push(inventory("Only", 0));

    let options = ExportOptions {
        has_header: false,
        columns: Some("B:C".into()),
        ..Default::default()
    };
    let report = export_workbook(&book, &options, dest.path()).unwrap();
    assert_eq!(report.params.row_begin, 1);

    let rows = read_json(&dest.path().join("sheet1.json"));
    assert_eq!(rows.as_array().unwrap().len(), 5);
    assert_eq!(rows[0], json!(["item", "site"]));
    assert!(!dest.path().join("columns.json").exists());
    assert!(dest.path().join("index.json").exists());
}

#[test]
fn test_malformed_origin_aborts() {
    let dest = tempfile::tempdir().unwrap();
    let mut book = MemoryWorkbook::new();
    book.push(inventory("Only", 0));

    let options = ExportOptions {
        origin: "A1:B2".into(),
        ..Default::default()
    };
    let err = export_workbook(&book, &options, dest.path()).unwrap_err();
    assert!(matches!(err, xl2json_core::Error::MalformedAddress(_)));
    assert!(!dest.path().join("index.json").exists());
}

#[test]
fn test_empty_workbook_is_an_error() {
    let dest = tempfile::tempdir().unwrap();
    let err = export_workbook(&MemoryWorkbook::new(), &ExportOptions::default(), dest.path())
        .unwrap_err();
    assert!(matches!(err, xl2json_core::Error::Source(_)));
}
