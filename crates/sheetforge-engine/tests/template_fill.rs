//! End-to-end template tests (write template -> load -> fill -> read back)

use pretty_assertions::assert_eq;
use serde_json::{Map, Value};
use sheetforge_core::{Style, Workbook};
use sheetforge_engine::spec::WorkbookSpec;
use sheetforge_engine::template::fill_to_buffer;
use sheetforge_engine::{compose, TemplateStore};
use sheetforge_xlsx::{XlsxReader, XlsxWriter};
use std::io::Cursor;

fn data(json: &str) -> Map<String, Value> {
    match serde_json::from_str(json).unwrap() {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

/// Build an invoice-shaped template workbook on disk and return its store
fn invoice_store(dir: &std::path::Path) -> TemplateStore {
    let mut wb = Workbook::empty();
    wb.add_worksheet_with_name("Invoice").unwrap();
    let ws = wb.worksheet_mut(0).unwrap();

    ws.set_cell_value("A1", "Invoice for {{customer}}").unwrap();
    ws.set_cell_style("A1", &Style::new().bold(true)).unwrap();
    ws.set_cell_value("A3", "{{#lines}}{{item}}").unwrap();
    ws.set_cell_value("B3", "{{price}}").unwrap();
    ws.set_cell_value("A5", "Total: {{total}}").unwrap();

    XlsxWriter::write_file(&wb, dir.join("invoice.xlsx")).unwrap();
    TemplateStore::new(dir)
}

#[test]
fn test_fill_scalar_and_array_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let store = invoice_store(dir.path());

    let template = store.load("invoice").unwrap();
    let (buffer, stats) = fill_to_buffer(template, &template_data()).unwrap();

    let wb = XlsxReader::read(Cursor::new(buffer)).unwrap();
    let sheet = wb.worksheet_by_name("Invoice").unwrap();

    assert_eq!(
        sheet.get_value("A1").unwrap().as_string(),
        Some("Invoice for ACME Corp")
    );
    // Bold survives the fill
    assert!(sheet.cell_style("A1").unwrap().unwrap().font.bold);

    // Three line items: the template row plus two inserted rows
    assert_eq!(sheet.get_value("A3").unwrap().as_string(), Some("Keyboard"));
    assert_eq!(sheet.get_value("B3").unwrap().as_string(), Some("49.5"));
    assert_eq!(sheet.get_value("A4").unwrap().as_string(), Some("Mouse"));
    assert_eq!(sheet.get_value("A5").unwrap().as_string(), Some("Monitor"));

    // The total row shifted down by the two inserted rows
    assert_eq!(
        sheet.get_value("A7").unwrap().as_string(),
        Some("Total: 348.5")
    );

    assert_eq!(stats.rows_inserted, 2);
}

fn template_data() -> Map<String, Value> {
    data(
        r#"{
            "customer": "ACME Corp",
            "total": 348.5,
            "lines": [
                {"item": "Keyboard", "price": 49.5},
                {"item": "Mouse", "price": 19},
                {"item": "Monitor", "price": 280}
            ]
        }"#,
    )
}

#[test]
fn test_compose_seeded_from_template() {
    let dir = tempfile::tempdir().unwrap();
    let store = invoice_store(dir.path());

    // The sheet name matches the template's sheet, so the composer mutates
    // it in place instead of creating "Invoice (2)"-style duplicates
    let spec: WorkbookSpec = serde_json::from_str(
        r#"{
            "template": "invoice.xlsx",
            "sheets": [{
                "name": "Invoice",
                "cells": [{"address": "D1", "value": "stamped"}]
            }]
        }"#,
    )
    .unwrap();

    let out = compose(&spec, Some(&store)).unwrap();
    assert_eq!(out.sheets_processed, 1);

    let wb = XlsxReader::read(Cursor::new(out.buffer)).unwrap();
    assert_eq!(wb.sheet_count(), 1);
    let sheet = wb.worksheet_by_name("Invoice").unwrap();

    // Template content and composed content coexist
    assert_eq!(
        sheet.get_value("A1").unwrap().as_string(),
        Some("Invoice for {{customer}}")
    );
    assert_eq!(sheet.get_value("D1").unwrap().as_string(), Some("stamped"));
}
