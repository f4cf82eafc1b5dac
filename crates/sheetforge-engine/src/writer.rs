//! Cell, range, and table writers
//!
//! Each writer applies one spec block to a worksheet. A failure (malformed
//! address, unusable value) aborts the current sheet and surfaces as a
//! processing error carrying the sheet name and the offending address;
//! style application is never a failure path.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;
use sheetforge_core::{CellAddress, CellValue, SheetTable, Worksheet};

use crate::error::{EngineError, Result};
use crate::spec::{
    AlignmentSpec, CellSpec, DataTypeTag, FontSpec, RangeSpec, StyleSpec, TableSpec,
};
use crate::style::{apply_data_type, apply_style_spec};

/// Day zero of the 1900 date system (serial 0 = 1899-12-30)
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).expect("valid epoch date")
}

/// Convert a JSON scalar into a cell value
fn json_to_cell_value(value: &Value) -> std::result::Result<CellValue, String> {
    match value {
        Value::Null => Ok(CellValue::Empty),
        Value::Bool(b) => Ok(CellValue::Boolean(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .ok_or_else(|| format!("number out of range: {}", n)),
        Value::String(s) => Ok(CellValue::String(s.clone())),
        Value::Array(_) | Value::Object(_) => Err("nested values are not writable".to_string()),
    }
}

/// Parse an ISO date/datetime/time string into an Excel serial number
fn temporal_to_serial(tag: DataTypeTag, s: &str) -> Option<f64> {
    match tag {
        DataTypeTag::Date => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
                .ok()?;
            Some((date - excel_epoch()).num_days() as f64)
        }
        DataTypeTag::Datetime => {
            let dt = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .ok()?;
            let days = (dt.date() - excel_epoch()).num_days() as f64;
            let fraction = dt.time().num_seconds_from_midnight() as f64 / 86_400.0;
            Some(days + fraction)
        }
        DataTypeTag::Time => {
            let time = NaiveTime::parse_from_str(s, "%H:%M:%S").ok()?;
            Some(time.num_seconds_from_midnight() as f64 / 86_400.0)
        }
        _ => None,
    }
}

/// Apply a single cell definition
pub fn write_cell(sheet: &mut Worksheet, spec: &CellSpec) -> Result<()> {
    let sheet_name = sheet.name().to_string();

    let addr = CellAddress::parse(&spec.address).map_err(|e| {
        EngineError::processing(&sheet_name, format!("cell '{}': {}", spec.address, e))
    })?;

    if let Some(formula) = &spec.formula {
        // The formula is opaque; the supplied result is what gets displayed
        let result = match &spec.result {
            Some(v) => Some(json_to_cell_value(v).map_err(|e| {
                EngineError::processing(&sheet_name, format!("cell '{}': {}", spec.address, e))
            })?),
            None => None,
        };
        sheet.set_cell_formula_at(addr.row, addr.col, formula, result)?;
    } else if let Some(value) = &spec.value {
        let cell_value = convert_value(value, spec.data_type).map_err(|e| {
            EngineError::processing(&sheet_name, format!("cell '{}': {}", spec.address, e))
        })?;
        sheet.set_cell_value_at(addr.row, addr.col, cell_value)?;
    }

    if let Some(style) = &spec.style {
        apply_style_spec(sheet, addr.row, addr.col, style);
    }

    if let Some(tag) = spec.data_type {
        apply_data_type(sheet, addr.row, addr.col, tag, spec.format.as_deref());
    } else if let Some(format) = &spec.format {
        apply_data_type(sheet, addr.row, addr.col, DataTypeTag::Text, Some(format));
    }

    Ok(())
}

/// Convert a literal value, turning ISO strings into date serials when a
/// temporal tag asks for it
fn convert_value(
    value: &Value,
    tag: Option<DataTypeTag>,
) -> std::result::Result<CellValue, String> {
    if let (Some(tag), Value::String(s)) = (tag, value) {
        if tag.is_temporal() {
            match temporal_to_serial(tag, s) {
                Some(serial) => return Ok(CellValue::Number(serial)),
                None => {
                    log::warn!("Value '{}' does not parse as {:?}; writing as text", s, tag);
                }
            }
        }
    }
    json_to_cell_value(value)
}

/// Apply a rectangular block of literal values
///
/// Only the start anchor of the range string matters; the data's own
/// dimensions bound the write.
pub fn write_range(sheet: &mut Worksheet, spec: &RangeSpec) -> Result<()> {
    let sheet_name = sheet.name().to_string();

    let start_str = spec.range.split(':').next().unwrap_or(&spec.range);
    let anchor = CellAddress::parse(start_str).map_err(|e| {
        EngineError::processing(&sheet_name, format!("range '{}': {}", spec.range, e))
    })?;

    for (row_index, row) in spec.values.iter().enumerate() {
        for (col_index, value) in row.iter().enumerate() {
            let addr = anchor
                .offset(row_index as u32, col_index as u16)
                .map_err(|e| {
                    EngineError::processing(&sheet_name, format!("range '{}': {}", spec.range, e))
                })?;

            let cell_value = json_to_cell_value(value).map_err(|e| {
                EngineError::processing(
                    &sheet_name,
                    format!("range '{}' at {}: {}", spec.range, addr, e),
                )
            })?;
            sheet.set_cell_value_at(addr.row, addr.col, cell_value)?;

            if let Some(style) = &spec.style {
                apply_style_spec(sheet, addr.row, addr.col, style);
            }
        }
    }

    Ok(())
}

/// The documented default header style: bold white on dark blue, centered
fn default_header_style() -> StyleSpec {
    StyleSpec {
        font: Some(FontSpec {
            bold: Some(true),
            color: Some("FFFFFF".to_string()),
            ..Default::default()
        }),
        fill: Some("1F4E78".to_string()),
        alignment: Some(AlignmentSpec {
            horizontal: Some("center".to_string()),
            ..Default::default()
        }),
        border: None,
        format: None,
    }
}

/// Apply a header+rows table
///
/// Headers come from the first row's key set in insertion order; later rows
/// are read positionally against that set, so extra keys are ignored and
/// missing keys render blank. Odd-indexed body rows get the alternate style
/// layered over the body style.
pub fn write_table(sheet: &mut Worksheet, spec: &TableSpec) -> Result<()> {
    let sheet_name = sheet.name().to_string();

    let start = spec.start.as_deref().unwrap_or("A1");
    let anchor = CellAddress::parse(start).map_err(|e| {
        EngineError::processing(&sheet_name, format!("table start '{}': {}", start, e))
    })?;

    if spec.rows.is_empty() {
        return Err(EngineError::processing(
            &sheet_name,
            format!("table at '{}' has no rows", start),
        ));
    }

    let headers: Vec<String> = spec.rows[0].keys().cloned().collect();
    if headers.is_empty() {
        return Err(EngineError::processing(
            &sheet_name,
            format!("table at '{}': first row has no keys", start),
        ));
    }

    let table_style = spec.style.clone().unwrap_or_default();
    let header_style = table_style.header.unwrap_or_else(default_header_style);
    let body_style = table_style.body;
    let alt_style = table_style.alt_rows;

    // Header row
    for (col_index, header) in headers.iter().enumerate() {
        let addr = anchor.offset(0, col_index as u16).map_err(|e| {
            EngineError::processing(&sheet_name, format!("table at '{}': {}", start, e))
        })?;
        sheet.set_cell_value_at(addr.row, addr.col, CellValue::String(header.clone()))?;
        apply_style_spec(sheet, addr.row, addr.col, &header_style);
    }

    // Body rows
    for (row_index, row) in spec.rows.iter().enumerate() {
        let effective_style = match (&body_style, &alt_style) {
            (Some(body), Some(alt)) if row_index % 2 == 1 => Some(body.merged_with(alt)),
            (Some(body), _) => Some(body.clone()),
            (None, Some(alt)) if row_index % 2 == 1 => Some(alt.clone()),
            _ => None,
        };

        for (col_index, header) in headers.iter().enumerate() {
            let addr = anchor
                .offset(row_index as u32 + 1, col_index as u16)
                .map_err(|e| {
                    EngineError::processing(&sheet_name, format!("table at '{}': {}", start, e))
                })?;

            // Keys absent in this row render blank
            let cell_value = match row.get(header) {
                Some(v) => json_to_cell_value(v).map_err(|e| {
                    EngineError::processing(
                        &sheet_name,
                        format!("table at '{}', column '{}': {}", start, header, e),
                    )
                })?,
                None => CellValue::Empty,
            };
            sheet.set_cell_value_at(addr.row, addr.col, cell_value)?;

            if let Some(style) = &effective_style {
                apply_style_spec(sheet, addr.row, addr.col, style);
            }
        }
    }

    // Named table registration is independent of the styling pass
    if let Some(name) = &spec.name {
        let end = anchor
            .offset(spec.rows.len() as u32, (headers.len() - 1) as u16)
            .map_err(|e| {
                EngineError::processing(&sheet_name, format!("table '{}': {}", name, e))
            })?;
        let range = sheetforge_core::CellRange::new(anchor, end);

        let table = SheetTable::new(name.clone(), range, headers).map_err(|e| {
            EngineError::processing(&sheet_name, format!("table '{}': {}", name, e))
        })?;
        sheet.add_table(table).map_err(|e| {
            EngineError::processing(&sheet_name, format!("table '{}': {}", name, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetforge_core::style::{FillStyle, HorizontalAlignment};

    fn table_spec(json: &str) -> TableSpec {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_write_cell_literal_and_formula() {
        let mut ws = Worksheet::new("T");

        let cell: CellSpec =
            serde_json::from_str(r#"{"address": "B2", "value": 41.5}"#).unwrap();
        write_cell(&mut ws, &cell).unwrap();
        assert_eq!(ws.get_value("B2").unwrap().as_number(), Some(41.5));

        let cell: CellSpec = serde_json::from_str(
            r#"{"address": "B3", "formula": "=B2*2", "result": 83}"#,
        )
        .unwrap();
        write_cell(&mut ws, &cell).unwrap();
        let value = ws.get_value("B3").unwrap();
        assert_eq!(value.formula_text(), Some("=B2*2"));
        assert_eq!(value.as_number(), Some(83.0));
    }

    #[test]
    fn test_write_cell_bad_address_names_offender() {
        let mut ws = Worksheet::new("Report");
        let cell: CellSpec =
            serde_json::from_str(r#"{"address": "not-an-address", "value": 1}"#).unwrap();

        let err = write_cell(&mut ws, &cell).unwrap_err();
        match err {
            EngineError::Processing { sheet, detail } => {
                assert_eq!(sheet, "Report");
                assert!(detail.contains("not-an-address"));
            }
            other => panic!("expected processing error, got {:?}", other),
        }
    }

    #[test]
    fn test_date_values_become_serials() {
        let mut ws = Worksheet::new("T");
        let cell: CellSpec = serde_json::from_str(
            r#"{"address": "A1", "value": "2024-01-15", "dataType": "date"}"#,
        )
        .unwrap();
        write_cell(&mut ws, &cell).unwrap();

        // 2024-01-15 is serial 45306 in the 1900 date system
        assert_eq!(ws.get_value("A1").unwrap().as_number(), Some(45306.0));
    }

    #[test]
    fn test_unparseable_date_stays_text() {
        let mut ws = Worksheet::new("T");
        let cell: CellSpec = serde_json::from_str(
            r#"{"address": "A1", "value": "next tuesday", "dataType": "date"}"#,
        )
        .unwrap();
        write_cell(&mut ws, &cell).unwrap();
        assert_eq!(
            ws.get_value("A1").unwrap().as_string(),
            Some("next tuesday")
        );
    }

    #[test]
    fn test_range_write_ignores_end_anchor() {
        let mut ws = Worksheet::new("T");
        let range: RangeSpec = serde_json::from_str(
            // End anchor Z99 does not bound anything
            r#"{"range": "A3:Z99", "values": [["Product", "Qty"], ["Widget", 5]]}"#,
        )
        .unwrap();
        write_range(&mut ws, &range).unwrap();

        assert_eq!(ws.get_value("A3").unwrap().as_string(), Some("Product"));
        assert_eq!(ws.get_value("B3").unwrap().as_string(), Some("Qty"));
        assert_eq!(ws.get_value("A4").unwrap().as_string(), Some("Widget"));
        assert_eq!(ws.get_value("B4").unwrap().as_number(), Some(5.0));
        assert!(ws.get_value("C3").unwrap().is_empty());
    }

    #[test]
    fn test_table_layout_and_default_header_style() {
        let mut ws = Worksheet::new("T");
        let spec = table_spec(
            r#"{"start": "B2", "rows": [
                {"Product": "A", "Q1": 100},
                {"Product": "B", "Q1": 200}
            ]}"#,
        );
        write_table(&mut ws, &spec).unwrap();

        // 1 header + 2 body rows at the anchor
        assert_eq!(ws.get_value("B2").unwrap().as_string(), Some("Product"));
        assert_eq!(ws.get_value("C2").unwrap().as_string(), Some("Q1"));
        assert_eq!(ws.get_value("B3").unwrap().as_string(), Some("A"));
        assert_eq!(ws.get_value("C4").unwrap().as_number(), Some(200.0));

        // Default header styling: bold white on dark blue, centered
        let header_style = ws.cell_style("B2").unwrap().unwrap();
        assert!(header_style.font.bold);
        assert_eq!(
            header_style.fill,
            FillStyle::solid(normalize("1F4E78"))
        );
        assert_eq!(
            header_style.alignment.horizontal,
            HorizontalAlignment::Center
        );
    }

    fn normalize(hex: &str) -> sheetforge_core::Color {
        crate::style::normalize_color(hex).unwrap()
    }

    #[test]
    fn test_table_alt_style_layers_over_body() {
        let mut ws = Worksheet::new("T");
        let spec = table_spec(
            r#"{"start": "A1",
                "rows": [
                    {"Product": "A"}, {"Product": "B"}, {"Product": "C"}
                ],
                "style": {
                    "body": {"fill": "EEEEEE", "font": {"size": 10}},
                    "altRows": {"fill": "CCCCCC"}
                }}"#,
        );
        write_table(&mut ws, &spec).unwrap();

        // Row index 0 (A2): body only
        let body = ws.cell_style("A2").unwrap().unwrap();
        assert_eq!(body.fill, FillStyle::solid(normalize("EEEEEE")));
        assert_eq!(body.font.size, 10.0);

        // Row index 1 (A3): alternate fill layered over, body font kept
        let alt = ws.cell_style("A3").unwrap().unwrap();
        assert_eq!(alt.fill, FillStyle::solid(normalize("CCCCCC")));
        assert_eq!(alt.font.size, 10.0);

        // Row index 2 (A4): back to body
        let body2 = ws.cell_style("A4").unwrap().unwrap();
        assert_eq!(body2.fill, FillStyle::solid(normalize("EEEEEE")));
    }

    #[test]
    fn test_table_heterogeneous_rows_follow_first_row_keys() {
        let mut ws = Worksheet::new("T");
        let spec = table_spec(
            r#"{"rows": [
                {"a": 1, "b": 2},
                {"a": 3, "extra": 99},
                {"b": 4}
            ]}"#,
        );
        write_table(&mut ws, &spec).unwrap();

        // Columns come from the first row only
        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("a"));
        assert_eq!(ws.get_value("B1").unwrap().as_string(), Some("b"));

        // "extra" is dropped; missing keys render blank
        assert_eq!(ws.get_value("A3").unwrap().as_number(), Some(3.0));
        assert!(ws.get_value("B3").unwrap().is_empty());
        assert!(ws.get_value("A4").unwrap().is_empty());
        assert_eq!(ws.get_value("B4").unwrap().as_number(), Some(4.0));
    }

    #[test]
    fn test_named_table_registration() {
        let mut ws = Worksheet::new("T");
        let spec = table_spec(
            r#"{"name": "Sales", "start": "B2", "rows": [
                {"Product": "A", "Q1": 1}, {"Product": "B", "Q1": 2}
            ]}"#,
        );
        write_table(&mut ws, &spec).unwrap();

        let tables = ws.tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name(), "Sales");
        assert_eq!(tables[0].range.to_a1_string(), "B2:C4");
        assert_eq!(tables[0].columns, ["Product", "Q1"]);
    }

    #[test]
    fn test_wide_table_lays_out_past_column_z() {
        // 30 columns from anchor "Y1": the tail lands in two-letter columns
        let mut row = serde_json::Map::new();
        for i in 0..30 {
            row.insert(format!("col{:02}", i), Value::from(i));
        }
        let spec = TableSpec {
            name: None,
            start: Some("Y1".to_string()),
            rows: vec![row],
            style: None,
        };

        let mut ws = Worksheet::new("T");
        write_table(&mut ws, &spec).unwrap();

        assert_eq!(ws.get_value("Y1").unwrap().as_string(), Some("col00"));
        // Offset 2 from Y crosses into AA
        assert_eq!(ws.get_value("AA1").unwrap().as_string(), Some("col02"));
        assert_eq!(ws.get_value("AB2").unwrap().as_number(), Some(3.0));
    }
}
