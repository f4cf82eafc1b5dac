//! Template filling
//!
//! Walks every cell of every sheet in a loaded template and substitutes
//! placeholders from a flat data mapping:
//!
//! - `{{key}}` is replaced by the string form of `data[key]` when present;
//!   unknown keys stay as literal text.
//! - `{{#key}}` marks a repeating row. When `data[key]` is an array, the
//!   row becomes a template for one element: each element after the first
//!   gets a freshly inserted row below, and every element's row has the
//!   marker stripped and its `{{field}}` placeholders filled from that
//!   element.
//!
//! Within a row, the first array marker found in a left-to-right cell scan
//! wins; any other array marker in the same row is left as literal text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use sheetforge_core::{CellValue, Workbook};
use sheetforge_xlsx::XlsxWriter;

use crate::error::Result;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{#(\w+)\}\}").expect("valid marker pattern"));
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("valid placeholder pattern"));

/// Counters for the caller's logging
#[derive(Debug, Default, Clone, Copy)]
pub struct FillStats {
    /// Cells rewritten by substitution or expansion
    pub cells_substituted: usize,
    /// Rows inserted by array expansion
    pub rows_inserted: usize,
}

/// Fill a loaded template in place
pub fn fill_template(workbook: &mut Workbook, data: &Map<String, Value>) -> Result<FillStats> {
    let mut stats = FillStats::default();

    for sheet in workbook.worksheets_mut() {
        fill_sheet(sheet, data, &mut stats)?;
    }

    Ok(stats)
}

/// Fill a loaded template and serialize the result
pub fn fill_to_buffer(
    mut workbook: Workbook,
    data: &Map<String, Value>,
) -> Result<(Vec<u8>, FillStats)> {
    let stats = fill_template(&mut workbook, data)?;
    let buffer = XlsxWriter::write_to_buffer(&workbook)?;
    Ok((buffer, stats))
}

fn fill_sheet(
    sheet: &mut sheetforge_core::Worksheet,
    data: &Map<String, Value>,
    stats: &mut FillStats,
) -> Result<()> {
    // Row indices captured before any insertion; the running offset
    // accounts for rows added below earlier template rows.
    let original_rows: Vec<u32> = {
        let mut rows: Vec<u32> = sheet.iter_cells().map(|(row, _, _)| row).collect();
        rows.dedup();
        rows
    };

    let mut offset: u32 = 0;

    for original_row in original_rows {
        let row = original_row + offset;

        // Snapshot the row's cells; expansion rewrites them per element
        let cells: Vec<(u16, CellValue, u32)> = sheet
            .iter_cells()
            .filter(|(r, _, _)| *r == row)
            .map(|(_, col, cell)| (col, cell.value.clone(), cell.style_index))
            .collect();

        // Left-to-right scan for the first marker bound to an array
        let binding = cells.iter().find_map(|(_, value, _)| {
            let text = value.as_string()?;
            MARKER_RE.captures_iter(text).find_map(|caps| {
                let key = caps.get(1)?.as_str();
                match data.get(key) {
                    Some(Value::Array(items)) => Some((key.to_string(), items.clone())),
                    _ => None,
                }
            })
        });

        match binding {
            Some((key, items)) => {
                let inserted = expand_row(sheet, row, &cells, &key, &items, data, stats)?;
                offset += inserted;
            }
            None => {
                // Scalar pass only
                for (col, value, _) in &cells {
                    if let Some(text) = value.as_string() {
                        let (new_text, replaced) = substitute(text, None, data);
                        if replaced > 0 {
                            sheet.set_cell_value_at(row, *col, CellValue::String(new_text))?;
                            stats.cells_substituted += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Expand one template row over an array value; returns the number of rows
/// inserted
fn expand_row(
    sheet: &mut sheetforge_core::Worksheet,
    row: u32,
    template_cells: &[(u16, CellValue, u32)],
    key: &str,
    items: &[Value],
    data: &Map<String, Value>,
    stats: &mut FillStats,
) -> Result<u32> {
    let marker = format!("{{{{#{}}}}}", key);
    let empty_item = Map::new();

    // An empty array still consumes the marker; placeholders stay literal
    let element_count = items.len().max(1);

    for element in 0..element_count {
        let target_row = row + element as u32;

        // The first element reuses the template row; the rest get a fresh
        // row inserted below it
        if element > 0 {
            sheet.insert_row(target_row);
            stats.rows_inserted += 1;
        }

        let fields = match items.get(element) {
            Some(Value::Object(fields)) => fields,
            _ => &empty_item,
        };
        for (col, value, style_index) in template_cells {
            let new_value = match value.as_string() {
                Some(text) => {
                    let stripped = text.replace(&marker, "");
                    let (new_text, _) = substitute(&stripped, Some(fields), data);
                    CellValue::String(new_text)
                }
                None => value.clone(),
            };

            sheet.set_cell_value_at(target_row, *col, new_value)?;
            if *style_index != 0 {
                sheet.set_cell_style_index_at(target_row, *col, *style_index)?;
            }
            stats.cells_substituted += 1;
        }
    }

    Ok(element_count as u32 - 1)
}

/// Replace `{{key}}` placeholders, preferring the current element's fields
/// and falling back to the top-level mapping; unresolved keys stay literal
fn substitute(
    text: &str,
    item: Option<&Map<String, Value>>,
    data: &Map<String, Value>,
) -> (String, usize) {
    let mut replaced = 0;

    let result = PLACEHOLDER_RE.replace_all(text, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        let value = item
            .and_then(|fields| fields.get(key))
            .or_else(|| data.get(key));

        match value.and_then(scalar_to_string) {
            Some(s) => {
                replaced += 1;
                s
            }
            // Left as literal text, no error
            None => caps[0].to_string(),
        }
    });

    (result.into_owned(), replaced)
}

/// String form of a scalar; arrays, objects and null have none
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetforge_core::Worksheet;

    fn data(json: &str) -> Map<String, Value> {
        match serde_json::from_str(json).unwrap() {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_scalar_substitution() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "Hello {{name}}").unwrap();
        ws.set_cell_value("A2", "{{missing}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(&mut ws, &data(r#"{"name": "World"}"#), &mut stats).unwrap();

        assert_eq!(
            ws.get_value("A1").unwrap().as_string(),
            Some("Hello World")
        );
        // Unknown keys stay literal, no error
        assert_eq!(
            ws.get_value("A2").unwrap().as_string(),
            Some("{{missing}}")
        );
        assert_eq!(stats.cells_substituted, 1);
    }

    #[test]
    fn test_array_expansion() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "{{#items}}{{product}}: {{qty}}")
            .unwrap();

        let mut stats = FillStats::default();
        fill_sheet(
            &mut ws,
            &data(r#"{"items": [{"product": "A", "qty": 1}, {"product": "B", "qty": 2}]}"#),
            &mut stats,
        )
        .unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("A: 1"));
        assert_eq!(ws.get_value("A2").unwrap().as_string(), Some("B: 2"));
        assert_eq!(stats.rows_inserted, 1);
    }

    #[test]
    fn test_expansion_shifts_following_rows() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "Header").unwrap();
        ws.set_cell_value("A2", "{{#lines}}{{name}}").unwrap();
        ws.set_cell_value("B2", "{{amount}}").unwrap();
        ws.set_cell_value("A3", "Footer {{total}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(
            &mut ws,
            &data(
                r#"{"lines": [{"name": "x", "amount": 1},
                               {"name": "y", "amount": 2},
                               {"name": "z", "amount": 3}],
                    "total": 6}"#,
            ),
            &mut stats,
        )
        .unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("Header"));
        assert_eq!(ws.get_value("A2").unwrap().as_string(), Some("x"));
        assert_eq!(ws.get_value("B3").unwrap().as_string(), Some("2"));
        assert_eq!(ws.get_value("A4").unwrap().as_string(), Some("z"));
        // The footer shifted below the expansion and still substitutes
        assert_eq!(
            ws.get_value("A5").unwrap().as_string(),
            Some("Footer 6")
        );
        assert_eq!(stats.rows_inserted, 2);
    }

    #[test]
    fn test_marker_in_later_column_still_triggers() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "Line").unwrap();
        ws.set_cell_value("C1", "{{#rows}}{{v}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(
            &mut ws,
            &data(r#"{"rows": [{"v": "first"}, {"v": "second"}]}"#),
            &mut stats,
        )
        .unwrap();

        assert_eq!(ws.get_value("C1").unwrap().as_string(), Some("first"));
        assert_eq!(ws.get_value("C2").unwrap().as_string(), Some("second"));
        // The non-marker cell is copied into the expanded row
        assert_eq!(ws.get_value("A2").unwrap().as_string(), Some("Line"));
    }

    #[test]
    fn test_first_array_marker_wins_second_stays_literal() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "{{#one}}{{v}}").unwrap();
        ws.set_cell_value("B1", "{{#two}}{{w}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(
            &mut ws,
            &data(r#"{"one": [{"v": "a"}, {"v": "b"}], "two": [{"w": "z"}]}"#),
            &mut stats,
        )
        .unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("a"));
        assert_eq!(ws.get_value("A2").unwrap().as_string(), Some("b"));
        // The second marker's text survives as a literal in every
        // expanded row
        assert_eq!(
            ws.get_value("B1").unwrap().as_string(),
            Some("{{#two}}{{w}}")
        );
    }

    #[test]
    fn test_marker_with_non_array_data_stays_literal() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "{{#items}}{{product}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(&mut ws, &data(r#"{"items": "not an array"}"#), &mut stats).unwrap();

        assert_eq!(
            ws.get_value("A1").unwrap().as_string(),
            Some("{{#items}}{{product}}")
        );
        assert_eq!(stats.rows_inserted, 0);
    }

    #[test]
    fn test_empty_array_consumes_marker() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "{{#items}}{{product}}").unwrap();

        let mut stats = FillStats::default();
        fill_sheet(&mut ws, &data(r#"{"items": []}"#), &mut stats).unwrap();

        assert_eq!(
            ws.get_value("A1").unwrap().as_string(),
            Some("{{product}}")
        );
        assert_eq!(stats.rows_inserted, 0);
    }

    #[test]
    fn test_item_fields_shadow_top_level_keys() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "{{#items}}{{label}} ({{region}})")
            .unwrap();

        let mut stats = FillStats::default();
        fill_sheet(
            &mut ws,
            &data(r#"{"items": [{"label": "inner"}], "label": "outer", "region": "EU"}"#),
            &mut stats,
        )
        .unwrap();

        // label comes from the element; region falls back to the mapping
        assert_eq!(
            ws.get_value("A1").unwrap().as_string(),
            Some("inner (EU)")
        );
    }
}
