//! The declarative document model
//!
//! A [`WorkbookSpec`] is the validated request body: an ordered list of
//! sheets, each carrying explicit optional blocks for cells, ranges, tables
//! and sheet formatting. Presence is checked field by field; there is no
//! runtime type inspection anywhere downstream.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Top-level workbook document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbookSpec {
    /// Name of a stored template to preload
    pub template: Option<String>,
    /// Suggested output filename (passed through to the host)
    pub filename: Option<String>,
    /// Sheets, in output order
    #[serde(default)]
    pub sheets: Vec<SheetSpec>,
}

/// One sheet of the document
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSpec {
    /// Sheet name; matching an existing (template) sheet mutates it in place
    pub name: String,
    /// Individual cell writes
    pub cells: Option<Vec<CellSpec>>,
    /// Rectangular literal blocks
    pub ranges: Option<Vec<RangeSpec>>,
    /// Header+rows tables
    pub tables: Option<Vec<TableSpec>>,
    /// Sheet-level formatting
    pub formatting: Option<FormattingSpec>,
}

/// A single cell write: a literal value or a formula with its precomputed
/// display result
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpec {
    /// Target address, e.g. "B2"
    pub address: String,
    /// Literal value (ignored when a formula is present)
    pub value: Option<Value>,
    /// Opaque formula text; never evaluated here
    pub formula: Option<String>,
    /// Precomputed display result for the formula
    pub result: Option<Value>,
    /// Cell style
    pub style: Option<StyleSpec>,
    /// Data type tag driving the default number format
    pub data_type: Option<DataTypeTag>,
    /// Explicit number format, overriding the data type's default
    pub format: Option<String>,
}

/// A rectangular block of literal values
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSpec {
    /// "start:end" range string; only the start anchors the write, the
    /// data's own dimensions bound it
    pub range: String,
    /// Row-major literal values
    pub values: Vec<Vec<Value>>,
    /// Style applied uniformly to every written cell
    pub style: Option<StyleSpec>,
}

/// A header+rows table derived from row mappings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    /// If present, the header+body rectangle is registered as a named table
    pub name: Option<String>,
    /// Anchor address of the header row (default "A1")
    pub start: Option<String>,
    /// Row mappings; the first row's key set defines the columns
    pub rows: Vec<Map<String, Value>>,
    /// Header/body/alternating sub-styles
    pub style: Option<TableStyleSpec>,
}

/// Independent sub-styles for a table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStyleSpec {
    /// Header row style (a documented default applies when absent)
    pub header: Option<StyleSpec>,
    /// Style for every body cell
    pub body: Option<StyleSpec>,
    /// Layered on top of the body style for odd-indexed body rows
    pub alt_rows: Option<StyleSpec>,
}

/// A declarative, all-optional cell style
///
/// Absent fields leave the cell's prior style untouched; present fields are
/// normalized to documented defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    /// Font settings
    pub font: Option<FontSpec>,
    /// Background color (hex, "#" optional, RGB or ARGB)
    pub fill: Option<String>,
    /// Alignment settings
    pub alignment: Option<AlignmentSpec>,
    /// Per-edge border styles
    pub border: Option<BorderSpec>,
    /// Number format string
    pub format: Option<String>,
}

impl StyleSpec {
    /// Overlay `other` onto `self`: present fields of `other` win
    ///
    /// Used to layer the alternate-row style on top of the body style.
    pub fn merged_with(&self, other: &StyleSpec) -> StyleSpec {
        StyleSpec {
            font: other.font.clone().or_else(|| self.font.clone()),
            fill: other.fill.clone().or_else(|| self.fill.clone()),
            alignment: other.alignment.clone().or_else(|| self.alignment.clone()),
            border: other.border.clone().or_else(|| self.border.clone()),
            format: other.format.clone().or_else(|| self.format.clone()),
        }
    }

    /// True when no sub-object is present
    pub fn is_empty(&self) -> bool {
        self.font.is_none()
            && self.fill.is_none()
            && self.alignment.is_none()
            && self.border.is_none()
            && self.format.is_none()
    }
}

/// Font sub-style
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontSpec {
    /// Family name (default "Calibri")
    pub name: Option<String>,
    /// Size in points (default 11)
    pub size: Option<f64>,
    /// Bold (default false)
    pub bold: Option<bool>,
    /// Italic (default false)
    pub italic: Option<bool>,
    /// Underline (default false)
    pub underline: Option<bool>,
    /// Hex color
    pub color: Option<String>,
}

/// Alignment sub-style
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentSpec {
    /// horizontal: left | center | right | justify (default left)
    pub horizontal: Option<String>,
    /// vertical: top | center | bottom (default top)
    pub vertical: Option<String>,
    /// Wrap text (default false)
    pub wrap: Option<bool>,
    /// Indent level (default 0)
    pub indent: Option<u8>,
}

/// Border sub-style; unspecified edges default to thin, and all four edges
/// are always set together once a border is requested
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderSpec {
    /// top edge style name
    pub top: Option<String>,
    /// bottom edge style name
    pub bottom: Option<String>,
    /// left edge style name
    pub left: Option<String>,
    /// right edge style name
    pub right: Option<String>,
}

/// Data type tags with fixed default number formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataTypeTag {
    Number,
    Currency,
    Percentage,
    Date,
    Datetime,
    Time,
    Text,
}

impl DataTypeTag {
    /// The default number format for this tag
    pub fn default_format(&self) -> &'static str {
        match self {
            DataTypeTag::Number => "0.00",
            DataTypeTag::Currency => "$#,##0.00",
            DataTypeTag::Percentage => "0.00%",
            DataTypeTag::Date => "mm/dd/yyyy",
            DataTypeTag::Datetime => "mm/dd/yyyy hh:mm:ss",
            DataTypeTag::Time => "hh:mm:ss",
            DataTypeTag::Text => "@",
        }
    }

    /// Whether values with this tag are calendar-like and eligible for
    /// serial conversion
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            DataTypeTag::Date | DataTypeTag::Datetime | DataTypeTag::Time
        )
    }
}

/// Sheet-level formatting
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingSpec {
    /// Compute column widths from rendered cell contents
    pub auto_width: Option<bool>,
    /// Pin the first N rows
    pub freeze_rows: Option<u32>,
    /// Pin the first M columns
    pub freeze_cols: Option<u16>,
    /// Print setup
    pub page_setup: Option<PageSetupSpec>,
}

/// Print setup
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSetupSpec {
    /// portrait | landscape (default portrait)
    pub orientation: Option<String>,
    /// Paper size code (default 9 = A4)
    pub paper_size: Option<u8>,
    /// Margins in inches
    pub margins: Option<MarginsSpec>,
}

/// Page margins in inches
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginsSpec {
    pub top: Option<f64>,
    pub bottom: Option<f64>,
    pub left: Option<f64>,
    pub right: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let doc: WorkbookSpec = serde_json::from_str(
            r#"{"sheets": [{"name": "S1", "cells": [{"address": "A1", "value": 5}]}]}"#,
        )
        .unwrap();

        assert_eq!(doc.sheets.len(), 1);
        let cells = doc.sheets[0].cells.as_ref().unwrap();
        assert_eq!(cells[0].address, "A1");
        assert!(doc.sheets[0].ranges.is_none());
    }

    #[test]
    fn test_parse_full_cell() {
        let cell: CellSpec = serde_json::from_str(
            r##"{
                "address": "C3",
                "formula": "=SUM(A1:A2)",
                "result": 12,
                "dataType": "currency",
                "style": {"font": {"bold": true, "color": "#FFFFFF"}, "fill": "4472C4"}
            }"##,
        )
        .unwrap();

        assert_eq!(cell.formula.as_deref(), Some("=SUM(A1:A2)"));
        assert_eq!(cell.data_type, Some(DataTypeTag::Currency));
        assert!(cell.style.unwrap().font.unwrap().bold.unwrap());
    }

    #[test]
    fn test_table_rows_preserve_key_order() {
        let table: TableSpec = serde_json::from_str(
            r#"{"rows": [{"zeta": 1, "alpha": 2, "mid": 3}]}"#,
        )
        .unwrap();

        let keys: Vec<&String> = table.rows[0].keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_style_merge_overlays_present_fields() {
        let body: StyleSpec =
            serde_json::from_str(r#"{"fill": "EEEEEE", "font": {"size": 10}}"#).unwrap();
        let alt: StyleSpec = serde_json::from_str(r#"{"fill": "DDDDDD"}"#).unwrap();

        let merged = body.merged_with(&alt);
        assert_eq!(merged.fill.as_deref(), Some("DDDDDD"));
        assert_eq!(merged.font.unwrap().size, Some(10.0));
    }

    #[test]
    fn test_data_type_formats() {
        assert_eq!(DataTypeTag::Number.default_format(), "0.00");
        assert_eq!(DataTypeTag::Currency.default_format(), "$#,##0.00");
        assert_eq!(DataTypeTag::Percentage.default_format(), "0.00%");
        assert_eq!(DataTypeTag::Date.default_format(), "mm/dd/yyyy");
        assert_eq!(DataTypeTag::Datetime.default_format(), "mm/dd/yyyy hh:mm:ss");
        assert_eq!(DataTypeTag::Time.default_format(), "hh:mm:ss");
        assert_eq!(DataTypeTag::Text.default_format(), "@");
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let doc: WorkbookSpec = serde_json::from_str(
            r#"{"sheets": [], "requestId": "abc-123", "clientMeta": {"x": 1}}"#,
        )
        .unwrap();
        assert!(doc.sheets.is_empty());
    }
}
