//! # sheetforge-core
//!
//! Core document model for the sheetforge workbook-composition engine.
//!
//! This crate provides the types the composition engine writes into:
//! - [`CellValue`] - cell values (numbers, strings, booleans, formulas with
//!   precomputed results)
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Style`] - cell formatting (fonts, fills, borders, alignment, number
//!   formats)
//! - [`SheetTable`] - named table constructs registered on a worksheet
//! - [`Workbook`], [`Worksheet`] - the document structures
//!
//! ## Example
//!
//! ```rust
//! use sheetforge_core::{Workbook, CellValue};
//!
//! let mut workbook = Workbook::empty();
//! workbook.add_worksheet_with_name("Report").unwrap();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Revenue").unwrap();
//! sheet.set_cell_value_at(0, 1, CellValue::Number(1250.0)).unwrap();
//! ```

pub mod cell;
pub mod error;
pub mod style;
pub mod table;
pub mod workbook;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{CellAddress, CellData, CellRange, CellValue};
pub use error::{Error, Result};
pub use table::SheetTable;
pub use workbook::Workbook;
pub use worksheet::{FreezePanes, PageOrientation, PageSetup, Worksheet};

// Re-export all style types for convenience
pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Style, StylePool, VerticalAlignment,
};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
