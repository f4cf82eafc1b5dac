//! Sparse cell storage
//!
//! Only non-empty cells are stored, in a row-based BTreeMap structure so
//! iteration is row-major (the order the XLSX writer needs).

use std::collections::BTreeMap;

use super::CellValue;
use crate::style::StylePool;

/// Complete data for a single cell
#[derive(Debug, Clone)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Index into the style pool (0 = default style)
    pub style_index: u32,
}

impl CellData {
    /// Create a new cell with a value and default style
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            style_index: 0,
        }
    }

    /// Create a new cell with a value and style
    pub fn with_style(value: CellValue, style_index: u32) -> Self {
        Self { value, style_index }
    }

    /// Check if this cell is effectively empty (no value and default style)
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

impl Default for CellData {
    fn default() -> Self {
        Self::new(CellValue::Empty)
    }
}

/// Sparse row-based storage for worksheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellData>>`
#[derive(Debug)]
pub struct CellStorage {
    /// Row index → column map
    rows: BTreeMap<u32, BTreeMap<u16, CellData>>,

    /// Shared style pool for deduplication
    pub(crate) style_pool: StylePool,

    /// Custom column widths (width in characters)
    column_widths: BTreeMap<u16, f64>,
}

impl CellStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            style_pool: StylePool::new(),
            column_widths: BTreeMap::new(),
        }
    }

    /// Get a cell, if present
    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.get(&col))
    }

    /// Get a mutable cell, if present
    pub fn get_mut(&mut self, row: u32, col: u16) -> Option<&mut CellData> {
        self.rows.get_mut(&row).and_then(|r| r.get_mut(&col))
    }

    /// Set a cell's value, preserving any existing style
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        let cell = self
            .rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_default();
        cell.value = value;
    }

    /// Set a cell's style index, preserving any existing value
    pub fn set_style(&mut self, row: u32, col: u16, style_index: u32) {
        let cell = self
            .rows
            .entry(row)
            .or_default()
            .entry(col)
            .or_default();
        cell.style_index = style_index;
    }

    /// Replace a cell entirely
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        self.rows.entry(row).or_default().insert(col, data);
    }

    /// Remove a cell
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let row_map = self.rows.get_mut(&row)?;
        let removed = row_map.remove(&col);
        if row_map.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Insert an empty row at `row`, shifting that row and everything below
    /// it down by one
    pub fn insert_row(&mut self, row: u32) {
        let shifted: Vec<(u32, BTreeMap<u16, CellData>)> = self
            .rows
            .split_off(&row)
            .into_iter()
            .map(|(r, cells)| (r + 1, cells))
            .collect();
        self.rows.extend(shifted);
    }

    /// Bounds of all stored cells: (min_row, min_col, max_row, max_col)
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let mut bounds: Option<(u32, u16, u32, u16)> = None;

        for (&row, cols) in &self.rows {
            for &col in cols.keys() {
                bounds = Some(match bounds {
                    None => (row, col, row, col),
                    Some((min_r, min_c, max_r, max_c)) => (
                        min_r.min(row),
                        min_c.min(col),
                        max_r.max(row),
                        max_c.max(col),
                    ),
                });
            }
        }

        bounds
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(|r| r.len()).sum()
    }

    /// Check if no cells are stored
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over all cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cols)| cols.iter().map(move |(&col, data)| (row, col, data)))
    }

    /// Get a column's custom width, if set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.column_widths.get(&col).copied()
    }

    /// Set a column's width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// All custom column widths (column index → width in characters)
    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    /// Get the style pool
    pub fn style_pool(&self) -> &StylePool {
        &self.style_pool
    }

    /// Get the mutable style pool
    pub fn style_pool_mut(&mut self) -> &mut StylePool {
        &mut self.style_pool
    }
}

impl Default for CellStorage {
    fn default() -> Self {
        Self::new()
    }
}
