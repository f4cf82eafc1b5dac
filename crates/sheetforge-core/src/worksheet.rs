//! Worksheet type

use crate::cell::{CellAddress, CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::style::Style;
use crate::table::SheetTable;
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
#[derive(Debug)]
pub struct Worksheet {
    /// Sheet name
    name: String,
    /// Cell storage
    cells: CellStorage,
    /// Freeze pane settings
    freeze_panes: Option<FreezePanes>,
    /// Print settings
    page_setup: PageSetup,
    /// Named tables registered on this sheet
    tables: Vec<SheetTable>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
            freeze_panes: None,
            page_setup: PageSetup::default(),
            tables: Vec::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the sheet name
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell by address string (e.g., "A1")
    pub fn cell(&self, address: &str) -> Result<Option<&CellData>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cells.get(addr.row, addr.col))
    }

    /// Get a cell by row and column indices
    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    /// Get cell value (convenience method)
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self
            .cells
            .get(addr.row, addr.col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells
            .get(row, col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Get a cell's style index by row/column (0 = default style)
    pub fn cell_style_index_at(&self, row: u32, col: u16) -> u32 {
        self.cells.get(row, col).map(|c| c.style_index).unwrap_or(0)
    }

    /// Get a style by its index in this worksheet's style pool
    pub fn style_by_index(&self, style_index: u32) -> Option<&Style> {
        self.cells.style_pool().get(style_index)
    }

    /// Get the non-default style applied to a cell, if any
    pub fn cell_style_at(&self, row: u32, col: u16) -> Option<&Style> {
        let idx = self.cell_style_index_at(row, col);
        if idx == 0 {
            None
        } else {
            self.style_by_index(idx)
        }
    }

    /// Get the non-default style applied to a cell by address, if any
    pub fn cell_style(&self, address: &str) -> Result<Option<&Style>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_style_at(addr.row, addr.col))
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Set a cell formula with its precomputed result
    pub fn set_cell_formula_at(
        &mut self,
        row: u32,
        col: u16,
        formula: &str,
        result: Option<CellValue>,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;

        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        };

        let value = match result {
            Some(r) => CellValue::formula_with_result(formula, r),
            None => CellValue::formula(formula),
        };
        self.cells.set_value(row, col, value);
        Ok(())
    }

    /// Set a cell style by address string
    pub fn set_cell_style(&mut self, address: &str, style: &Style) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_style_at(addr.row, addr.col, style)
    }

    /// Set a cell style by row and column indices
    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        self.validate_cell_position(row, col)?;
        let style_index = self.cells.style_pool_mut().get_or_insert(style.clone());
        self.cells.set_style(row, col, style_index);
        Ok(())
    }

    /// Set a cell's raw style index (must come from this sheet's pool)
    pub fn set_cell_style_index_at(&mut self, row: u32, col: u16, style_index: u32) -> Result<()> {
        self.validate_cell_position(row, col)?;
        self.cells.set_style(row, col, style_index);
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(row, col);
    }

    // === Row Operations ===

    /// Insert an empty row, shifting that row and everything below it down
    ///
    /// Registered tables are not adjusted; callers inserting into tabled
    /// regions re-register afterwards.
    pub fn insert_row(&mut self, row: u32) {
        self.cells.insert_row(row);
    }

    // === Range Operations ===

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(min_row, min_col, max_row, max_col)| {
                CellRange::from_indices(min_row, min_col, max_row, max_col)
            })
    }

    // === Column Operations ===

    /// Get a column's custom width, if set
    pub fn column_width(&self, col: u16) -> Option<f64> {
        self.cells.column_width(col)
    }

    /// Set column width in characters
    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.cells.set_column_width(col, width);
    }

    /// All custom column widths (column index → width in characters)
    pub fn custom_column_widths(&self) -> &std::collections::BTreeMap<u16, f64> {
        self.cells.custom_column_widths()
    }

    // === Freeze Panes ===

    /// Get freeze pane settings
    pub fn freeze_panes(&self) -> Option<&FreezePanes> {
        self.freeze_panes.as_ref()
    }

    /// Freeze the first `row` rows and `col` columns (0/0 unfreezes)
    pub fn set_freeze_panes(&mut self, row: u32, col: u16) {
        if row == 0 && col == 0 {
            self.freeze_panes = None;
        } else {
            self.freeze_panes = Some(FreezePanes { row, col });
        }
    }

    // === Page Setup ===

    /// Get print settings
    pub fn page_setup(&self) -> &PageSetup {
        &self.page_setup
    }

    /// Get mutable print settings
    pub fn page_setup_mut(&mut self) -> &mut PageSetup {
        &mut self.page_setup
    }

    // === Named Tables ===

    /// Register a named table on this sheet
    pub fn add_table(&mut self, table: SheetTable) -> Result<()> {
        if self
            .tables
            .iter()
            .any(|t| t.name().eq_ignore_ascii_case(table.name()))
        {
            return Err(Error::DuplicateTableName(table.name().to_string()));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Get all registered tables
    pub fn tables(&self) -> &[SheetTable] {
        &self.tables
    }

    // === Internal ===

    /// Validate cell position
    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }

    /// Get the number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    /// Check if the worksheet is empty
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterate over all non-empty cells
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }
}

/// Freeze pane settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezePanes {
    /// Number of frozen rows (first unfrozen row index)
    pub row: u32,
    /// Number of frozen columns (first unfrozen column index)
    pub col: u16,
}

/// Page setup for printing
#[derive(Debug, Clone)]
pub struct PageSetup {
    /// Paper size code (e.g., 1 = Letter, 9 = A4)
    pub paper_size: u8,
    /// Orientation
    pub orientation: PageOrientation,
    /// Top margin in inches
    pub top_margin: f64,
    /// Bottom margin in inches
    pub bottom_margin: f64,
    /// Left margin in inches
    pub left_margin: f64,
    /// Right margin in inches
    pub right_margin: f64,
    /// Header margin in inches
    pub header_margin: f64,
    /// Footer margin in inches
    pub footer_margin: f64,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            paper_size: 9, // A4
            orientation: PageOrientation::Portrait,
            top_margin: 0.75,
            bottom_margin: 0.75,
            left_margin: 0.7,
            right_margin: 0.7,
            header_margin: 0.3,
            footer_margin: 0.3,
        }
    }
}

/// Page orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn test_new_worksheet() {
        let ws = Worksheet::new("Test");
        assert_eq!(ws.name(), "Test");
        assert!(ws.is_empty());
    }

    #[test]
    fn test_set_cell_values() {
        let mut ws = Worksheet::new("Test");

        ws.set_cell_value("A1", "Hello").unwrap();
        ws.set_cell_value("B1", 42.0).unwrap();
        ws.set_cell_value("C1", true).unwrap();

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("Hello"));
        assert_eq!(ws.get_value("B1").unwrap().as_number(), Some(42.0));
        assert_eq!(ws.get_value("C1").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_set_cell_formula_keeps_result() {
        let mut ws = Worksheet::new("Test");

        ws.set_cell_formula_at(0, 0, "SUM(B1:B10)", Some(CellValue::Number(55.0)))
            .unwrap();

        let value = ws.get_value("A1").unwrap();
        assert!(value.is_formula());
        assert_eq!(value.formula_text(), Some("=SUM(B1:B10)"));
        assert_eq!(value.as_number(), Some(55.0));
    }

    #[test]
    fn test_style_preserved_across_value_write() {
        let mut ws = Worksheet::new("Test");

        let style = Style::new().fill_color(Color::rgb(255, 0, 0));
        ws.set_cell_style("A1", &style).unwrap();
        ws.set_cell_value("A1", "painted").unwrap();

        assert!(ws.cell_style("A1").unwrap().is_some());
        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("painted"));
    }

    #[test]
    fn test_used_range() {
        let mut ws = Worksheet::new("Test");

        assert!(ws.used_range().is_none());

        ws.set_cell_value_at(5, 3, "A").unwrap();
        ws.set_cell_value_at(10, 7, "B").unwrap();

        let range = ws.used_range().unwrap();
        assert_eq!(range.start.row, 5);
        assert_eq!(range.start.col, 3);
        assert_eq!(range.end.row, 10);
        assert_eq!(range.end.col, 7);
    }

    #[test]
    fn test_freeze_panes() {
        let mut ws = Worksheet::new("Test");
        assert!(ws.freeze_panes().is_none());

        ws.set_freeze_panes(1, 2);
        assert_eq!(ws.freeze_panes(), Some(&FreezePanes { row: 1, col: 2 }));

        ws.set_freeze_panes(0, 0);
        assert!(ws.freeze_panes().is_none());
    }

    #[test]
    fn test_duplicate_table_name_rejected() {
        let mut ws = Worksheet::new("Test");
        let range = CellRange::parse("A1:B2").unwrap();

        ws.add_table(SheetTable::new("Data", range, vec!["X".into()]).unwrap())
            .unwrap();
        let dup = SheetTable::new("DATA", range, vec!["Y".into()]).unwrap();
        assert!(ws.add_table(dup).is_err());
    }

    #[test]
    fn test_insert_row() {
        let mut ws = Worksheet::new("Test");
        ws.set_cell_value("A1", "one").unwrap();
        ws.set_cell_value("A2", "two").unwrap();

        ws.insert_row(1);

        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("one"));
        assert!(ws.get_value("A2").unwrap().is_empty());
        assert_eq!(ws.get_value("A3").unwrap().as_string(), Some("two"));
    }
}
