//! Named table constructs
//!
//! A [`SheetTable`] marks a header+body rectangle on a worksheet as a real
//! table in the output container, with one column descriptor per header.
//! Registration is independent of whatever per-cell styling the writer
//! applied to the same rectangle.

use crate::cell::CellRange;
use crate::error::{Error, Result};

/// A named table registered on a worksheet
#[derive(Debug, Clone)]
pub struct SheetTable {
    /// Table name (workbook-unique in practice; validated per sheet here)
    name: String,
    /// The full header+body rectangle
    pub range: CellRange,
    /// Column names, one per header cell, in header order
    pub columns: Vec<String>,
}

impl SheetTable {
    /// Create a new named table
    ///
    /// Names follow Excel's defined-name rules loosely: non-empty, starting
    /// with a letter or underscore, no whitespace.
    pub fn new<S: Into<String>>(name: S, range: CellRange, columns: Vec<String>) -> Result<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(Error::InvalidTableName("table name is empty".into()));
        }
        let first = name.chars().next().unwrap();
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::InvalidTableName(format!(
                "table name must start with a letter or underscore: '{}'",
                name
            )));
        }
        if name.chars().any(|c| c.is_whitespace()) {
            return Err(Error::InvalidTableName(format!(
                "table name cannot contain whitespace: '{}'",
                name
            )));
        }
        if columns.is_empty() {
            return Err(Error::InvalidTableName(format!(
                "table '{}' has no columns",
                name
            )));
        }

        Ok(Self {
            name,
            range,
            columns,
        })
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> CellRange {
        CellRange::parse("A1:B3").unwrap()
    }

    #[test]
    fn test_valid_table() {
        let t = SheetTable::new("Sales", range(), vec!["Product".into(), "Q1".into()]).unwrap();
        assert_eq!(t.name(), "Sales");
        assert_eq!(t.columns.len(), 2);
    }

    #[test]
    fn test_invalid_names() {
        assert!(SheetTable::new("", range(), vec!["A".into()]).is_err());
        assert!(SheetTable::new("1st", range(), vec!["A".into()]).is_err());
        assert!(SheetTable::new("has space", range(), vec!["A".into()]).is_err());
        assert!(SheetTable::new("NoCols", range(), vec![]).is_err());
    }
}
