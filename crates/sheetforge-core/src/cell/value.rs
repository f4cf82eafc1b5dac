//! Cell value types

use std::fmt;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell (no value)
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (all numbers stored as f64, including date serials)
    Number(f64),

    /// String value
    String(String),

    /// Formula with its precomputed display result
    ///
    /// No evaluation happens anywhere in sheetforge; the result is whatever
    /// the document author supplied alongside the formula text.
    Formula {
        /// Original formula text (e.g., "=SUM(A1:A10)")
        text: String,
        /// Precomputed result to display
        result: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Create a new formula value with no precomputed result
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellValue::Formula {
            text: text.into(),
            result: None,
        }
    }

    /// Create a formula value with a precomputed result
    pub fn formula_with_result<S: Into<String>>(text: S, result: CellValue) -> Self {
        CellValue::Formula {
            text: text.into(),
            result: Some(Box::new(result)),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(1.0),
            CellValue::Boolean(false) => Some(0.0),
            CellValue::Formula {
                result: Some(v), ..
            } => v.as_number(),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Formula {
                result: Some(v), ..
            } => v.as_bool(),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            CellValue::Formula {
                result: Some(v), ..
            } => v.as_string(),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The value a user would see in the cell (formula results, not text)
    pub fn rendered(&self) -> String {
        self.to_string()
    }
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Formula {
                result: Some(v), ..
            } => write!(f, "{}", v),
            CellValue::Formula { text, .. } => write!(f, "{}", text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(3.14), CellValue::Number(3.14));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));

        let s = CellValue::from("hello");
        assert_eq!(s.as_string(), Some("hello"));
    }

    #[test]
    fn test_cell_value_as_number() {
        assert_eq!(CellValue::Number(42.0).as_number(), Some(42.0));
        assert_eq!(CellValue::Boolean(true).as_number(), Some(1.0));
        assert_eq!(CellValue::Boolean(false).as_number(), Some(0.0));
        assert_eq!(CellValue::string("hello").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
    }

    #[test]
    fn test_formula_renders_result() {
        let v = CellValue::formula_with_result("=SUM(A1:A3)", CellValue::Number(6.0));
        assert_eq!(v.rendered(), "6");
        assert_eq!(v.formula_text(), Some("=SUM(A1:A3)"));

        // Without a result, the text is all there is to show
        let v = CellValue::formula("=B1*2");
        assert_eq!(v.rendered(), "=B1*2");
    }

    #[test]
    fn test_rendered_number_trims_integer_fraction() {
        assert_eq!(CellValue::Number(5.0).rendered(), "5");
        assert_eq!(CellValue::Number(2.5).rendered(), "2.5");
    }
}
