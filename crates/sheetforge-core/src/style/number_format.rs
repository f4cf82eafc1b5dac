//! Number format types

/// Number format for cell display
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    /// Create a number format from a format string
    pub fn from_string<S: Into<String>>(format: S) -> Self {
        NumberFormat::Custom(format.into())
    }

    /// Look up the format code for a built-in XLSX numFmtId
    ///
    /// Only the ids the reader is likely to meet are mapped; anything else
    /// stays General.
    pub fn from_builtin_id(id: u32) -> Self {
        let code = match id {
            0 => return NumberFormat::General,
            1 => "0",
            2 => "0.00",
            3 => "#,##0",
            4 => "#,##0.00",
            9 => "0%",
            10 => "0.00%",
            11 => "0.00E+00",
            14 => "mm-dd-yy",
            15 => "d-mmm-yy",
            16 => "d-mmm",
            17 => "mmm-yy",
            18 => "h:mm AM/PM",
            19 => "h:mm:ss AM/PM",
            20 => "h:mm",
            21 => "h:mm:ss",
            22 => "m/d/yy h:mm",
            49 => "@",
            _ => return NumberFormat::General,
        };
        NumberFormat::Custom(code.to_string())
    }

    /// Get the format code, if not General
    pub fn format_code(&self) -> Option<&str> {
        match self {
            NumberFormat::General => None,
            NumberFormat::Custom(code) => Some(code),
        }
    }

    /// Check if this is the General format
    pub fn is_general(&self) -> bool {
        matches!(self, NumberFormat::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(NumberFormat::from_builtin_id(0), NumberFormat::General);
        assert_eq!(
            NumberFormat::from_builtin_id(2),
            NumberFormat::Custom("0.00".into())
        );
        assert_eq!(
            NumberFormat::from_builtin_id(49),
            NumberFormat::Custom("@".into())
        );
        // Unknown ids degrade to General
        assert_eq!(NumberFormat::from_builtin_id(163), NumberFormat::General);
    }
}
