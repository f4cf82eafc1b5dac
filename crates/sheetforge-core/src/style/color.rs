//! Color representation

use std::fmt;

/// Color representation
///
/// Colors are ARGB; 6-digit RGB input is promoted to opaque ARGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Automatic/default color
    #[default]
    Auto,

    /// ARGB color with alpha channel
    Argb { a: u8, r: u8, g: u8, b: u8 },
}

impl Color {
    /// Create an opaque RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Argb { a: 0xFF, r, g, b }
    }

    /// Create an ARGB color
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color::Argb { a, r, g, b }
    }

    /// Create from a hex string (e.g., "#FF0000", "FF0000", or "FFFF0000")
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');

        match hex.len() {
            6 => {
                let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                Some(Color::rgb(r, g, b))
            }
            8 => {
                let a = u8::from_str_radix(&hex[0..2], 16).ok()?;
                let r = u8::from_str_radix(&hex[2..4], 16).ok()?;
                let g = u8::from_str_radix(&hex[4..6], 16).ok()?;
                let b = u8::from_str_radix(&hex[6..8], 16).ok()?;
                Some(Color::Argb { a, r, g, b })
            }
            _ => None,
        }
    }

    /// Convert to ARGB hex string (8 characters, used by XLSX)
    ///
    /// Always returns an 8-character string with alpha, e.g., "FFFF0000" for
    /// opaque red. Auto renders as opaque black.
    pub fn to_argb_hex(&self) -> String {
        match self {
            Color::Auto => "FF000000".to_string(),
            Color::Argb { a, r, g, b } => format!("{:02X}{:02X}{:02X}{:02X}", a, r, g, b),
        }
    }

    /// Check if color is automatic/default
    pub fn is_auto(&self) -> bool {
        matches!(self, Color::Auto)
    }

    // Common colors
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => write!(f, "auto"),
            Color::Argb { .. } => write!(f, "#{}", self.to_argb_hex()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#FF0000"), Some(Color::rgb(255, 0, 0)));
        assert_eq!(Color::from_hex("00FF00"), Some(Color::rgb(0, 255, 0)));
        assert_eq!(
            Color::from_hex("#80FFFFFF"),
            Some(Color::argb(128, 255, 255, 255))
        );
        assert_eq!(Color::from_hex("nope"), None);
        assert_eq!(Color::from_hex("12345"), None);
    }

    #[test]
    fn test_to_argb_hex() {
        assert_eq!(Color::rgb(255, 0, 0).to_argb_hex(), "FFFF0000");
        assert_eq!(Color::argb(128, 255, 255, 255).to_argb_hex(), "80FFFFFF");
        assert_eq!(Color::Auto.to_argb_hex(), "FF000000");
    }
}
