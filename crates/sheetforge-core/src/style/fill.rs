//! Fill/background style types

use super::Color;

/// Fill style for cell background
///
/// The composition engine only ever produces solid pattern fills; anything
/// fancier in a loaded template is carried through untouched as its ARGB
/// color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FillStyle {
    /// No fill (transparent)
    #[default]
    None,

    /// Solid color fill
    Solid { color: Color },
}

impl FillStyle {
    /// Create a solid fill with the given color
    pub fn solid(color: Color) -> Self {
        FillStyle::Solid { color }
    }

    /// Check if this is a "no fill"
    pub fn is_none(&self) -> bool {
        matches!(self, FillStyle::None)
    }
}
