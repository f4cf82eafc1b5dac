//! Border style types

use super::Color;

/// Border style for a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BorderStyle {
    /// Left border
    pub left: Option<BorderEdge>,
    /// Right border
    pub right: Option<BorderEdge>,
    /// Top border
    pub top: Option<BorderEdge>,
    /// Bottom border
    pub bottom: Option<BorderEdge>,
}

impl BorderStyle {
    /// Create a new border style with no borders
    pub fn new() -> Self {
        Self::default()
    }

    /// Set all four borders to the same style
    pub fn all(style: BorderLineStyle, color: Color) -> Self {
        let edge = Some(BorderEdge::new(style, color));
        Self {
            left: edge.clone(),
            right: edge.clone(),
            top: edge.clone(),
            bottom: edge,
        }
    }

    /// Check if all borders are empty
    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none() && self.top.is_none() && self.bottom.is_none()
    }
}

/// A single border edge
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    /// Line style
    pub style: BorderLineStyle,
    /// Line color
    pub color: Color,
}

impl BorderEdge {
    /// Create a new border edge
    pub fn new(style: BorderLineStyle, color: Color) -> Self {
        Self { style, color }
    }

    /// Create a thin black border
    pub fn thin() -> Self {
        Self::new(BorderLineStyle::Thin, Color::BLACK)
    }
}

/// Border line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    /// Thin line (the default once a border is requested)
    #[default]
    Thin,
    /// Medium line
    Medium,
    /// Thick line
    Thick,
    /// Dashed line
    Dashed,
    /// Dotted line
    Dotted,
    /// Double line
    Double,
}
