//! Style pool for deduplication

use super::Style;
use ahash::AHashMap;

/// Style pool for deduplicating styles
///
/// Composed workbooks repeat a handful of styles across many cells (header
/// rows, body rows, alternating rows). The pool stores each unique style
/// once; cells reference styles by index.
#[derive(Debug)]
pub struct StylePool {
    /// All unique styles (index 0 is default)
    styles: Vec<Style>,
    /// Fast lookup for deduplication
    index_map: AHashMap<Style, u32>,
}

impl StylePool {
    /// Create a new style pool with the default style at index 0
    pub fn new() -> Self {
        let mut pool = Self {
            styles: Vec::with_capacity(16),
            index_map: AHashMap::with_capacity(16),
        };

        let default = Style::default();
        pool.styles.push(default.clone());
        pool.index_map.insert(default, 0);

        pool
    }

    /// Get or create a style, returning its index
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        if let Some(&idx) = self.index_map.get(&style) {
            return idx;
        }

        let idx = self.styles.len() as u32;
        self.styles.push(style.clone());
        self.index_map.insert(style, idx);
        idx
    }

    /// Get a style by index
    pub fn get(&self, index: u32) -> Option<&Style> {
        self.styles.get(index as usize)
    }

    /// Number of unique styles (including the default)
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// The pool always holds at least the default style
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    #[test]
    fn test_deduplication() {
        let mut pool = StylePool::new();

        let bold = Style::new().bold(true);
        let idx1 = pool.get_or_insert(bold.clone());
        let idx2 = pool.get_or_insert(bold);

        assert_eq!(idx1, idx2);
        assert_eq!(pool.len(), 2);

        let red = Style::new().font_color(Color::rgb(255, 0, 0));
        let idx3 = pool.get_or_insert(red);
        assert_ne!(idx1, idx3);
    }

    #[test]
    fn test_default_is_index_zero() {
        let mut pool = StylePool::new();
        assert_eq!(pool.get_or_insert(Style::default()), 0);
        assert_eq!(pool.len(), 1);
    }
}
