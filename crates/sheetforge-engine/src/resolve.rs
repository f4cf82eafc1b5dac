//! Address resolution
//!
//! The document-facing contract: an anchor (column letters + 1-based row) plus a
//! column offset yields a concrete target address. Column arithmetic is real
//! base-26 with carry, so offsets past "Z" produce "AA", "AB", ... instead
//! of wrapping within a single letter.

use sheetforge_core::CellAddress;

use crate::error::{EngineError, Result};

/// Resolve an anchor plus a column offset into a target address
///
/// Row offsets are the caller's business: callers add them to `anchor_row`
/// before calling. Fails only on a malformed anchor or an out-of-bounds
/// target.
pub fn resolve_address(anchor_col: &str, anchor_row: u32, col_offset: u16) -> Result<CellAddress> {
    if anchor_row == 0 {
        return Err(EngineError::Validation(format!(
            "anchor row must be >= 1, got {}",
            anchor_row
        )));
    }

    let col = CellAddress::letters_to_column(anchor_col)
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    CellAddress::new(anchor_row - 1, col)
        .offset(0, col_offset)
        .map_err(|e| EngineError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        assert_eq!(resolve_address("A", 1, 0).unwrap().to_a1_string(), "A1");
        assert_eq!(resolve_address("A", 3, 1).unwrap().to_a1_string(), "B3");
        assert_eq!(resolve_address("C", 10, 2).unwrap().to_a1_string(), "E10");
    }

    #[test]
    fn test_resolve_roundtrip_within_alphabet() {
        // Decoding the produced column yields anchor index + offset
        for offset in 0u16..26 {
            let addr = resolve_address("A", 1, offset).unwrap();
            assert_eq!(addr.col, offset);
        }
    }

    #[test]
    fn test_resolve_carries_into_second_letter() {
        // Offsets past the single-letter span do not wrap
        assert_eq!(resolve_address("Z", 1, 1).unwrap().to_a1_string(), "AA1");
        assert_eq!(resolve_address("A", 1, 30).unwrap().to_a1_string(), "AE1");
        assert_eq!(resolve_address("AA", 2, 2).unwrap().to_a1_string(), "AC2");
    }

    #[test]
    fn test_resolve_rejects_bad_anchor() {
        assert!(resolve_address("", 1, 0).is_err());
        assert!(resolve_address("A1", 1, 0).is_err());
        assert!(resolve_address("A", 0, 0).is_err());
    }
}
