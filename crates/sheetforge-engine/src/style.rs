//! Style normalization
//!
//! Maps a declarative [`StyleSpec`] onto a cell's style, applying only the
//! present sub-objects and normalizing each to its documented defaults.
//! Nothing in here ever aborts a value write: a sub-style that fails to
//! normalize is logged as a warning and skipped.

use sheetforge_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Style, VerticalAlignment,
};
use sheetforge_core::Worksheet;

use crate::spec::{AlignmentSpec, BorderSpec, DataTypeTag, FontSpec, StyleSpec};

/// Normalize a hex color string
///
/// Strips a leading `#`, uppercases, and promotes 6-digit RGB to opaque
/// 8-digit ARGB. Returns `None` for anything that is not 6 or 8 hex digits.
pub fn normalize_color(hex: &str) -> Option<Color> {
    Color::from_hex(hex)
}

/// Opaque black, the fallback when a color is absent
pub const DEFAULT_COLOR: Color = Color::argb(0xFF, 0, 0, 0);

/// Apply a style spec onto a cell, layered over whatever style the cell
/// already carries
///
/// Never fails: sub-styles that cannot be normalized degrade to a warning.
pub fn apply_style_spec(sheet: &mut Worksheet, row: u32, col: u16, spec: &StyleSpec) {
    if spec.is_empty() {
        return;
    }

    let mut style = sheet.cell_style_at(row, col).cloned().unwrap_or_default();

    if let Some(font_spec) = &spec.font {
        match build_font(font_spec) {
            Ok(font) => style.font = font,
            Err(detail) => log::warn!("Skipping font style: {}", detail),
        }
    }

    if let Some(fill_hex) = &spec.fill {
        match normalize_color(fill_hex) {
            Some(color) => style.fill = FillStyle::Solid { color },
            None => log::warn!("Skipping fill style: invalid color '{}'", fill_hex),
        }
    }

    if let Some(alignment_spec) = &spec.alignment {
        style.alignment = build_alignment(alignment_spec);
    }

    if let Some(border_spec) = &spec.border {
        style.border = build_border(border_spec);
    }

    if let Some(format) = &spec.format {
        style.number_format = NumberFormat::Custom(format.clone());
    }

    if let Err(e) = sheet.set_cell_style_at(row, col, &style) {
        log::warn!("Skipping style at ({}, {}): {}", row, col, e);
    }
}

/// Apply a data-type tag's number format, overridden by an explicit format
/// string when supplied
pub fn apply_data_type(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    tag: DataTypeTag,
    explicit_format: Option<&str>,
) {
    let code = explicit_format.unwrap_or_else(|| tag.default_format());

    let mut style = sheet.cell_style_at(row, col).cloned().unwrap_or_default();
    style.number_format = NumberFormat::Custom(code.to_string());

    if let Err(e) = sheet.set_cell_style_at(row, col, &style) {
        log::warn!("Skipping number format at ({}, {}): {}", row, col, e);
    }
}

fn build_font(spec: &FontSpec) -> std::result::Result<FontStyle, String> {
    let color = match &spec.color {
        Some(hex) => normalize_color(hex).ok_or_else(|| format!("invalid color '{}'", hex))?,
        None => DEFAULT_COLOR,
    };

    Ok(FontStyle {
        name: spec.name.clone().unwrap_or_else(|| "Calibri".to_string()),
        size: spec.size.unwrap_or(11.0),
        bold: spec.bold.unwrap_or(false),
        italic: spec.italic.unwrap_or(false),
        underline: spec.underline.unwrap_or(false),
        color,
    })
}

fn build_alignment(spec: &AlignmentSpec) -> Alignment {
    let horizontal = match spec.horizontal.as_deref() {
        None | Some("left") => HorizontalAlignment::Left,
        Some("center") => HorizontalAlignment::Center,
        Some("right") => HorizontalAlignment::Right,
        Some("justify") => HorizontalAlignment::Justify,
        Some(other) => {
            log::warn!("Unknown horizontal alignment '{}', using left", other);
            HorizontalAlignment::Left
        }
    };

    let vertical = match spec.vertical.as_deref() {
        None | Some("top") => VerticalAlignment::Top,
        Some("center") | Some("middle") => VerticalAlignment::Center,
        Some("bottom") => VerticalAlignment::Bottom,
        Some(other) => {
            log::warn!("Unknown vertical alignment '{}', using top", other);
            VerticalAlignment::Top
        }
    };

    Alignment {
        horizontal,
        vertical,
        wrap_text: spec.wrap.unwrap_or(false),
        indent: spec.indent.unwrap_or(0),
    }
}

fn build_border(spec: &BorderSpec) -> BorderStyle {
    // Once a border is requested, all four edges are set together;
    // unspecified edges fall back to thin.
    BorderStyle {
        top: Some(build_edge(spec.top.as_deref())),
        bottom: Some(build_edge(spec.bottom.as_deref())),
        left: Some(build_edge(spec.left.as_deref())),
        right: Some(build_edge(spec.right.as_deref())),
    }
}

fn build_edge(style_name: Option<&str>) -> BorderEdge {
    let line = match style_name {
        None | Some("thin") => BorderLineStyle::Thin,
        Some("medium") => BorderLineStyle::Medium,
        Some("thick") => BorderLineStyle::Thick,
        Some("dashed") => BorderLineStyle::Dashed,
        Some("dotted") => BorderLineStyle::Dotted,
        Some("double") => BorderLineStyle::Double,
        Some(other) => {
            log::warn!("Unknown border style '{}', using thin", other);
            BorderLineStyle::Thin
        }
    };
    BorderEdge::new(line, DEFAULT_COLOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_color_pads_rgb() {
        assert_eq!(
            normalize_color("#abc123").unwrap().to_argb_hex(),
            "FFABC123"
        );
        assert_eq!(normalize_color("abc123").unwrap().to_argb_hex(), "FFABC123");
    }

    #[test]
    fn test_normalize_color_idempotent_on_argb() {
        let once = normalize_color("FFABC123").unwrap().to_argb_hex();
        let twice = normalize_color(&once).unwrap().to_argb_hex();
        assert_eq!(once, "FFABC123");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_color_rejects_garbage() {
        assert!(normalize_color("red").is_none());
        assert!(normalize_color("#12345").is_none());
        assert!(normalize_color("").is_none());
    }

    #[test]
    fn test_font_defaults() {
        let font = build_font(&FontSpec::default()).unwrap();
        assert_eq!(font.name, "Calibri");
        assert_eq!(font.size, 11.0);
        assert!(!font.bold);
        assert!(!font.italic);
        assert!(!font.underline);
        assert_eq!(font.color, DEFAULT_COLOR);
    }

    #[test]
    fn test_alignment_defaults() {
        let align = build_alignment(&AlignmentSpec::default());
        assert_eq!(align.horizontal, HorizontalAlignment::Left);
        assert_eq!(align.vertical, VerticalAlignment::Top);
        assert!(!align.wrap_text);
        assert_eq!(align.indent, 0);
    }

    #[test]
    fn test_border_sets_all_edges() {
        let spec: BorderSpec = serde_json::from_str(r#"{"top": "medium"}"#).unwrap();
        let border = build_border(&spec);

        assert_eq!(border.top.as_ref().unwrap().style, BorderLineStyle::Medium);
        // Unspecified edges are thin, not absent
        assert_eq!(border.left.as_ref().unwrap().style, BorderLineStyle::Thin);
        assert_eq!(border.right.as_ref().unwrap().style, BorderLineStyle::Thin);
        assert_eq!(
            border.bottom.as_ref().unwrap().style,
            BorderLineStyle::Thin
        );
    }

    #[test]
    fn test_invalid_fill_leaves_prior_style() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", "x").unwrap();

        let spec: StyleSpec =
            serde_json::from_str(r#"{"fill": "not-a-color", "font": {"bold": true}}"#).unwrap();
        apply_style_spec(&mut ws, 0, 0, &spec);

        // The fill was skipped, but the font still applied and the value
        // is intact
        let style = ws.cell_style_at(0, 0).unwrap();
        assert_eq!(style.fill, FillStyle::None);
        assert!(style.font.bold);
        assert_eq!(ws.get_value("A1").unwrap().as_string(), Some("x"));
    }

    #[test]
    fn test_explicit_format_overrides_data_type() {
        let mut ws = Worksheet::new("T");
        ws.set_cell_value("A1", 3.5).unwrap();

        apply_data_type(&mut ws, 0, 0, DataTypeTag::Currency, Some("0.000"));
        let style = ws.cell_style_at(0, 0).unwrap();
        assert_eq!(style.number_format, NumberFormat::Custom("0.000".into()));
    }
}
