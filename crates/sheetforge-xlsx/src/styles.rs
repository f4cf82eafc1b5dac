//! XLSX styles (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use sheetforge_core::style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Style, VerticalAlignment,
};
use sheetforge_core::Workbook;

// === Writing ===

#[derive(Debug)]
pub(crate) struct XlsxStyleTable {
    /// Global, deduplicated styles. Index corresponds to the cellXfs index (xfId).
    styles: Vec<Style>,
    /// Per-worksheet mapping: local worksheet style index -> global xfId.
    sheet_maps: Vec<HashMap<u32, u32>>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

impl XlsxStyleTable {
    pub(crate) fn build(workbook: &Workbook) -> Self {
        let mut styles: Vec<Style> = Vec::new();
        let mut style_to_xf: HashMap<Style, u32> = HashMap::new();

        // Index 0 is always default style
        let default = Style::default();
        styles.push(default.clone());
        style_to_xf.insert(default, 0);

        let mut sheet_maps: Vec<HashMap<u32, u32>> = Vec::with_capacity(workbook.sheet_count());

        for sheet in workbook.worksheets() {
            let mut map: HashMap<u32, u32> = HashMap::new();
            map.insert(0, 0);

            for (_row, _col, cell) in sheet.iter_cells() {
                let local_idx = cell.style_index;
                if local_idx == 0 || map.contains_key(&local_idx) {
                    continue;
                }

                let style = sheet
                    .style_by_index(local_idx)
                    .cloned()
                    .unwrap_or_else(Style::default);

                let xf_id = match style_to_xf.get(&style) {
                    Some(&id) => id,
                    None => {
                        let id = styles.len() as u32;
                        styles.push(style.clone());
                        style_to_xf.insert(style, id);
                        id
                    }
                };

                map.insert(local_idx, xf_id);
            }

            sheet_maps.push(map);
        }

        Self { styles, sheet_maps }
    }

    pub(crate) fn xf_id_for(&self, sheet_index: usize, local_style_index: u32) -> u32 {
        self.sheet_maps
            .get(sheet_index)
            .and_then(|m| m.get(&local_style_index).copied())
            .unwrap_or(0)
    }

    pub(crate) fn to_styles_xml(&self) -> String {
        // Build component tables
        let mut font_ids: HashMap<FontStyle, u32> = HashMap::new();
        let mut fonts: Vec<FontStyle> = Vec::new();

        let default_font = FontStyle::default();
        fonts.push(default_font.clone());
        font_ids.insert(default_font, 0);

        // Excel requires the first two fills to be: none and gray125.
        // Solid fills therefore start at id 2.
        let mut fill_ids: HashMap<FillStyle, u32> = HashMap::new();
        let mut solid_fills: Vec<FillStyle> = Vec::new();

        let mut border_ids: HashMap<BorderStyle, u32> = HashMap::new();
        let mut borders: Vec<BorderStyle> = Vec::new();
        let default_border = BorderStyle::default();
        borders.push(default_border.clone());
        border_ids.insert(default_border, 0);

        // Custom number formats start above the built-in id range
        let mut numfmt_ids: HashMap<String, u32> = HashMap::new();
        let mut numfmts: Vec<(u32, String)> = Vec::new();
        let mut next_numfmt_id: u32 = 164;

        // Resolve component IDs for each style
        let mut resolved: Vec<ResolvedXfIds> = Vec::with_capacity(self.styles.len());

        for style in &self.styles {
            let font_id = match font_ids.get(&style.font) {
                Some(&id) => id,
                None => {
                    let id = fonts.len() as u32;
                    fonts.push(style.font.clone());
                    font_ids.insert(style.font.clone(), id);
                    id
                }
            };

            let fill_id = match &style.fill {
                FillStyle::None => 0,
                solid => {
                    if let Some(&id) = fill_ids.get(solid) {
                        id
                    } else {
                        let id = solid_fills.len() as u32 + 2;
                        solid_fills.push(solid.clone());
                        fill_ids.insert(solid.clone(), id);
                        id
                    }
                }
            };

            let border_id = match border_ids.get(&style.border) {
                Some(&id) => id,
                None => {
                    let id = borders.len() as u32;
                    borders.push(style.border.clone());
                    border_ids.insert(style.border.clone(), id);
                    id
                }
            };

            let num_fmt_id = match &style.number_format {
                NumberFormat::General => 0,
                NumberFormat::Custom(code) => {
                    if let Some(&id) = numfmt_ids.get(code) {
                        id
                    } else {
                        let id = next_numfmt_id;
                        next_numfmt_id += 1;
                        numfmt_ids.insert(code.clone(), id);
                        numfmts.push((id, code.clone()));
                        id
                    }
                }
            };

            resolved.push(ResolvedXfIds {
                font_id,
                fill_id,
                border_id,
                num_fmt_id,
            });
        }

        // Write XML
        let mut xml = String::new();
        xml.push_str(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if !numfmts.is_empty() {
            xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
            for (id, code) in &numfmts {
                xml.push_str(&format!(
                    "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                    id,
                    escape_xml_attr(code)
                ));
            }
            xml.push_str("\n  </numFmts>");
        }

        // Fonts
        xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
        for font in &fonts {
            xml.push_str("\n    ");
            xml.push_str(&write_font(font));
        }
        xml.push_str("\n  </fonts>");

        // Fills
        xml.push_str(&format!("\n  <fills count=\"{}\">", solid_fills.len() + 2));
        xml.push_str("\n    <fill><patternFill patternType=\"none\"/></fill>");
        xml.push_str("\n    <fill><patternFill patternType=\"gray125\"/></fill>");
        for fill in &solid_fills {
            xml.push_str("\n    ");
            xml.push_str(&write_fill(fill));
        }
        xml.push_str("\n  </fills>");

        // Borders
        xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
        for border in &borders {
            xml.push_str("\n    ");
            xml.push_str(&write_border(border));
        }
        xml.push_str("\n  </borders>");

        // cellStyleXfs (required)
        xml.push_str(
            r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
        );

        // cellXfs
        xml.push_str(&format!("\n  <cellXfs count=\"{}\">", self.styles.len()));
        for (i, ids) in resolved.iter().enumerate() {
            let style = &self.styles[i];
            xml.push_str("\n    ");
            xml.push_str(&write_xf(style, *ids));
        }
        xml.push_str("\n  </cellXfs>");

        // cellStyles (required)
        xml.push_str(
            r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>
  <dxfs count="0"/>
  <tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/>"#,
        );

        xml.push_str("\n</styleSheet>");
        xml
    }
}

fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_color_element(color: &Color) -> String {
    match color {
        Color::Auto => "<color indexed=\"64\"/>".to_string(),
        argb => format!("<color rgb=\"{}\"/>", argb.to_argb_hex()),
    }
}

fn write_font(font: &FontStyle) -> String {
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.underline {
        s.push_str("<u/>");
    }
    s.push_str(&format!("<sz val=\"{}\"/>", font.size));

    if !font.color.is_auto() {
        s.push_str(&write_color_element(&font.color));
    }

    s.push_str(&format!("<name val=\"{}\"/>", escape_xml_attr(&font.name)));
    s.push_str("</font>");
    s
}

fn write_fill(fill: &FillStyle) -> String {
    match fill {
        FillStyle::None => "<fill><patternFill patternType=\"none\"/></fill>".to_string(),
        FillStyle::Solid { color } => {
            format!(
                "<fill><patternFill patternType=\"solid\"><fgColor rgb=\"{}\"/><bgColor indexed=\"64\"/></patternFill></fill>",
                color.to_argb_hex()
            )
        }
    }
}

fn border_style_to_str(s: BorderLineStyle) -> &'static str {
    match s {
        BorderLineStyle::Thin => "thin",
        BorderLineStyle::Medium => "medium",
        BorderLineStyle::Thick => "thick",
        BorderLineStyle::Dashed => "dashed",
        BorderLineStyle::Dotted => "dotted",
        BorderLineStyle::Double => "double",
    }
}

fn write_border_edge(tag: &str, edge: &Option<BorderEdge>) -> String {
    match edge {
        None => format!("<{tag}/>"),
        Some(e) => {
            format!(
                "<{tag} style=\"{}\">{}</{tag}>",
                border_style_to_str(e.style),
                write_color_element(&e.color)
            )
        }
    }
}

fn write_border(border: &BorderStyle) -> String {
    let mut s = String::from("<border>");
    s.push_str(&write_border_edge("left", &border.left));
    s.push_str(&write_border_edge("right", &border.right));
    s.push_str(&write_border_edge("top", &border.top));
    s.push_str(&write_border_edge("bottom", &border.bottom));
    s.push_str("<diagonal/>");
    s.push_str("</border>");
    s
}

fn horiz_to_str(h: HorizontalAlignment) -> &'static str {
    match h {
        HorizontalAlignment::General => "general",
        HorizontalAlignment::Left => "left",
        HorizontalAlignment::Center => "center",
        HorizontalAlignment::Right => "right",
        HorizontalAlignment::Justify => "justify",
    }
}

fn vert_to_str(v: VerticalAlignment) -> &'static str {
    match v {
        VerticalAlignment::Top => "top",
        VerticalAlignment::Center => "center",
        VerticalAlignment::Bottom => "bottom",
    }
}

fn write_alignment(al: &Alignment) -> String {
    // Only write if any non-default property is set
    let default = Alignment::default();
    if al == &default {
        return String::new();
    }

    let mut s = String::from("<alignment");
    if al.horizontal != default.horizontal {
        s.push_str(&format!(" horizontal=\"{}\"", horiz_to_str(al.horizontal)));
    }
    if al.vertical != default.vertical {
        s.push_str(&format!(" vertical=\"{}\"", vert_to_str(al.vertical)));
    }
    if al.wrap_text {
        s.push_str(" wrapText=\"1\"");
    }
    if al.indent != 0 {
        s.push_str(&format!(" indent=\"{}\"", al.indent));
    }
    s.push_str("/>");
    s
}

fn write_xf(style: &Style, ids: ResolvedXfIds) -> String {
    // apply flags
    let mut attrs = String::new();
    if ids.num_fmt_id != 0 {
        attrs.push_str(" applyNumberFormat=\"1\"");
    }
    if style.font != FontStyle::default() {
        attrs.push_str(" applyFont=\"1\"");
    }
    if style.fill != FillStyle::None {
        attrs.push_str(" applyFill=\"1\"");
    }
    if style.border != BorderStyle::default() {
        attrs.push_str(" applyBorder=\"1\"");
    }
    if style.alignment != Alignment::default() {
        attrs.push_str(" applyAlignment=\"1\"");
    }

    let mut s = format!(
        "<xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"{}",
        ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id, attrs
    );

    let alignment_xml = write_alignment(&style.alignment);
    if alignment_xml.is_empty() {
        s.push_str("/>");
        return s;
    }

    s.push('>');
    s.push_str(&alignment_xml);
    s.push_str("</xf>");
    s
}

// === Reading ===

/// Result of reading styles.xml
#[derive(Debug)]
pub(crate) struct ParsedStyles {
    /// Styles indexed by cellXfs position (the `s` attribute on cells)
    pub cell_styles: Vec<Style>,
}

/// Parser state while walking styles.xml
#[derive(Default)]
struct StyleParseState {
    numfmts: HashMap<u32, String>,
    fonts: Vec<FontStyle>,
    fills: Vec<FillStyle>,
    borders: Vec<BorderStyle>,
    cell_xfs: Vec<Style>,

    current_font: Option<FontStyle>,
    in_fill: bool,
    fill_is_solid: bool,
    current_fill_color: Color,
    current_border: Option<BorderStyle>,
    current_border_edge: Option<&'static str>,
    // (num_fmt_id, font_id, fill_id, border_id, alignment)
    current_xf: Option<(u32, u32, u32, u32, Alignment)>,
    in_cell_xfs: bool,
}

impl StyleParseState {
    fn finish_xf(&mut self) {
        if let Some(xf) = self.current_xf.take() {
            let style = resolve_style(xf, &self.numfmts, &self.fonts, &self.fills, &self.borders);
            self.cell_xfs.push(style);
        }
    }

    fn start_element(&mut self, e: &quick_xml::events::BytesStart<'_>, is_empty: bool) {
        match e.name().as_ref() {
            b"numFmt" => {
                let mut id: Option<u32> = None;
                let mut code: Option<String> = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => {
                            id = attr.unescape_value().ok().and_then(|s| s.parse().ok());
                        }
                        b"formatCode" => {
                            code = attr.unescape_value().ok().map(|s| s.to_string());
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    self.numfmts.insert(id, code);
                }
            }

            b"cellXfs" => {
                self.in_cell_xfs = true;
            }

            b"font" => {
                if is_empty {
                    self.fonts.push(FontStyle::default());
                } else {
                    self.current_font = Some(FontStyle::default());
                }
            }

            b"b" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.bold = true;
                }
            }
            b"i" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.italic = true;
                }
            }
            b"u" => {
                if let Some(font) = self.current_font.as_mut() {
                    font.underline = true;
                }
            }
            b"sz" => {
                if let Some(font) = self.current_font.as_mut() {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            if let Ok(v) = attr.unescape_value() {
                                font.size = v.parse::<f64>().unwrap_or(font.size);
                            }
                        }
                    }
                }
            }
            b"name" => {
                if let Some(font) = self.current_font.as_mut() {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            if let Ok(v) = attr.unescape_value() {
                                font.name = v.to_string();
                            }
                        }
                    }
                }
            }

            b"fill" => {
                if is_empty {
                    self.fills.push(FillStyle::None);
                } else {
                    self.in_fill = true;
                    self.fill_is_solid = false;
                    self.current_fill_color = Color::Auto;
                }
            }
            b"patternFill" if self.in_fill => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"patternType" {
                        if let Ok(v) = attr.unescape_value() {
                            self.fill_is_solid = v.as_ref() == "solid";
                        }
                    }
                }
            }
            b"fgColor" if self.in_fill => {
                self.current_fill_color = parse_color_attrs(e);
            }

            b"border" => {
                if is_empty {
                    self.borders.push(BorderStyle::default());
                } else {
                    self.current_border = Some(BorderStyle::default());
                    self.current_border_edge = None;
                }
            }
            b"left" | b"right" | b"top" | b"bottom" => {
                if let Some(border) = self.current_border.as_mut() {
                    let edge_name: &'static str = match e.name().as_ref() {
                        b"left" => "left",
                        b"right" => "right",
                        b"top" => "top",
                        _ => "bottom",
                    };

                    let mut style: Option<BorderLineStyle> = None;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"style" {
                            if let Ok(v) = attr.unescape_value() {
                                style = str_to_border_style(&v);
                            }
                        }
                    }
                    // Color may be overwritten by a nested <color>
                    if let Some(st) = style {
                        set_border_edge(
                            border,
                            edge_name,
                            Some(BorderEdge {
                                style: st,
                                color: Color::Auto,
                            }),
                        );
                    }

                    self.current_border_edge = if is_empty { None } else { Some(edge_name) };
                }
            }
            b"color" => {
                let color = parse_color_attrs(e);
                if let (Some(border), Some(edge_name)) =
                    (self.current_border.as_mut(), self.current_border_edge)
                {
                    if let Some(edge) = get_border_edge_mut(border, edge_name) {
                        edge.color = color;
                    }
                } else if let Some(font) = self.current_font.as_mut() {
                    font.color = color;
                }
            }

            b"xf" if self.in_cell_xfs => {
                let mut num_fmt_id = 0u32;
                let mut font_id = 0u32;
                let mut fill_id = 0u32;
                let mut border_id = 0u32;
                for attr in e.attributes().flatten() {
                    let val = attr.unescape_value().ok().and_then(|s| s.parse().ok());
                    match attr.key.as_ref() {
                        b"numFmtId" => num_fmt_id = val.unwrap_or(0),
                        b"fontId" => font_id = val.unwrap_or(0),
                        b"fillId" => fill_id = val.unwrap_or(0),
                        b"borderId" => border_id = val.unwrap_or(0),
                        _ => {}
                    }
                }
                self.current_xf =
                    Some((num_fmt_id, font_id, fill_id, border_id, Alignment::default()));
                if is_empty {
                    self.finish_xf();
                }
            }

            b"alignment" => {
                if let Some((_, _, _, _, align)) = self.current_xf.as_mut() {
                    for attr in e.attributes().flatten() {
                        let val = match attr.unescape_value() {
                            Ok(v) => v,
                            Err(_) => continue,
                        };
                        match attr.key.as_ref() {
                            b"horizontal" => {
                                if let Some(h) = str_to_horizontal(&val) {
                                    align.horizontal = h;
                                }
                            }
                            b"vertical" => {
                                if let Some(v) = str_to_vertical(&val) {
                                    align.vertical = v;
                                }
                            }
                            b"wrapText" => {
                                align.wrap_text = val.as_ref() == "1";
                            }
                            b"indent" => {
                                align.indent = val.parse::<u8>().unwrap_or(0);
                            }
                            _ => {}
                        }
                    }
                }
            }

            _ => {}
        }
    }

    fn end_element(&mut self, name: &[u8]) {
        match name {
            b"font" => {
                if let Some(font) = self.current_font.take() {
                    self.fonts.push(font);
                }
            }
            b"fill" => {
                if self.in_fill {
                    let fill = if self.fill_is_solid {
                        FillStyle::Solid {
                            color: self.current_fill_color,
                        }
                    } else {
                        FillStyle::None
                    };
                    self.fills.push(fill);
                    self.in_fill = false;
                }
            }
            b"border" => {
                if let Some(border) = self.current_border.take() {
                    self.borders.push(border);
                }
                self.current_border_edge = None;
            }
            b"left" | b"right" | b"top" | b"bottom" => {
                self.current_border_edge = None;
            }
            b"xf" => {
                if self.in_cell_xfs {
                    self.finish_xf();
                }
            }
            b"cellXfs" => {
                self.in_cell_xfs = false;
            }
            _ => {}
        }
    }
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> XlsxResult<ParsedStyles> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut state = StyleParseState::default();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.start_element(&e, false),
            Ok(Event::Empty(e)) => state.start_element(&e, true),
            Ok(Event::End(e)) => state.end_element(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let mut cell_styles = state.cell_xfs;
    if cell_styles.is_empty() {
        cell_styles.push(Style::default());
    }

    Ok(ParsedStyles { cell_styles })
}

fn resolve_style(
    (num_fmt_id, font_id, fill_id, border_id, alignment): (u32, u32, u32, u32, Alignment),
    numfmts: &HashMap<u32, String>,
    fonts: &[FontStyle],
    fills: &[FillStyle],
    borders: &[BorderStyle],
) -> Style {
    let number_format = if num_fmt_id == 0 {
        NumberFormat::General
    } else if let Some(code) = numfmts.get(&num_fmt_id) {
        NumberFormat::Custom(code.clone())
    } else {
        NumberFormat::from_builtin_id(num_fmt_id)
    };

    Style {
        font: fonts.get(font_id as usize).cloned().unwrap_or_default(),
        fill: fills.get(fill_id as usize).cloned().unwrap_or_default(),
        border: borders.get(border_id as usize).cloned().unwrap_or_default(),
        alignment,
        number_format,
    }
}

fn parse_color_attrs(e: &quick_xml::events::BytesStart<'_>) -> Color {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"rgb" {
            if let Ok(v) = attr.unescape_value() {
                if let Some(color) = Color::from_hex(&v) {
                    return color;
                }
            }
        }
    }
    Color::Auto
}

fn str_to_border_style(s: &str) -> Option<BorderLineStyle> {
    match s {
        "thin" => Some(BorderLineStyle::Thin),
        "medium" => Some(BorderLineStyle::Medium),
        "thick" => Some(BorderLineStyle::Thick),
        "dashed" => Some(BorderLineStyle::Dashed),
        "dotted" => Some(BorderLineStyle::Dotted),
        "double" => Some(BorderLineStyle::Double),
        _ => None,
    }
}

fn str_to_horizontal(s: &str) -> Option<HorizontalAlignment> {
    match s {
        "general" => Some(HorizontalAlignment::General),
        "left" => Some(HorizontalAlignment::Left),
        "center" => Some(HorizontalAlignment::Center),
        "right" => Some(HorizontalAlignment::Right),
        "justify" => Some(HorizontalAlignment::Justify),
        _ => None,
    }
}

fn str_to_vertical(s: &str) -> Option<VerticalAlignment> {
    match s {
        "top" => Some(VerticalAlignment::Top),
        "center" => Some(VerticalAlignment::Center),
        "bottom" => Some(VerticalAlignment::Bottom),
        _ => None,
    }
}

fn get_border_edge_mut<'a>(border: &'a mut BorderStyle, edge: &str) -> Option<&'a mut BorderEdge> {
    match edge {
        "left" => border.left.as_mut(),
        "right" => border.right.as_mut(),
        "top" => border.top.as_mut(),
        "bottom" => border.bottom.as_mut(),
        _ => None,
    }
}

fn set_border_edge(border: &mut BorderStyle, edge: &str, val: Option<BorderEdge>) {
    match edge {
        "left" => border.left = val,
        "right" => border.right = val,
        "top" => border.top = val,
        "bottom" => border.bottom = val,
        _ => {}
    }
}
