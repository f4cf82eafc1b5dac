//! XLSX reader
//!
//! Loads a workbook (typically an uploaded template) back into the core
//! model: sheet names in workbook order, cell values, and cell styles. That
//! is everything the template filler needs; structure the filler cannot
//! rewrite (charts, pivots, drawings) is not carried.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::{read_styles_xml, ParsedStyles};
use sheetforge_core::{CellAddress, CellValue, Style, Workbook, Worksheet};

/// Decode Excel's `_xHHHH_` escape sequences (e.g. `_x000D_` for CR)
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        // A full escape is _xHHHH_: 7 bytes
        if bytes[i] == b'_'
            && i + 6 < bytes.len()
            && (bytes[i + 1] == b'x' || bytes[i + 1] == b'X')
            && bytes[i + 6] == b'_'
        {
            let hex = &s[i + 2..i + 6];
            if let Ok(code) = u32::from_str_radix(hex, 16) {
                if let Some(c) = char::from_u32(code) {
                    result.push(c);
                    i += 7;
                    continue;
                }
            }
        }
        // Not an escape; copy the (possibly multi-byte) char
        let ch_len = s[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        result.push_str(&s[i..i + ch_len]);
        i += ch_len;
    }

    result
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file)
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        // Verify this is an XLSX file
        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        // Read shared strings (if present)
        let shared_strings = Self::read_shared_strings(&mut archive)?;

        // Read styles (if present)
        let parsed_styles = Self::read_styles(&mut archive)?;
        let cell_styles = parsed_styles.cell_styles;

        // Read workbook.xml to get sheet info
        let sheet_info = Self::read_workbook_xml(&mut archive)?;

        // Read workbook.xml.rels to get sheet paths
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        // Create workbook
        let mut workbook = Workbook::empty();

        // Read each worksheet
        for (name, r_id) in &sheet_info {
            if let Some(path) = sheet_paths.get(r_id) {
                let sheet_idx = workbook.add_worksheet_with_name(name)?;
                Self::read_worksheet(
                    &mut archive,
                    path,
                    workbook.worksheet_mut(sheet_idx).unwrap(),
                    &shared_strings,
                    &cell_styles,
                )?;
            } else {
                log::warn!("Sheet '{}' has no worksheet part; skipping", name);
            }
        }

        if workbook.is_empty() {
            return Err(XlsxError::InvalidFormat("Workbook has no sheets".into()));
        }

        Ok(workbook)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"t" if in_si => {
                        in_t = true;
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"t" => {
                        in_t = false;
                    }
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current_string.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<ParsedStyles> {
        let file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => {
                return Ok(ParsedStyles {
                    cell_styles: vec![Style::default()],
                })
            }
        };
        read_styles_xml(file)
    }

    /// Read workbook.xml to get sheet names and rIds
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let mut name = None;
                    let mut r_id = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"r:id" => {
                                r_id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let mut id = None;
                    let mut target = None;
                    let mut rel_type = None;

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => {
                                id = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Target" => {
                                target = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            b"Type" => {
                                rel_type = attr.unescape_value().ok().map(|s| s.to_string());
                            }
                            _ => {}
                        }
                    }

                    // Only include worksheet relationships
                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Target is relative to xl/ folder
                            let full_path = if let Some(stripped) = target.strip_prefix('/') {
                                stripped.to_string()
                            } else {
                                format!("xl/{}", target)
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read a worksheet from the archive
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        cell_styles: &[Style],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let reader = BufReader::new(file);
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.trim_text(true);

        let mut buf = Vec::new();

        // Current cell state
        let mut current_cell_ref: Option<String> = None;
        let mut current_cell_type: Option<String> = None;
        let mut current_cell_style: Option<u32> = None;
        let mut current_value: Option<String> = None;
        let mut current_formula: Option<String> = None;
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => {
                        in_cell = true;
                        current_value = None;
                        current_formula = None;

                        let (cell_ref, cell_type, cell_style) = Self::parse_cell_attrs(&e);
                        current_cell_ref = cell_ref;
                        current_cell_type = cell_type;
                        current_cell_style = cell_style;
                    }
                    b"v" if in_cell => {
                        in_value = true;
                    }
                    b"f" if in_cell => {
                        in_formula = true;
                    }
                    b"is" if in_cell => {
                        in_inline_str = true;
                    }
                    b"t" if in_inline_str => {
                        in_inline_text = true;
                    }
                    _ => {}
                },

                // A childless <c .../> never sees End(c); it carries a style
                // but no value. Process it on the spot.
                Ok(Event::Empty(e)) => {
                    if e.name().as_ref() == b"c" {
                        let (cell_ref, cell_type, cell_style) = Self::parse_cell_attrs(&e);
                        if let Some(cell_ref) = cell_ref {
                            Self::process_cell(
                                worksheet,
                                &cell_ref,
                                cell_type.as_deref(),
                                None,
                                None,
                                cell_style,
                                shared_strings,
                                cell_styles,
                            )?;
                        }
                    }
                }

                Ok(Event::Text(e)) => {
                    if let Ok(text) = e.unescape() {
                        if in_value || in_inline_text {
                            current_value
                                .get_or_insert_with(String::new)
                                .push_str(&text);
                        } else if in_formula {
                            current_formula
                                .get_or_insert_with(String::new)
                                .push_str(&text);
                        }
                    }
                }

                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(cell_ref) = current_cell_ref.take() {
                            Self::process_cell(
                                worksheet,
                                &cell_ref,
                                current_cell_type.as_deref(),
                                current_value.as_deref(),
                                current_formula.as_deref(),
                                current_cell_style,
                                shared_strings,
                                cell_styles,
                            )?;
                        }
                        in_cell = false;
                        current_value = None;
                        current_formula = None;
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"is" => in_inline_str = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },

                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// Pull r/t/s off a `<c>` element
    fn parse_cell_attrs(
        e: &quick_xml::events::BytesStart<'_>,
    ) -> (Option<String>, Option<String>, Option<u32>) {
        let mut cell_ref = None;
        let mut cell_type = None;
        let mut cell_style = None;

        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"r" => {
                    cell_ref = attr.unescape_value().ok().map(|s| s.to_string());
                }
                b"t" => {
                    cell_type = attr.unescape_value().ok().map(|s| s.to_string());
                }
                b"s" => {
                    cell_style = attr
                        .unescape_value()
                        .ok()
                        .and_then(|s| s.parse::<u32>().ok());
                }
                _ => {}
            }
        }

        (cell_ref, cell_type, cell_style)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_cell(
        worksheet: &mut Worksheet,
        cell_ref: &str,
        cell_type: Option<&str>,
        value: Option<&str>,
        formula: Option<&str>,
        style_idx: Option<u32>,
        shared_strings: &[String],
        styles: &[Style],
    ) -> XlsxResult<()> {
        let addr = CellAddress::parse(cell_ref).map_err(|e| {
            XlsxError::Parse(format!("Invalid cell reference '{}': {}", cell_ref, e))
        })?;

        if let Some(f) = formula {
            // Parse the cached result (if any) from the <v> element
            let result = value.and_then(|v| match cell_type {
                Some("b") => Some(CellValue::Boolean(
                    v == "1" || v.eq_ignore_ascii_case("true"),
                )),
                Some("s") => {
                    let idx: usize = v.parse().ok()?;
                    shared_strings
                        .get(idx)
                        .map(|s| CellValue::String(s.clone()))
                }
                Some("str") | Some("inlineStr") => Some(CellValue::String(v.to_string())),
                None | Some("n") => v.parse::<f64>().ok().map(CellValue::Number),
                Some(_) => Some(CellValue::String(v.to_string())),
            });

            worksheet.set_cell_formula_at(addr.row, addr.col, f, result)?;
        } else if let Some(value) = value {
            let cell_value = match cell_type {
                // Shared string
                Some("s") => {
                    let idx: usize = value.parse().map_err(|_| {
                        XlsxError::Parse(format!("Invalid shared string index: {}", value))
                    })?;
                    let s = shared_strings.get(idx).ok_or_else(|| {
                        XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
                    })?;
                    CellValue::String(s.clone())
                }

                // Boolean
                Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),

                // Inline or explicit string - decode Excel escape sequences
                Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(value)),

                // Number (default type or explicit "n")
                None | Some("n") => match value.parse::<f64>() {
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::String(value.to_string()),
                },

                // Unknown type - treat as string
                Some(_) => CellValue::String(value.to_string()),
            };

            worksheet.set_cell_value_at(addr.row, addr.col, cell_value)?;
        }

        // Apply style (if any)
        if let Some(s) = style_idx {
            if s != 0 {
                match styles.get(s as usize) {
                    Some(style) => {
                        worksheet.set_cell_style_at(addr.row, addr.col, style)?;
                    }
                    None => {
                        log::warn!("Cell {} references missing style index {}", cell_ref, s);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_excel_escapes_carriage_return() {
        assert_eq!(decode_excel_escapes("a_x000D_b"), "a\rb");
    }

    #[test]
    fn test_decode_excel_escapes_no_escapes() {
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
    }

    #[test]
    fn test_decode_excel_escapes_partial_sequence() {
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("_xZZZZ_"), "_xZZZZ_");
    }
}
