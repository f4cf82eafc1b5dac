//! XLSX writer

use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::XlsxStyleTable;
use sheetforge_core::{CellAddress, CellValue, PageOrientation, Workbook, Worksheet};

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a file path
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file)
    }

    /// Serialize a workbook into an in-memory buffer
    pub fn write_to_buffer(workbook: &Workbook) -> XlsxResult<Vec<u8>> {
        let mut buf = Vec::new();
        Self::write(workbook, std::io::Cursor::new(&mut buf))?;
        Ok(buf)
    }

    /// Write a workbook to a writer
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<()> {
        let mut zip = zip::ZipWriter::new(writer);

        // Build a workbook-wide style table.
        let style_table = XlsxStyleTable::build(workbook);

        // Assign global ids to every named table, per sheet.
        // table_ids[sheet_index] holds (global_id, table_index_in_sheet).
        let mut table_ids: Vec<Vec<u32>> = Vec::with_capacity(workbook.sheet_count());
        let mut next_table_id: u32 = 1;
        for sheet in workbook.worksheets() {
            let ids: Vec<u32> = sheet
                .tables()
                .iter()
                .map(|_| {
                    let id = next_table_id;
                    next_table_id += 1;
                    id
                })
                .collect();
            table_ids.push(ids);
        }

        // Write [Content_Types].xml
        Self::write_content_types(&mut zip, workbook, &table_ids)?;

        // Write _rels/.rels
        Self::write_root_rels(&mut zip)?;

        // Write xl/workbook.xml
        Self::write_workbook_xml(&mut zip, workbook)?;

        // Write xl/_rels/workbook.xml.rels
        Self::write_workbook_rels(&mut zip, workbook)?;

        // Write xl/styles.xml
        Self::write_styles_xml(&mut zip, &style_table)?;

        // Write worksheets, their relationships, and table parts
        for (i, sheet) in workbook.worksheets().enumerate() {
            Self::write_worksheet(&mut zip, workbook, i, &style_table, &table_ids[i])?;

            if !sheet.tables().is_empty() {
                Self::write_worksheet_rels(&mut zip, i, &table_ids[i])?;
                for (t, table) in sheet.tables().iter().enumerate() {
                    Self::write_table_part(&mut zip, table, table_ids[i][t])?;
                }
            }
        }

        zip.finish()?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
        table_ids: &[Vec<u32>],
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        // Add an override for each worksheet
        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        // Add an override for each named table part
        for id in table_ids.iter().flatten() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/tables/table{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#,
                id
            ));
        }

        content.push_str("\n</Types>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                Self::escape_xml(sheet.name()),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        // Styles relationship
        let styles_rid = workbook.sheet_count() + 1;
        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            styles_rid
        ));

        content.push_str(
            r#"
</Relationships>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_styles_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        style_table: &XlsxStyleTable,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/styles.xml", options)?;
        let xml = style_table.to_styles_xml();
        zip.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
        index: usize,
        style_table: &XlsxStyleTable,
        table_ids: &[u32],
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;

        let sheet = workbook
            .worksheet(index)
            .ok_or_else(|| XlsxError::InvalidFormat("Sheet not found".into()))?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        Self::write_sheet_views(&mut content, sheet);
        Self::write_cols(&mut content, sheet);

        content.push_str("\n    <sheetData>");

        // Write cell data (sparse, row-major)
        let mut current_row: Option<u32> = None;
        for (row, col, cell) in sheet.iter_cells() {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let addr = CellAddress::new(row, col);
            let cell_ref = addr.to_a1_string();

            let xf_id = style_table.xf_id_for(index, cell.style_index);
            let style_attr = if xf_id != 0 {
                format!(" s=\"{}\"", xf_id)
            } else {
                String::new()
            };

            match &cell.value {
                CellValue::Number(n) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{}><v>{}</v></c>",
                        cell_ref, style_attr, n
                    ));
                }
                CellValue::String(s) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"inlineStr\"><is><t>{}</t></is></c>",
                        cell_ref,
                        style_attr,
                        Self::escape_xml(s)
                    ));
                }
                CellValue::Boolean(b) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                        cell_ref,
                        style_attr,
                        if *b { 1 } else { 0 }
                    ));
                }
                CellValue::Formula { text, result } => {
                    let formula_text = text.strip_prefix('=').unwrap_or(text.as_str());

                    // The precomputed result rides along in <v>; consumers
                    // show it without recalculating.
                    let (type_attr, value_xml) = match result.as_deref() {
                        Some(CellValue::Number(n)) => (String::new(), format!("<v>{}</v>", n)),
                        Some(CellValue::Boolean(b)) => (
                            " t=\"b\"".to_string(),
                            format!("<v>{}</v>", if *b { 1 } else { 0 }),
                        ),
                        Some(other) => {
                            let s = other.rendered();
                            if s.is_empty() {
                                (String::new(), String::new())
                            } else {
                                (
                                    " t=\"str\"".to_string(),
                                    format!("<v>{}</v>", Self::escape_xml(&s)),
                                )
                            }
                        }
                        None => (String::new(), String::new()),
                    };

                    content.push_str(&format!(
                        "\n            <c r=\"{}\"{}{}><f>{}</f>{}</c>",
                        cell_ref,
                        style_attr,
                        type_attr,
                        Self::escape_xml(formula_text),
                        value_xml
                    ));
                }
                CellValue::Empty => {
                    // Preserve style-only cells
                    if xf_id != 0 {
                        content.push_str(&format!(
                            "\n            <c r=\"{}\"{} />",
                            cell_ref, style_attr
                        ));
                    }
                }
            }
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>");

        Self::write_page_setup(&mut content, sheet);

        // Reference table parts (if any)
        if !table_ids.is_empty() {
            content.push_str(&format!(
                "\n    <tableParts count=\"{}\">",
                table_ids.len()
            ));
            for (t, _) in table_ids.iter().enumerate() {
                content.push_str(&format!("\n        <tablePart r:id=\"rId{}\"/>", t + 1));
            }
            content.push_str("\n    </tableParts>");
        }

        content.push_str("\n</worksheet>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_sheet_views(content: &mut String, sheet: &Worksheet) {
        let Some(freeze) = sheet.freeze_panes() else {
            return;
        };

        let top_left = CellAddress::new(freeze.row, freeze.col).to_a1_string();
        let active_pane = match (freeze.col > 0, freeze.row > 0) {
            (true, true) => "bottomRight",
            (true, false) => "topRight",
            _ => "bottomLeft",
        };

        let mut pane = String::from("<pane");
        if freeze.col > 0 {
            pane.push_str(&format!(" xSplit=\"{}\"", freeze.col));
        }
        if freeze.row > 0 {
            pane.push_str(&format!(" ySplit=\"{}\"", freeze.row));
        }
        pane.push_str(&format!(
            " topLeftCell=\"{}\" activePane=\"{}\" state=\"frozen\"/>",
            top_left, active_pane
        ));

        content.push_str(&format!(
            "\n    <sheetViews>\n        <sheetView workbookViewId=\"0\">{}</sheetView>\n    </sheetViews>",
            pane
        ));
    }

    fn write_cols(content: &mut String, sheet: &Worksheet) {
        let widths = sheet.custom_column_widths();
        if widths.is_empty() {
            return;
        }

        content.push_str("\n    <cols>");
        for (&col, &width) in widths {
            content.push_str(&format!(
                "\n        <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                col + 1,
                col + 1,
                width
            ));
        }
        content.push_str("\n    </cols>");
    }

    fn write_page_setup(content: &mut String, sheet: &Worksheet) {
        let setup = sheet.page_setup();

        content.push_str(&format!(
            "\n    <pageMargins left=\"{}\" right=\"{}\" top=\"{}\" bottom=\"{}\" header=\"{}\" footer=\"{}\"/>",
            setup.left_margin,
            setup.right_margin,
            setup.top_margin,
            setup.bottom_margin,
            setup.header_margin,
            setup.footer_margin
        ));

        let orientation = match setup.orientation {
            PageOrientation::Portrait => "portrait",
            PageOrientation::Landscape => "landscape",
        };
        content.push_str(&format!(
            "\n    <pageSetup paperSize=\"{}\" orientation=\"{}\"/>",
            setup.paper_size, orientation
        ));
    }

    /// Write worksheet relationships file referencing the sheet's table parts
    fn write_worksheet_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_index: usize,
        table_ids: &[u32],
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(
            format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_index + 1),
            options,
        )?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for (t, id) in table_ids.iter().enumerate() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table{}.xml"/>"#,
                t + 1,
                id
            ));
        }

        content.push_str(
            r#"
</Relationships>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    /// Write a table part (xl/tables/tableN.xml) for a named table
    fn write_table_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        table: &sheetforge_core::SheetTable,
        id: u32,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/tables/table{}.xml", id), options)?;

        let ref_str = table.range.to_a1_string();
        let name = Self::escape_xml(table.name());

        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="{id}" name="{name}" displayName="{name}" ref="{ref_str}" totalsRowShown="0">
    <autoFilter ref="{ref_str}"/>
    <tableColumns count="{}">"#,
            table.columns.len()
        );

        for (i, column) in table.columns.iter().enumerate() {
            content.push_str(&format!(
                "\n        <tableColumn id=\"{}\" name=\"{}\"/>",
                i + 1,
                Self::escape_xml(column)
            ));
        }

        content.push_str(
            r#"
    </tableColumns>
    <tableStyleInfo name="TableStyleMedium2" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="0"/>
</table>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}
