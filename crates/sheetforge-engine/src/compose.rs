//! The sheet/workbook composer
//!
//! A linear pipeline with no branching back:
//! load template if requested, then for each sheet fetch-or-create by name,
//! apply cells, ranges, tables and sheet formatting, then serialize.

use sheetforge_core::{PageOrientation, Workbook, Worksheet};
use sheetforge_xlsx::XlsxWriter;

use crate::error::{EngineError, Result};
use crate::spec::{FormattingSpec, WorkbookSpec};
use crate::store::TemplateStore;
use crate::writer::{write_cell, write_range, write_table};

/// Auto-width: width for a column with no rendered content
const AUTO_WIDTH_DEFAULT: f64 = 10.0;
/// Auto-width: padding added to the longest rendered value
const AUTO_WIDTH_PADDING: f64 = 2.0;
/// Auto-width: hard cap
const AUTO_WIDTH_MAX: f64 = 50.0;

/// The composer's output: a serialized container plus the sheet count for
/// the caller's logging
#[derive(Debug)]
pub struct Composed {
    /// Serialized OOXML buffer
    pub buffer: Vec<u8>,
    /// Number of sheets composed
    pub sheets_processed: usize,
}

/// Compose a workbook document into a serialized buffer
///
/// Validation failures are raised before any workbook mutation. A
/// processing failure aborts composition of the in-progress sheet and
/// surfaces as a single structured error naming the sheet and the
/// offending address.
pub fn compose(spec: &WorkbookSpec, templates: Option<&TemplateStore>) -> Result<Composed> {
    validate(spec)?;

    let mut workbook = match &spec.template {
        Some(name) => match templates {
            Some(store) => store.load(name)?,
            None => return Err(EngineError::TemplateNotFound(name.clone())),
        },
        None => Workbook::empty(),
    };

    let mut sheets_processed = 0;

    for sheet_spec in &spec.sheets {
        // An unusable sheet name is a malformed document, not a write error
        let sheet = workbook
            .sheet_or_create(&sheet_spec.name)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        if let Some(cells) = &sheet_spec.cells {
            for cell in cells {
                write_cell(sheet, cell)?;
            }
        }

        if let Some(ranges) = &sheet_spec.ranges {
            for range in ranges {
                write_range(sheet, range)?;
            }
        }

        if let Some(tables) = &sheet_spec.tables {
            for table in tables {
                write_table(sheet, table)?;
            }
        }

        if let Some(formatting) = &sheet_spec.formatting {
            apply_formatting(sheet, formatting);
        }

        sheets_processed += 1;
        log::debug!(
            "Composed sheet '{}' ({} cells)",
            sheet.name(),
            sheet.cell_count()
        );
    }

    let buffer = XlsxWriter::write_to_buffer(&workbook)?;

    Ok(Composed {
        buffer,
        sheets_processed,
    })
}

/// Document checks that run before any workbook mutation
fn validate(spec: &WorkbookSpec) -> Result<()> {
    if spec.sheets.is_empty() {
        return Err(EngineError::Validation(
            "document has no sheets".to_string(),
        ));
    }

    for sheet in &spec.sheets {
        if sheet.name.trim().is_empty() {
            return Err(EngineError::Validation(
                "sheet name cannot be empty".to_string(),
            ));
        }

        if let Some(tables) = &sheet.tables {
            for (i, table) in tables.iter().enumerate() {
                if table.rows.is_empty() {
                    return Err(EngineError::Validation(format!(
                        "sheet '{}': table {} has no rows",
                        sheet.name, i
                    )));
                }
                if table.rows[0].is_empty() {
                    return Err(EngineError::Validation(format!(
                        "sheet '{}': table {} first row has no keys",
                        sheet.name, i
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Apply sheet-level formatting: auto width, freeze panes, page setup
fn apply_formatting(sheet: &mut Worksheet, spec: &FormattingSpec) {
    if spec.auto_width.unwrap_or(false) {
        apply_auto_width(sheet);
    }

    if spec.freeze_rows.is_some() || spec.freeze_cols.is_some() {
        sheet.set_freeze_panes(
            spec.freeze_rows.unwrap_or(0),
            spec.freeze_cols.unwrap_or(0),
        );
    }

    if let Some(page) = &spec.page_setup {
        let setup = sheet.page_setup_mut();

        if let Some(orientation) = page.orientation.as_deref() {
            setup.orientation = match orientation {
                "landscape" => PageOrientation::Landscape,
                "portrait" => PageOrientation::Portrait,
                other => {
                    log::warn!("Unknown orientation '{}', using portrait", other);
                    PageOrientation::Portrait
                }
            };
        }
        if let Some(paper_size) = page.paper_size {
            setup.paper_size = paper_size;
        }
        if let Some(margins) = &page.margins {
            if let Some(top) = margins.top {
                setup.top_margin = top;
            }
            if let Some(bottom) = margins.bottom {
                setup.bottom_margin = bottom;
            }
            if let Some(left) = margins.left {
                setup.left_margin = left;
            }
            if let Some(right) = margins.right {
                setup.right_margin = right;
            }
        }
    }
}

/// Scan every cell in every used column and size the column to its longest
/// rendered value plus padding, capped
fn apply_auto_width(sheet: &mut Worksheet) {
    let mut max_lens: std::collections::BTreeMap<u16, usize> = std::collections::BTreeMap::new();

    for (_row, col, cell) in sheet.iter_cells() {
        let len = cell.value.rendered().chars().count();
        let entry = max_lens.entry(col).or_insert(0);
        if len > *entry {
            *entry = len;
        }
    }

    for (col, max_len) in max_lens {
        let width = if max_len == 0 {
            AUTO_WIDTH_DEFAULT
        } else {
            (max_len as f64 + AUTO_WIDTH_PADDING).min(AUTO_WIDTH_MAX)
        };
        sheet.set_column_width(col, width);
    }
}
