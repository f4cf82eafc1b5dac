//! # sheetforge-xlsx
//!
//! XLSX (Office Open XML) reader and writer for sheetforge.
//!
//! The writer serializes a composed [`sheetforge_core::Workbook`] into the
//! standard OOXML container, including style tables and named table parts.
//! The reader loads template workbooks back into the core model (values and
//! cell styles) so the template filler can rewrite them.

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;

/// MIME type of the produced container
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
