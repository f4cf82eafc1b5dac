//! # sheetforge-engine
//!
//! The workbook-composition engine: a declarative JSON document describing
//! sheets, cells, ranges, tables and formatting is materialized into a
//! serialized XLSX buffer, optionally seeded from a template and optionally
//! fed by rows from an external source.
//!
//! The pipeline is a single linear pass per request:
//!
//! ```text
//! [load template?] -> per sheet: cells -> ranges -> tables -> formatting -> serialize
//! ```
//!
//! Each composition is stateless and self-contained; concurrent requests
//! need no coordination from this crate.
//!
//! ## Example
//!
//! ```rust
//! use sheetforge_engine::{compose, spec::WorkbookSpec};
//!
//! let doc: WorkbookSpec = serde_json::from_str(
//!     r#"{
//!         "sheets": [{
//!             "name": "Report",
//!             "cells": [{"address": "A1", "value": "Total", "style": {"font": {"bold": true}}}]
//!         }]
//!     }"#,
//! ).unwrap();
//!
//! let out = compose(&doc, None).unwrap();
//! assert_eq!(out.sheets_processed, 1);
//! assert!(!out.buffer.is_empty());
//! ```

pub mod compose;
pub mod error;
pub mod query;
pub mod resolve;
pub mod spec;
pub mod store;
pub mod style;
pub mod template;
pub mod writer;

pub use compose::{compose, Composed};
pub use error::{EngineError, Result};
pub use query::{check_query, fetch_rows, query_to_table, RowSource};
pub use resolve::resolve_address;
pub use store::TemplateStore;
pub use template::fill_template;

/// MIME type of composed output, re-exported for hosts building responses
pub use sheetforge_xlsx::XLSX_MIME_TYPE;
