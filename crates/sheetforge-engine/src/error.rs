//! Engine error taxonomy

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the composition engine
///
/// Style application failures are deliberately absent: they degrade to
/// warnings and never abort a write.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The input document is malformed; detected before any workbook
    /// mutation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A named template does not exist in the template directory
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// A write failed while composing a sheet; carries the sheet and the
    /// offending address or construct
    #[error("Processing failed on sheet '{sheet}': {detail}")]
    Processing {
        /// Sheet being composed when the failure happened
        sheet: String,
        /// What went wrong, including the offending address where relevant
        detail: String,
    },

    /// The row source reported a failure
    #[error("Database error: {0}")]
    Database(String),

    /// Document model error surfaced while composing
    #[error(transparent)]
    Core(#[from] sheetforge_core::Error),

    /// Container serialization error
    #[error(transparent)]
    Xlsx(#[from] sheetforge_xlsx::XlsxError),
}

impl EngineError {
    /// Shorthand for a processing failure on a sheet
    pub fn processing<S: Into<String>, D: Into<String>>(sheet: S, detail: D) -> Self {
        EngineError::Processing {
            sheet: sheet.into(),
            detail: detail.into(),
        }
    }
}
