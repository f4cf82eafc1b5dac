//! Template storage
//!
//! Reads named template files from a fixed directory. Peer upload/delete
//! operations manage the directory's contents; this store only performs
//! complete, short-lived reads into memory, so it needs no locking of its
//! own.

use std::path::{Path, PathBuf};

use sheetforge_core::Workbook;
use sheetforge_xlsx::{XlsxError, XlsxReader};

use crate::error::{EngineError, Result};

/// A read-only view over the template directory
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Create a store rooted at the given directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory templates are read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a named template into memory
    ///
    /// Names are plain file names; anything that would escape the template
    /// directory is rejected. A missing file is a not-found failure, not a
    /// crash.
    pub fn load(&self, name: &str) -> Result<Workbook> {
        let name = name.trim();
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
        {
            return Err(EngineError::Validation(format!(
                "invalid template name '{}'",
                name
            )));
        }

        let mut path = self.dir.join(name);
        if !path.exists() && path.extension().is_none() {
            path.set_extension("xlsx");
        }

        if !path.exists() {
            return Err(EngineError::TemplateNotFound(name.to_string()));
        }

        log::debug!("Loading template '{}'", name);
        XlsxReader::read_file(&path).map_err(|e| match e {
            XlsxError::Io(ref io) if io.kind() == std::io::ErrorKind::NotFound => {
                EngineError::TemplateNotFound(name.to_string())
            }
            other => EngineError::Xlsx(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetforge_xlsx::XlsxWriter;

    fn store_with_template(name: &str) -> (tempfile::TempDir, TemplateStore) {
        let dir = tempfile::tempdir().unwrap();

        let mut wb = Workbook::empty();
        wb.add_worksheet_with_name("Invoice").unwrap();
        wb.worksheet_mut(0)
            .unwrap()
            .set_cell_value("A1", "Customer: {{customer}}")
            .unwrap();
        XlsxWriter::write_file(&wb, dir.path().join(name)).unwrap();

        let store = TemplateStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_load_existing_template() {
        let (_dir, store) = store_with_template("invoice.xlsx");

        let wb = store.load("invoice.xlsx").unwrap();
        assert_eq!(wb.worksheet(0).unwrap().name(), "Invoice");
    }

    #[test]
    fn test_load_appends_extension() {
        let (_dir, store) = store_with_template("invoice.xlsx");
        assert!(store.load("invoice").is_ok());
    }

    #[test]
    fn test_missing_template_is_not_found() {
        let (_dir, store) = store_with_template("invoice.xlsx");
        assert!(matches!(
            store.load("other.xlsx"),
            Err(EngineError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_path_escapes_are_rejected() {
        let (_dir, store) = store_with_template("invoice.xlsx");

        for name in ["../invoice.xlsx", "a/b.xlsx", "a\\b.xlsx", ""] {
            assert!(
                matches!(store.load(name), Err(EngineError::Validation(_))),
                "name '{}' should be rejected",
                name
            );
        }
    }
}
