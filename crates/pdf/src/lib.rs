use std::path::Path;

use log::{debug, warn};
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};
use parser::bars::{detect_header_bars, BarDetectorConfig};
use parser::layout::extract_page_spans;
use parser::table::{detect_tables, table_rows, TableDetectorConfig};

pub mod parser;
pub mod text;
pub mod types;

pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded datasheet PDF.
///
/// Constructed via [`Datasheet::from_bytes`] or [`Datasheet::open`]. The
/// body table and the header bars are computed on demand from the same
/// parsed document.
pub struct Datasheet {
    backend: LopdfBackend,
}

impl Datasheet {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        Ok(Datasheet {
            backend: LopdfBackend::load_bytes(bytes)?,
        })
    }

    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> usize {
        self.backend.page_count()
    }

    /// Page-concatenated body table. Empty when no page holds a table.
    pub fn body(&self, config: &TableDetectorConfig) -> Vec<RawRow> {
        extract_body(&self.backend, config)
    }

    /// Shaded header bars in document order, duplicates included.
    pub fn header_bars(&self, config: &BarDetectorConfig) -> Vec<HeaderCandidate> {
        detect_header_bars(&self.backend, config)
    }
}

/// Run table detection on every page and append the first table found on
/// each one. Pages without a table, or whose content cannot be read,
/// contribute nothing.
pub fn extract_body(backend: &dyn PdfBackend, config: &TableDetectorConfig) -> Vec<RawRow> {
    let mut body = Vec::new();

    for (page, page_id) in backend.pages() {
        let spans = match extract_page_spans(backend, page_id) {
            Ok(spans) => spans,
            Err(e) => {
                warn!("Skipping page {page}: {e}");
                continue;
            }
        };

        match detect_tables(&spans, config).first() {
            Some(table) => {
                let rows = table_rows(table);
                debug!(
                    "page {page}: table with {} row(s) x {} column(s)",
                    rows.len(),
                    table.columns.len()
                );
                body.extend(rows);
            }
            None => debug!("page {page}: no table"),
        }
    }

    body
}
