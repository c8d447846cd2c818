use std::path::Path;
use std::sync::Arc;

use mupdf::Document as MuDocument;

use crate::error::{Error, Result};

/// MIME type passed to mupdf so it always picks the PDF handler.
const PDF_MAGIC: &str = "application/pdf";

/// A PDF loaded into memory, owned by one translation run.
///
/// Only the raw bytes are kept; mupdf handles (for reading) and lopdf
/// documents (for writing) are opened on demand so the type stays `Send`.
#[derive(Clone)]
pub struct PdfDocument {
    bytes: Arc<Vec<u8>>,
    page_count: usize,
}

impl PdfDocument {
    /// Open a PDF from bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();

        if !contains_pdf_header(&bytes) {
            return Err(Error::DocumentOpen("input is not a PDF file".to_string()));
        }

        let doc = MuDocument::from_bytes(&bytes, PDF_MAGIC)
            .map_err(|e| Error::DocumentOpen(format!("Failed to parse PDF: {e}")))?;

        let page_count = doc
            .page_count()
            .map_err(|e| Error::DocumentOpen(format!("Failed to get page count: {e}")))?;

        Ok(Self {
            bytes: Arc::new(bytes),
            page_count: usize::try_from(page_count).unwrap_or(0),
        })
    }

    /// Open a PDF from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| {
            Error::DocumentOpen(format!("Failed to read file {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_bytes(bytes)
    }

    /// Get number of pages
    pub const fn page_count(&self) -> usize {
        self.page_count
    }

    /// Get raw PDF bytes as a slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Open a read handle for text extraction.
    pub(crate) fn open_document(&self) -> Result<MuDocument> {
        MuDocument::from_bytes(&self.bytes, PDF_MAGIC)
            .map_err(|e| Error::DocumentOpen(format!("Failed to open document: {e}")))
    }

    /// Parse the document for editing.
    pub(crate) fn open_editable(&self) -> Result<lopdf::Document> {
        lopdf::Document::load_mem(&self.bytes)
            .map_err(|e| Error::DocumentOpen(format!("Failed to load PDF for editing: {e}")))
    }
}

/// PDF readers accept a header anywhere in the first kilobyte.
fn contains_pdf_header(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|w| w == b"%PDF-")
}

impl Clone for PdfDocument {
    /// O(1): only the `Arc` around the bytes is cloned.
    fn clone(&self) -> Self {
        Self {
            bytes: Arc::clone(&self.bytes),
            page_count: self.page_count,
        }
    }
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("page_count", &self.page_count)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}
