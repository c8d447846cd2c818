use thiserror::Error;

/// Unified error type for blocktrans-core
///
/// Document-level variants abort a run with no output. Translation and
/// render variants are produced per block; the pipeline recovers from them
/// and only counts them in the report.
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Document Errors (fatal)
    // ==========================================================================
    /// Input is not a readable PDF
    #[error("failed to open PDF: {0}")]
    DocumentOpen(String),

    /// Requested page range does not fit the document
    #[error("invalid page range {start}..={end} (document has {total} pages)")]
    PageRange { start: usize, end: usize, total: usize },

    /// Failed to extract text from a PDF page
    #[error("failed to extract text from page {page}: {reason}")]
    PdfTextExtraction { page: usize, reason: String },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    /// The run was cancelled before all blocks were processed
    #[error("translation cancelled")]
    Cancelled,

    // ==========================================================================
    // Block Errors (recovered per block)
    // ==========================================================================
    /// A block could not be drawn on its page
    #[error("failed to render block on page {page}: {reason}")]
    Render { page: usize, reason: String },

    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// Unsupported language for translation
    #[error("unsupported language for translation: {0}")]
    TranslationUnsupportedLanguage(String),

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// Maximum retry attempts exceeded for translation
    #[error("translation failed after maximum retries")]
    TranslationMaxRetriesExceeded,

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error concerns a single block rather than the whole document.
    pub const fn is_block_level(&self) -> bool {
        matches!(
            self,
            Self::Render { .. }
                | Self::TranslationRequest(_)
                | Self::TranslationInvalidResponse(_)
                | Self::TranslationRateLimited { .. }
                | Self::TranslationUnsupportedLanguage(_)
                | Self::TranslationTimeout
                | Self::TranslationMaxRetriesExceeded
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_message() {
        let err = Error::PageRange { start: 4, end: 9, total: 3 };
        assert_eq!(err.to_string(), "invalid page range 4..=9 (document has 3 pages)");
    }

    #[test]
    fn test_rate_limit_message() {
        let err = Error::TranslationRateLimited { retry_after: Some(7) };
        assert_eq!(err.to_string(), "translation rate limited, retry after 7 seconds");

        let err = Error::TranslationRateLimited { retry_after: None };
        assert_eq!(err.to_string(), "translation rate limited");
    }

    #[test]
    fn test_block_level_classification() {
        assert!(Error::TranslationTimeout.is_block_level());
        assert!(Error::Render { page: 0, reason: "bad bbox".into() }.is_block_level());
        assert!(!Error::DocumentOpen("garbage".into()).is_block_level());
        assert!(!Error::Cancelled.is_block_level());
    }
}
