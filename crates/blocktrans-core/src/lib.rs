//! Block Translator Core Library
//!
//! This library provides the core functionality for translating the text
//! blocks of a PDF in place:
//! - PDF text block extraction (mupdf)
//! - Translation via Google or OpenAI-compatible APIs, memoized in memory
//! - Overlay rendering that covers each block and draws its translation (lopdf)

pub mod cache;
pub mod config;
pub mod error;
pub mod pdf;
pub mod translator;
pub mod util;

pub use config::{
    AppConfig, Backend, Lang, LanguageOption, LayoutMode, TextColor, TranslatorConfig,
    source_languages, target_languages, DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG,
};
pub use error::{Error, Result};
pub use pdf::{
    BoundingBox, OverlayOptions, PageBlocks, PageRange, PdfDocument, PdfOverlay, StandardFont,
    TextBlock,
};
pub use translator::{BlockOutcome, BlockTranslator, Translator, create_translator};
pub use cache::{TranslationCache, CacheKey};
pub use util::output_filename;

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Callback receiving progress after each processed block.
pub type ProgressSink = Box<dyn Fn(Progress) + Send + Sync>;

/// Progress of a run, counted in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Page the last processed block belongs to (0-indexed)
    pub page: usize,
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Fraction done, in `[0.0, 1.0]`. A run without blocks is complete.
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.completed.min(self.total) as f64) / (self.total as f64)
        }
    }
}

/// Per-run parameters, passed explicitly by each frontend.
pub struct TranslateJob {
    /// Pages to translate; `None` means every page
    pub range: Option<PageRange>,
    pub source_lang: Lang,
    pub target_lang: Lang,
    pub progress: Option<ProgressSink>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl TranslateJob {
    /// A job over every page using the configured languages.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            range: None,
            source_lang: config.source_lang.clone(),
            target_lang: config.target_lang.clone(),
            progress: None,
            cancel: None,
        }
    }

    #[must_use]
    pub const fn with_range(mut self, range: PageRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_languages(mut self, source: Lang, target: Lang) -> Self {
        self.source_lang = source;
        self.target_lang = target;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, sink: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(sink));
        self
    }

    /// Stop the run before the next block once `flag` is set.
    #[must_use]
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn report_progress(&self, progress: Progress) {
        if let Some(ref sink) = self.progress {
            sink(progress);
        }
    }
}

/// What a run did to each block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    pub pages_processed: usize,
    pub blocks_total: usize,
    pub translated: usize,
    /// Translation failed; source text drawn instead
    pub passthrough: usize,
    pub skipped_empty: usize,
    pub render_failed: usize,
    /// Drawn with `?` for characters the overlay font cannot show
    pub lossy: usize,
}

/// Output of a successful run.
#[derive(Debug, Clone)]
pub struct TranslatedDocument {
    pub bytes: Vec<u8>,
    pub report: TranslationReport,
}

/// A document ready for translation: blocks extracted, editor parsed.
///
/// Building one is blocking mupdf and lopdf work; async callers should run
/// [`PreparedDocument::prepare`] on a blocking thread.
pub struct PreparedDocument {
    range: PageRange,
    pages: Vec<PageBlocks>,
    editor: PdfOverlay,
}

impl PreparedDocument {
    /// Validate `range` (`None` = every page), extract its blocks and open the
    /// document for editing. The overlay layer is named after `target`.
    pub fn prepare(
        doc: &PdfDocument,
        config: &AppConfig,
        range: Option<PageRange>,
        target: &Lang,
    ) -> Result<Self> {
        let range = match range {
            Some(range) => range.validate(doc.page_count())?,
            None => PageRange::all(doc.page_count())?,
        };

        let pages = pdf::TextExtractor::new(doc)
            .with_dehyphenate(config.dehyphenate)
            .extract_range(range)?;

        let options = OverlayOptions::from_config(config, target);
        let editor = PdfOverlay::new(doc.open_editable()?, options);

        Ok(Self { range, pages, editor })
    }

    /// Like [`PreparedDocument::prepare`], with blocks extracted elsewhere.
    ///
    /// Every page must exist in `doc`; pages are processed in the given order.
    pub fn from_blocks(
        doc: &PdfDocument,
        config: &AppConfig,
        pages: Vec<PageBlocks>,
        target: &Lang,
    ) -> Result<Self> {
        for page in &pages {
            PageRange::single(page.page).validate(doc.page_count())?;
        }

        let range = match (pages.iter().map(|p| p.page).min(), pages.iter().map(|p| p.page).max()) {
            (Some(first), Some(last)) => PageRange::new(first, last),
            _ => PageRange::all(doc.page_count())?,
        };

        let options = OverlayOptions::from_config(config, target);
        let editor = PdfOverlay::new(doc.open_editable()?, options);

        Ok(Self { range, pages, editor })
    }

    pub const fn range(&self) -> PageRange {
        self.range
    }

    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }
}

/// A document with every overlay applied, waiting to be serialized.
pub struct OverlaidDocument {
    editor: PdfOverlay,
    report: TranslationReport,
}

impl OverlaidDocument {
    pub const fn report(&self) -> &TranslationReport {
        &self.report
    }

    /// Compress and serialize. Blocking.
    pub fn save(self) -> Result<TranslatedDocument> {
        let bytes = self.editor.save()?;
        Ok(TranslatedDocument {
            bytes,
            report: self.report,
        })
    }
}

/// High-level PDF translator that combines all components
pub struct PdfTranslator {
    blocks: BlockTranslator,
    config: AppConfig,
}

impl PdfTranslator {
    /// Create a new PDF translator with the given configuration
    pub fn new(config: AppConfig) -> Result<Self> {
        let cache = TranslationCache::new(&config.cache);
        Self::with_cache(config, cache)
    }

    /// Create with a shared cache (for cache sharing across instances)
    pub fn with_cache(config: AppConfig, cache: TranslationCache) -> Result<Self> {
        config.validate()?;
        let translator = create_translator(&config.translator)?;

        Ok(Self {
            blocks: BlockTranslator::new(translator, cache),
            config,
        })
    }

    /// Create with a custom translator
    pub fn with_translator(translator: Arc<dyn Translator>, config: AppConfig) -> Result<Self> {
        config.validate()?;
        let cache = TranslationCache::new(&config.cache);

        Ok(Self {
            blocks: BlockTranslator::new(translator, cache),
            config,
        })
    }

    /// Reject a job whose languages the backend cannot translate or the
    /// overlay cannot draw. Makes no network calls.
    pub fn check_job(&self, job: &TranslateJob) -> Result<()> {
        config::check_target_lang(&job.target_lang)?;
        self.blocks
            .translator()
            .check_languages(&job.source_lang, &job.target_lang)
    }

    /// Translate the blocks of every page in the job's range and overlay
    /// the results on a copy of the document.
    ///
    /// Block-level failures are recovered and counted in the report. A bad
    /// range or language pair, an unreadable page, cancellation or a save
    /// failure abort the run without output.
    ///
    /// Extraction and saving block the calling thread; see
    /// [`PreparedDocument`] to run them elsewhere.
    pub async fn translate_document(
        &self,
        doc: &PdfDocument,
        job: &TranslateJob,
    ) -> Result<TranslatedDocument> {
        self.check_job(job)?;
        let prepared = PreparedDocument::prepare(doc, &self.config, job.range, &job.target_lang)?;
        self.translate_prepared(prepared, job).await?.save()
    }

    /// Translate and draw every block of a prepared document.
    pub async fn translate_prepared(
        &self,
        prepared: PreparedDocument,
        job: &TranslateJob,
    ) -> Result<OverlaidDocument> {
        let total = prepared.block_count();
        let PreparedDocument {
            range,
            pages,
            mut editor,
        } = prepared;

        let mut report = TranslationReport {
            blocks_total: total,
            ..TranslationReport::default()
        };

        info!(
            "Translating {} blocks on pages {} with {} ({} -> {})",
            total,
            range,
            self.blocks.translator().name(),
            job.source_lang,
            job.target_lang
        );

        let mut completed = 0;
        for page in &pages {
            let mut overlay = editor.page(page.page)?;

            for block in &page.blocks {
                if job.is_cancelled() {
                    info!("Translation cancelled after {} of {} blocks", completed, total);
                    return Err(Error::Cancelled);
                }

                let translated = self
                    .blocks
                    .translate_block(block, &job.source_lang, &job.target_lang)
                    .await;

                match translated.outcome {
                    BlockOutcome::Empty => report.skipped_empty += 1,
                    BlockOutcome::Translated => report.translated += 1,
                    BlockOutcome::Passthrough => report.passthrough += 1,
                }

                if translated.outcome != BlockOutcome::Empty {
                    match overlay.draw_block(&block.bbox, &translated.translated) {
                        Ok(()) if !StandardFont::can_encode(&translated.translated) => {
                            warn!(
                                "Block on page {} has characters the overlay font cannot show",
                                page.page + 1
                            );
                            report.lossy += 1;
                        }
                        Ok(()) => {}
                        Err(e) => {
                            warn!("Skipping block on page {}: {}", page.page + 1, e);
                            report.render_failed += 1;
                        }
                    }
                }

                completed += 1;
                job.report_progress(Progress {
                    page: page.page,
                    completed,
                    total,
                });
            }

            editor.commit(&overlay)?;
            report.pages_processed += 1;
            debug!("Page {} done: {} blocks drawn", page.page + 1, overlay.blocks_drawn());
        }

        if total == 0 {
            job.report_progress(Progress {
                page: range.end(),
                completed: 0,
                total: 0,
            });
        }

        info!(
            "Translated {} blocks, {} untranslated, {} empty, {} not rendered",
            report.translated, report.passthrough, report.skipped_empty, report.render_failed
        );

        Ok(OverlaidDocument { editor, report })
    }

    pub const fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn translator_info(&self) -> translator::TranslatorInfo {
        self.blocks.translator().info()
    }

    pub fn clear_cache(&self) {
        self.blocks.cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.source_lang.as_str(), "en");
        assert_eq!(config.target_lang.as_str(), "id");
    }

    #[test]
    fn test_progress_fraction() {
        let p = |completed, total| Progress { page: 0, completed, total };
        assert!((p(0, 4).fraction() - 0.0).abs() < f64::EPSILON);
        assert!((p(1, 4).fraction() - 0.25).abs() < f64::EPSILON);
        assert!((p(4, 4).fraction() - 1.0).abs() < f64::EPSILON);
        assert!((p(0, 0).fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_job_defaults_from_config() {
        let job = TranslateJob::new(&AppConfig::default());
        assert!(job.range.is_none());
        assert_eq!(job.target_lang.as_str(), "id");
        assert!(!job.is_cancelled());

        let flag = Arc::new(AtomicBool::new(true));
        let job = job.with_cancel(Arc::clone(&flag));
        assert!(job.is_cancelled());
    }
}
