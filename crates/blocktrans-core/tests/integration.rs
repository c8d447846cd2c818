//! Integration tests for blocktrans-core
//!
//! These tests run the whole pipeline on PDFs generated in-test:
//! - PDF loading and block extraction
//! - Translation with a mock backend, including partial failures
//! - Overlay placement and escaping in the output
//! - Page ranges, progress and cancellation

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use blocktrans_core::{
    pdf::{TextBlock, TextExtractor},
    translator::TranslatorInfo,
    AppConfig, BoundingBox, Error, Lang, PageBlocks, PageRange, PdfDocument, PdfTranslator,
    PreparedDocument, Result, TranslateJob, TranslatedDocument, Translator,
};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

// =============================================================================
// Mock Translator for Testing
// =============================================================================

/// A mock translator that returns predictable translations without network calls.
struct MockTranslator {
    /// Prefix added in front of the upper-cased source text
    prefix: &'static str,
    /// Fail for any text containing this
    fail_on: Option<&'static str>,
    /// Return this instead of a translation
    fixed_output: Option<&'static str>,
    calls: AtomicUsize,
}

impl MockTranslator {
    fn new() -> Self {
        Self {
            prefix: "ID",
            fail_on: None,
            fixed_output: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_on: Some(needle),
            ..Self::new()
        }
    }

    fn returning(output: &'static str) -> Self {
        Self {
            fixed_output: Some(output),
            ..Self::new()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "mock",
            requires_api_key: false,
            supports_auto_detect: false,
        }
    }

    async fn translate(&self, text: &str, _source: &Lang, _target: &Lang) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(needle) = self.fail_on
            && text.contains(needle)
        {
            return Err(Error::TranslationRequest("Mock translation failure".to_string()));
        }
        if let Some(output) = self.fixed_output {
            return Ok(output.to_string());
        }
        Ok(format!("{} {}", self.prefix, text.to_uppercase()))
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// A line of text drawn at (x, y) in PDF user space, 24pt Helvetica.
struct Line(&'static str, i64, i64);

/// Build a PDF with one page per entry, US Letter, shared Helvetica resources.
fn create_test_pdf(pages: &[&[Line]]) -> Vec<u8> {
    build_pdf(pages, 0)
}

/// Pages carry `/Rotate` and each line is counter-rotated so it reads
/// upright on screen, as in a scanned landscape page.
fn create_rotated_pdf(pages: &[&[Line]], rotate: i64) -> Vec<u8> {
    build_pdf(pages, rotate)
}

fn build_pdf(pages: &[&[Line]], rotate: i64) -> Vec<u8> {
    let (sin, cos): (i64, i64) = match rotate.rem_euclid(360) {
        90 => (1, 0),
        180 => (0, -1),
        270 => (-1, 0),
        _ => (0, 1),
    };
    let mut doc = Document::with_version("1.5");
    let page_tree_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for Line(text, x, y) in *lines {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new(
                    "Tm",
                    vec![cos.into(), sin.into(), (-sin).into(), cos.into(), (*x).into(), (*y).into()],
                ),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            ("Rotate", Object::Integer(rotate)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        page_tree_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
            ("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])),
        ])),
    );

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(page_tree_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

/// Two pages, two well separated blocks each.
fn two_page_pdf() -> PdfDocument {
    let bytes = create_test_pdf(&[
        &[Line("Hello world", 72, 700), Line("Second block", 72, 400)],
        &[Line("Third block", 72, 700), Line("Fourth block", 72, 300)],
    ]);
    PdfDocument::from_bytes(bytes).expect("Failed to load test PDF")
}

fn test_config() -> AppConfig {
    AppConfig::default()
}

fn translator_with(mock: &Arc<MockTranslator>) -> PdfTranslator {
    PdfTranslator::with_translator(mock.clone(), test_config()).unwrap()
}

async fn run(translator: &PdfTranslator, doc: &PdfDocument, job: TranslateJob) -> Result<TranslatedDocument> {
    translator.translate_document(doc, &job).await
}

fn page_text(bytes: &[u8], page: usize) -> String {
    let doc = PdfDocument::from_bytes(bytes.to_vec()).unwrap();
    TextExtractor::new(&doc).page_text(page).unwrap()
}

fn page_blocks(doc: &PdfDocument, page: usize) -> Vec<TextBlock> {
    TextExtractor::new(doc).extract_page_blocks(page).unwrap()
}

fn page_content(bytes: &[u8], page: usize) -> String {
    let doc = Document::load_mem(bytes).unwrap();
    let page_number = u32::try_from(page + 1).unwrap();
    let page_id = *doc.get_pages().get(&page_number).unwrap();
    String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned()
}

// =============================================================================
// PDF Loading and Extraction Tests
// =============================================================================

#[test]
fn test_pdf_loads_successfully() {
    let doc = two_page_pdf();
    assert_eq!(doc.page_count(), 2);
}

#[test]
fn test_invalid_bytes_fail_to_open() {
    for bytes in [Vec::new(), b"definitely not a pdf".to_vec()] {
        let result = PdfDocument::from_bytes(bytes);
        assert!(matches!(result, Err(Error::DocumentOpen(_))), "got {result:?}");
    }
}

#[test]
fn test_blocks_in_extraction_order() {
    let doc = two_page_pdf();
    let blocks = page_blocks(&doc, 0);

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].text, "Hello world");
    assert_eq!(blocks[1].text, "Second block");

    // Baseline at y=700 in PDF space is y=92 from the top
    let first = blocks[0].bbox;
    assert!(first.is_valid());
    assert!(first.y0 < 92.0 && first.y1 > 85.0, "unexpected bbox {first:?}");
    assert!((first.x0 - 72.0).abs() < 2.0);
    assert!(blocks[1].bbox.y0 > first.y1);
}

#[test]
fn test_extract_range_rejects_out_of_bounds() {
    let doc = two_page_pdf();
    let result = TextExtractor::new(&doc).extract_range(PageRange::new(1, 2));
    assert!(matches!(result, Err(Error::PageRange { start: 1, end: 2, total: 2 })));
}

// =============================================================================
// Pipeline Tests
// =============================================================================

#[tokio::test]
async fn test_translates_every_block() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let out = run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();

    assert_eq!(out.report.pages_processed, 2);
    assert_eq!(out.report.blocks_total, 4);
    assert_eq!(out.report.translated, 4);
    assert_eq!(out.report.passthrough, 0);
    assert_eq!(out.report.render_failed, 0);
    assert_eq!(mock.calls(), 4);

    let text = page_text(&out.bytes, 0);
    assert!(text.contains("ID HELLO WORLD"), "page text was {text:?}");
    assert!(text.contains("ID SECOND BLOCK"));
    assert!(page_text(&out.bytes, 1).contains("ID FOURTH BLOCK"));
}

#[tokio::test]
async fn test_translation_is_drawn_inside_original_box() {
    let doc = two_page_pdf();
    let originals = page_blocks(&doc, 0);
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let out = run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();
    let output = PdfDocument::from_bytes(out.bytes).unwrap();

    let translated: Vec<_> = page_blocks(&output, 0)
        .into_iter()
        .filter(|b| b.text.contains("ID "))
        .collect();
    assert!(!translated.is_empty());

    // Glyph boxes may overshoot the cover box by a fraction of the font size
    for block in translated {
        assert!(
            originals.iter().any(|o| o.bbox.contains(&block.bbox, 4.0)),
            "{:?} is outside every original block",
            block.bbox
        );
    }
}

#[tokio::test]
async fn test_rotated_page_cover_matches_displayed_block() {
    for rotate in [90, 180, 270] {
        let bytes = create_rotated_pdf(&[&[Line("Hello world", 306, 396)]], rotate);
        let doc = PdfDocument::from_bytes(bytes).unwrap();
        let originals = page_blocks(&doc, 0);
        assert_eq!(originals.len(), 1, "rotation {rotate}");
        let mock = Arc::new(MockTranslator::returning("Halo"));
        let translator = translator_with(&mock);

        let out = run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();
        assert_eq!(out.report.translated, 1);
        assert_eq!(out.report.render_failed, 0);

        let output = PdfDocument::from_bytes(out.bytes).unwrap();
        let translated: Vec<_> = page_blocks(&output, 0)
            .into_iter()
            .filter(|b| b.text.contains("Halo"))
            .collect();
        assert!(!translated.is_empty(), "rotation {rotate}: translation not found");

        for block in translated {
            assert!(
                originals[0].bbox.contains(&block.bbox, 4.0),
                "rotation {rotate}: {:?} is outside {:?}",
                block.bbox,
                originals[0].bbox
            );
        }
    }
}

#[tokio::test]
async fn test_markup_in_translation_is_escaped() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::returning("<b>\"x\" & y</b>"));
    let translator = translator_with(&mock);

    let out = run(&translator, &doc, TranslateJob::new(translator.config()).with_range(PageRange::single(0)))
        .await
        .unwrap();

    let content = page_content(&out.bytes, 0);
    assert!(!content.contains("<b>"));
    assert!(!content.contains("</b"));
    assert!(!content.contains('&'));
    assert!(!content.contains('"'));

    // The text itself survives as literal characters
    assert!(page_text(&out.bytes, 0).contains("<b>\"x\" & y</b>"));
}

#[tokio::test]
async fn test_failed_block_keeps_source_text() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::failing_on("Second"));
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config()).with_range(PageRange::single(0));
    let out = run(&translator, &doc, job).await.unwrap();

    assert_eq!(out.report.translated, 1);
    assert_eq!(out.report.passthrough, 1);
    assert_eq!(out.report.render_failed, 0);

    let text = page_text(&out.bytes, 0);
    assert!(text.contains("ID HELLO WORLD"));
    assert!(text.contains("Second block"));
    assert!(!text.contains("ID SECOND BLOCK"));
}

#[tokio::test]
async fn test_range_outside_document_is_rejected() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    for range in [PageRange::new(2, 4), PageRange::new(1, 0)] {
        let result = run(&translator, &doc, TranslateJob::new(translator.config()).with_range(range)).await;
        assert!(matches!(result, Err(Error::PageRange { .. })));
    }
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_unselected_pages_are_untouched() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config()).with_range(PageRange::single(1));
    let out = run(&translator, &doc, job).await.unwrap();

    assert_eq!(out.report.pages_processed, 1);
    assert_eq!(mock.calls(), 2);
    assert!(!page_content(&out.bytes, 0).contains("re f"));
    assert!(page_content(&out.bytes, 1).contains("re f"));
    assert_eq!(page_text(&out.bytes, 0), page_text(doc.bytes(), 0));
}

#[tokio::test]
async fn test_runs_are_deterministic() {
    let doc = two_page_pdf();

    let mut contents = Vec::new();
    for _ in 0..2 {
        let mock = Arc::new(MockTranslator::new());
        let translator = translator_with(&mock);
        let out = run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();
        contents.push((page_content(&out.bytes, 0), page_content(&out.bytes, 1)));
    }

    assert_eq!(contents[0], contents[1]);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_completes() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let job = TranslateJob::new(translator.config())
        .with_progress(move |p| sink.lock().unwrap().push(p.fraction()));
    run(&translator, &doc, job).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!((seen[seen.len() - 1] - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_page_without_text() {
    let bytes = create_test_pdf(&[&[]]);
    let doc = PdfDocument::from_bytes(bytes).unwrap();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let job = TranslateJob::new(translator.config())
        .with_progress(move |p| sink.lock().unwrap().push(p.fraction()));
    let out = run(&translator, &doc, job).await.unwrap();

    assert_eq!(out.report.blocks_total, 0);
    assert_eq!(mock.calls(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    assert!(!page_content(&out.bytes, 0).contains("re f"));
}

#[tokio::test]
async fn test_cancel_before_start() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config()).with_cancel(Arc::new(AtomicBool::new(true)));
    let result = run(&translator, &doc, job).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn test_cancel_mid_run() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let flag = Arc::new(AtomicBool::new(false));
    let trigger = Arc::clone(&flag);
    let job = TranslateJob::new(translator.config())
        .with_cancel(flag)
        .with_progress(move |_| trigger.store(true, Ordering::SeqCst));
    let result = run(&translator, &doc, job).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
async fn test_repeated_text_hits_cache() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();
    let second = run(&translator, &doc, TranslateJob::new(translator.config())).await.unwrap();

    assert_eq!(mock.calls(), 4);
    assert_eq!(second.report.translated, 4);
}

#[tokio::test]
async fn test_output_has_translation_layer() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config())
        .with_languages(Lang::new("en"), Lang::new("ms"));
    let out = run(&translator, &doc, job).await.unwrap();

    let output = Document::load_mem(&out.bytes).unwrap();
    let properties = output
        .catalog()
        .unwrap()
        .get(b"OCProperties")
        .and_then(Object::as_dict)
        .unwrap();
    let ocgs = properties.get(b"OCGs").and_then(Object::as_array).unwrap();
    assert_eq!(ocgs.len(), 1);

    let ocg_id = ocgs[0].as_reference().unwrap();
    let name = output.get_dictionary(ocg_id).unwrap().get(b"Name").unwrap();
    assert_eq!(name.as_str().unwrap(), b"Translated(ms)");
}

#[tokio::test]
async fn test_undrawable_target_is_rejected_before_translating() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config())
        .with_languages(Lang::new("en"), Lang::new("ja"));
    let result = run(&translator, &doc, job).await;

    assert!(matches!(result, Err(Error::ConfigInvalid { ref field, .. }) if field == "target_lang"));
    assert_eq!(mock.calls(), 0);

    let mut config = test_config();
    config.target_lang = Lang::new("zh-CN");
    assert!(PdfTranslator::with_translator(mock.clone(), config).is_err());
}

#[tokio::test]
async fn test_characters_outside_font_are_counted() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::returning("Halo \u{4E16}\u{754C}"));
    let translator = translator_with(&mock);

    let job = TranslateJob::new(translator.config()).with_range(PageRange::single(0));
    let out = run(&translator, &doc, job).await.unwrap();

    assert_eq!(out.report.translated, 2);
    assert_eq!(out.report.lossy, 2);
}

#[tokio::test]
async fn test_unsupported_source_is_rejected_before_translating() {
    let doc = two_page_pdf();
    let translator = PdfTranslator::new(test_config()).unwrap();

    let job = TranslateJob::new(translator.config())
        .with_languages(Lang::new("xx"), Lang::new("id"));
    let result = run(&translator, &doc, job).await;

    assert!(matches!(result, Err(Error::TranslationUnsupportedLanguage(code)) if code == "xx"));
}

#[tokio::test]
async fn test_blocking_steps_match_single_call() {
    let doc = two_page_pdf();
    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);
    let job = TranslateJob::new(translator.config());

    let expected = run(&translator, &doc, TranslateJob::new(translator.config()))
        .await
        .unwrap();

    let config = translator.config().clone();
    let target = job.target_lang.clone();
    let moved = doc.clone();
    let prepared = tokio::task::spawn_blocking(move || {
        PreparedDocument::prepare(&moved, &config, None, &target)
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(prepared.block_count(), 4);

    let overlaid = translator.translate_prepared(prepared, &job).await.unwrap();
    assert_eq!(overlaid.report(), &expected.report);
    let out = tokio::task::spawn_blocking(move || overlaid.save())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(page_content(&out.bytes, 0), page_content(&expected.bytes, 0));
    assert_eq!(page_content(&out.bytes, 1), page_content(&expected.bytes, 1));
}

#[tokio::test]
async fn test_whitespace_block_is_skipped_without_cover() {
    let doc = two_page_pdf();
    let mut blocks = page_blocks(&doc, 0);
    blocks.insert(
        1,
        TextBlock {
            text: " \n\t ".to_string(),
            bbox: BoundingBox::new(72.0, 200.0, 300.0, 230.0),
            font_size: 12.0,
            line_count: 0,
        },
    );

    let mock = Arc::new(MockTranslator::new());
    let translator = translator_with(&mock);
    let job = TranslateJob::new(translator.config());

    let prepared = PreparedDocument::from_blocks(
        &doc,
        translator.config(),
        vec![PageBlocks { page: 0, blocks }],
        &job.target_lang,
    )
    .unwrap();
    let out = translator
        .translate_prepared(prepared, &job)
        .await
        .unwrap()
        .save()
        .unwrap();

    assert_eq!(out.report.blocks_total, 3);
    assert_eq!(out.report.skipped_empty, 1);
    assert_eq!(out.report.translated, 2);
    assert_eq!(mock.calls(), 2);

    let content = page_content(&out.bytes, 0);
    assert_eq!(content.matches("re f").count(), 2);
}

#[test]
fn test_output_written_to_disk_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(blocktrans_core::output_filename("paper.pdf"));
    std::fs::write(&path, create_test_pdf(&[&[Line("Hello world", 72, 700)]])).unwrap();

    let doc = PdfDocument::from_file(&path).unwrap();
    assert_eq!(doc.page_count(), 1);
    assert!(PdfDocument::from_file(dir.path().join("missing.pdf")).is_err());
}

#[test]
fn test_output_filename_format() {
    let name = blocktrans_core::output_filename("uploads/paper.final.pdf");
    let digits = name
        .strip_prefix("paper.final_translated_")
        .and_then(|rest| rest.strip_suffix(".pdf"))
        .unwrap();
    assert_eq!(digits.len(), 6);
    assert!(digits.chars().all(|c| c.is_ascii_digit()));
}
