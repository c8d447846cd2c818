use mupdf::{Document as MuDocument, TextPage, TextPageOptions};

use crate::error::{Error, Result};
use super::document::PdfDocument;
use super::page_index::{PageIndex, PageRange};

/// A text block extracted from a PDF page with bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// The text content (may be empty or whitespace-only)
    pub text: String,
    /// Bounding box in page space (top-left origin, y grows downward)
    pub bbox: BoundingBox,
    /// Font size (estimated from line height)
    pub font_size: f32,
    /// Number of non-empty lines in the original text
    pub line_count: usize,
}

impl TextBlock {
    /// Whether there is anything to translate.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The blocks of one page, in extraction order.
#[derive(Debug, Clone)]
pub struct PageBlocks {
    /// Page number (0-indexed)
    pub page: usize,
    pub blocks: Vec<TextBlock>,
}

/// Bounding box in page coordinates: (x0, y0) top-left, (x1, y1) bottom-right
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Finite coordinates and a positive area.
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite()) && self.x1 > self.x0 && self.y1 > self.y0
    }

    /// Whether `other` lies inside this box, allowing `tolerance` points of slack.
    pub fn contains(&self, other: &Self, tolerance: f32) -> bool {
        other.x0 >= self.x0 - tolerance
            && other.y0 >= self.y0 - tolerance
            && other.x1 <= self.x1 + tolerance
            && other.y1 <= self.y1 + tolerance
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Convert to array format [x0, y0, x1, y1]
    pub const fn as_array(self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }

    /// Create from mupdf Quad (4 points defining a quadrilateral)
    pub const fn from_quad(quad: &mupdf::Quad) -> Self {
        let x0 = quad.ul.x.min(quad.ur.x).min(quad.ll.x).min(quad.lr.x);
        let y0 = quad.ul.y.min(quad.ur.y).min(quad.ll.y).min(quad.lr.y);
        let x1 = quad.ul.x.max(quad.ur.x).max(quad.ll.x).max(quad.lr.x);
        let y1 = quad.ul.y.max(quad.ur.y).max(quad.ll.y).max(quad.lr.y);
        Self { x0, y0, x1, y1 }
    }
}

/// Text extraction from PDF pages
pub struct TextExtractor<'a> {
    /// The PDF document to extract text from
    pub doc: &'a PdfDocument,
    /// Join words hyphenated across line breaks
    pub dehyphenate: bool,
}

impl<'a> TextExtractor<'a> {
    /// Create a new text extractor with dehyphenation on
    pub const fn new(doc: &'a PdfDocument) -> Self {
        Self {
            doc,
            dehyphenate: true,
        }
    }

    pub const fn with_dehyphenate(mut self, dehyphenate: bool) -> Self {
        self.dehyphenate = dehyphenate;
        self
    }

    /// Extract the blocks of every page in `range`.
    ///
    /// The range is validated first; any page failing to load aborts the
    /// whole extraction.
    pub fn extract_range(&self, range: PageRange) -> Result<Vec<PageBlocks>> {
        let range = range.validate(self.doc.page_count())?;
        let doc = self.doc.open_document()?;

        range
            .pages()
            .map(|page| {
                let text_page = self.load_text_page(&doc, page)?;
                Ok(PageBlocks {
                    page,
                    blocks: self.blocks_from_text_page(&text_page),
                })
            })
            .collect()
    }

    /// Extract text blocks from a page (like PyMuPDF's `get_text("blocks")`).
    ///
    /// Each mupdf block is a paragraph; its lines are joined into one block.
    /// Blocks come back in mupdf's extraction order.
    pub fn extract_page_blocks(&self, page_num: usize) -> Result<Vec<TextBlock>> {
        let doc = self.doc.open_document()?;
        let text_page = self.load_text_page(&doc, page_num)?;
        Ok(self.blocks_from_text_page(&text_page))
    }

    /// Get the plain text of a page, one line per text line.
    pub fn page_text(&self, page_num: usize) -> Result<String> {
        let doc = self.doc.open_document()?;
        let text_page = self.load_text_page(&doc, page_num)?;

        let mut all_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                all_text.extend(line.chars().filter_map(|c| c.char()));
                all_text.push('\n');
            }
        }

        Ok(all_text)
    }

    fn load_text_page(&self, doc: &MuDocument, page_num: usize) -> Result<TextPage> {
        let page_index = PageIndex::try_from_page_num(page_num, self.doc.page_count())?;

        let page = doc.load_page(page_index.into()).map_err(|e| Error::PdfTextExtraction {
            page: page_num,
            reason: format!("Failed to load page: {e}"),
        })?;

        page.to_text_page(TextPageOptions::empty())
            .map_err(|e| Error::PdfTextExtraction {
                page: page_num,
                reason: format!("Failed to get text page: {e}"),
            })
    }

    fn blocks_from_text_page(&self, text_page: &TextPage) -> Vec<TextBlock> {
        let mut blocks = Vec::new();

        for block in text_page.blocks() {
            let mut block_text = String::new();
            let mut block_bbox: Option<BoundingBox> = None;
            let mut line_heights: Vec<f32> = Vec::new();

            for line in block.lines() {
                let mut line_text = String::new();
                let mut line_bbox: Option<BoundingBox> = None;

                for text_char in line.chars() {
                    if let Some(c) = text_char.char() {
                        line_text.push(c);
                    }

                    let char_bbox = BoundingBox::from_quad(&text_char.quad());
                    line_bbox = Some(line_bbox.map_or(char_bbox, |bbox| bbox.union(&char_bbox)));
                    block_bbox = Some(block_bbox.map_or(char_bbox, |bbox| bbox.union(&char_bbox)));
                }

                let line_trimmed = line_text.trim();
                if line_trimmed.is_empty() {
                    continue;
                }

                if let Some(lb) = line_bbox {
                    line_heights.push(lb.height());
                }

                if self.dehyphenate && block_text.ends_with('-') {
                    block_text.pop();
                } else if !block_text.is_empty() {
                    block_text.push(' ');
                }
                block_text.push_str(line_trimmed);
            }

            // Blocks without any glyph have no position to draw on
            let Some(bbox) = block_bbox else {
                continue;
            };

            blocks.push(TextBlock {
                text: block_text,
                bbox,
                font_size: estimate_font_size(&line_heights, bbox),
                line_count: line_heights.len(),
            });
        }

        blocks
    }
}

/// Estimate a block's font size from its average line height.
///
/// mupdf line boxes run slightly smaller than the visual font size, hence
/// the 1.18 factor.
#[allow(clippy::cast_precision_loss)]
fn estimate_font_size(line_heights: &[f32], bbox: BoundingBox) -> f32 {
    let avg = if line_heights.is_empty() {
        bbox.height()
    } else {
        line_heights.iter().sum::<f32>() / line_heights.len() as f32
    };
    (avg * 1.18).clamp(6.0, 36.0)
}
