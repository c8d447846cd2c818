//! PDF overlay creation for translated text.
//!
//! # Coordinate System
//!
//! Block bounding boxes come from MuPDF, which reports them in display
//! space: a **top-left origin** on the page's visible box (CropBox, else
//! MediaBox) after `/Rotate` is applied, with Y increasing downward.
//!
//! Layout happens in upright display space with a bottom-left origin:
//! ```text
//! x' = x
//! y' = display_height - y
//! ```
//! The page overlay then sets a `cm` that maps upright display space back
//! to PDF user space (see [`PageGeometry::display_matrix`]), so covers land
//! on the rotated glyphs and translations read upright in the viewer.
//!
//! # Overlay Strategy
//!
//! Each block gets its own `q ... Q` group:
//! 1. an opaque white rectangle exactly covering the block's box
//! 2. a clip to that same box
//! 3. the translated text, word-wrapped and (in `Fit` mode) shrunk until it
//!    fits the box height
//!
//! The page's original content is wrapped in `q ... Q` before the overlay is
//! appended, so a graphics state left dirty by the page cannot shift it.

use std::collections::BTreeMap;
use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::config::{AppConfig, Lang, LayoutMode, OverlayConfig, TextColor};
use crate::error::{Error, Result};
use super::font::{self, StandardFont, ASCENT, DESCENT, FONT_RESOURCE};
use super::page_index::PageIndex;
use super::text::BoundingBox;

/// Resource name of the optional content group in page `/Properties`.
const LAYER_RESOURCE: &str = "OCTrans";

/// Font size decrement while searching for a size that fits.
const FIT_STEP: f32 = 0.5;

/// Fallback page box when none is set anywhere (US Letter).
const DEFAULT_PAGE_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Page tree levels searched for inherited attributes.
const MAX_TREE_DEPTH: usize = 10;

// =============================================================================
// Public Types
// =============================================================================

/// Options for PDF overlay creation
#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Text color for translations
    pub text_color: TextColor,
    /// Starting (and in `Fixed` mode, only) font size in points
    pub font_size: f32,
    /// Smallest size `Fit` mode shrinks to
    pub min_font_size: f32,
    /// Line height as a multiple of font size
    pub line_height: f32,
    pub layout: LayoutMode,
    /// Name of the optional content group holding the overlay, if any
    pub layer_name: Option<String>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::from_overlay_config(&OverlayConfig::default(), TextColor::default(), None)
    }
}

impl OverlayOptions {
    fn from_overlay_config(config: &OverlayConfig, text_color: TextColor, layer_name: Option<String>) -> Self {
        Self {
            text_color,
            font_size: config.font_size,
            min_font_size: config.min_font_size.min(config.font_size),
            line_height: config.line_height,
            layout: config.layout,
            layer_name,
        }
    }

    /// Options for an application config; the layer is named after `target`.
    pub fn from_config(config: &AppConfig, target: &Lang) -> Self {
        let layer_name = config
            .overlay
            .layer
            .then(|| format!("Translated({target})"));
        Self::from_overlay_config(&config.overlay, config.text_color, layer_name)
    }
}

/// Visible box and display rotation of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// CropBox, else MediaBox, normalized so that x0 < x1 and y0 < y1
    pub page_box: [f32; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270
    pub rotation: u16,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_box: DEFAULT_PAGE_BOX,
            rotation: 0,
        }
    }
}

impl PageGeometry {
    /// `rotation` is snapped to the nearest quarter turn, as viewers do.
    pub fn new(page_box: [f32; 4], rotation: i64) -> Self {
        let rotation = match ((rotation.rem_euclid(360) + 45) / 90) % 4 {
            1 => 90,
            2 => 180,
            3 => 270,
            _ => 0,
        };
        Self { page_box, rotation }
    }

    /// Width and height of the page as displayed.
    pub fn display_size(&self) -> (f32, f32) {
        let [x0, y0, x1, y1] = self.page_box;
        match self.rotation {
            90 | 270 => (y1 - y0, x1 - x0),
            _ => (x1 - x0, y1 - y0),
        }
    }

    /// `[a b c d e f]` of the `cm` taking upright display space
    /// (bottom-left origin) to PDF user space.
    pub fn display_matrix(&self) -> [f32; 6] {
        let [x0, y0, x1, y1] = self.page_box;
        match self.rotation {
            90 => [0.0, 1.0, -1.0, 0.0, x1, y0],
            180 => [-1.0, 0.0, 0.0, -1.0, x1, y1],
            270 => [0.0, -1.0, 1.0, 0.0, x0, y1],
            _ => [1.0, 0.0, 0.0, 1.0, x0, y0],
        }
    }

    #[allow(clippy::float_cmp)]
    fn is_identity(&self) -> bool {
        self.display_matrix() == [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    }
}

/// Where and how a block's text is drawn, in upright display space.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLayout {
    /// Cover rectangle: x, y (bottom-left), width, height
    pub rect: [f32; 4],
    pub font_size: f32,
    /// Distance between baselines in points
    pub leading: f32,
    /// Position of the first baseline
    pub text_x: f32,
    pub first_baseline: f32,
    pub lines: Vec<String>,
    /// Whether every line fits inside the box
    pub fits: bool,
}

/// Compute the layout of `text` inside `bbox` on a page with `geometry`.
pub fn layout_block(
    bbox: &BoundingBox,
    text: &str,
    geometry: &PageGeometry,
    options: &OverlayOptions,
) -> std::result::Result<BlockLayout, String> {
    if !bbox.is_valid() {
        return Err(format!("malformed bounding box {:?}", bbox.as_array()));
    }

    let width = bbox.width();
    let height = bbox.height();
    let x = bbox.x0;
    let top = geometry.display_size().1 - bbox.y0;

    let fits_at = |size: f32| -> (Vec<String>, bool) {
        let lines = wrap_text(text, width, size);
        #[allow(clippy::cast_precision_loss)]
        let needed = lines.len() as f32 * size * options.line_height;
        (lines, needed <= height + f32::EPSILON)
    };

    let (font_size, (lines, fits)) = match options.layout {
        LayoutMode::Fixed => (options.font_size, fits_at(options.font_size)),
        LayoutMode::Fit => {
            let mut size = options.font_size;
            loop {
                let attempt = fits_at(size);
                if attempt.1 || size <= options.min_font_size {
                    break (size, attempt);
                }
                size = (size - FIT_STEP).max(options.min_font_size);
            }
        }
    };

    let leading = font_size * options.line_height;
    let half_leading = (leading - font_size * (ASCENT + DESCENT)) / 2.0;

    Ok(BlockLayout {
        rect: [x, top - height, width, height],
        font_size,
        leading,
        text_x: x,
        first_baseline: top - half_leading - font_size * ASCENT,
        lines,
        fits,
    })
}

/// Overlay drawing for one page, accumulated block by block.
#[derive(Debug)]
pub struct PageOverlay {
    page: usize,
    geometry: PageGeometry,
    options: OverlayOptions,
    body: String,
    blocks_drawn: usize,
}

impl PageOverlay {
    pub fn new(page: usize, geometry: PageGeometry, options: OverlayOptions) -> Self {
        Self {
            page,
            geometry,
            options,
            body: String::new(),
            blocks_drawn: 0,
        }
    }

    pub const fn page(&self) -> usize {
        self.page
    }

    pub const fn blocks_drawn(&self) -> usize {
        self.blocks_drawn
    }

    pub const fn is_empty(&self) -> bool {
        self.blocks_drawn == 0
    }

    /// Cover `bbox` and draw `text` inside it.
    ///
    /// Blank text draws nothing. A malformed box fails with [`Error::Render`]
    /// and leaves the overlay unchanged.
    pub fn draw_block(&mut self, bbox: &BoundingBox, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let layout = layout_block(bbox, text, &self.geometry, &self.options)
            .map_err(|reason| Error::Render { page: self.page, reason })?;

        let [rx, ry, rw, rh] = layout.rect;
        let TextColor { r, g, b } = self.options.text_color;
        let body = &mut self.body;

        body.push_str("q\n1 1 1 rg\n");
        let _ = writeln!(body, "{} {} {} {} re f", num(rx), num(ry), num(rw), num(rh));
        let _ = writeln!(body, "{} {} {} {} re W n", num(rx), num(ry), num(rw), num(rh));
        let _ = writeln!(body, "{} {} {} rg", num(r), num(g), num(b));
        body.push_str("BT\n0 Tr\n");
        let _ = writeln!(body, "/{FONT_RESOURCE} {} Tf", num(layout.font_size));
        let _ = writeln!(body, "{} {} Td", num(layout.text_x), num(layout.first_baseline));

        for (i, line) in layout.lines.iter().enumerate() {
            if i > 0 {
                let _ = writeln!(body, "0 {} Td", num(-layout.leading));
            }
            if !line.is_empty() {
                let _ = writeln!(body, "<{}> Tj", StandardFont::text_to_hex(line));
            }
        }

        body.push_str("ET\nQ\n");
        self.blocks_drawn += 1;
        Ok(())
    }

    /// The complete overlay content stream for this page.
    pub fn content(&self) -> String {
        let mut content = String::from("q\n");
        if !self.geometry.is_identity() {
            let [a, b, c, d, e, f] = self.geometry.display_matrix();
            let _ = writeln!(
                content,
                "{} {} {} {} {} {} cm",
                num(a),
                num(b),
                num(c),
                num(d),
                num(e),
                num(f)
            );
        }
        if self.options.layer_name.is_some() {
            let _ = writeln!(content, "/OC /{LAYER_RESOURCE} BDC");
        }
        content.push_str(&self.body);
        if self.options.layer_name.is_some() {
            content.push_str("EMC\n");
        }
        content.push_str("Q\n");
        content
    }
}

// =============================================================================
// PDF Overlay Editor
// =============================================================================

/// Applies page overlays to a document using lopdf.
pub struct PdfOverlay {
    doc: Document,
    options: OverlayOptions,
    pages: BTreeMap<u32, ObjectId>,
    layer: Option<ObjectId>,
}

impl PdfOverlay {
    /// Wrap a parsed document.
    pub fn new(doc: Document, options: OverlayOptions) -> Self {
        let pages = doc.get_pages();
        Self {
            doc,
            options,
            pages,
            layer: None,
        }
    }

    /// Parse `pdf_bytes` and wrap the result.
    pub fn load(pdf_bytes: &[u8], options: OverlayOptions) -> Result<Self> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| Error::DocumentOpen(format!("Failed to load PDF: {e}")))?;
        Ok(Self::new(doc, options))
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Start an empty overlay for `page_num` (0-indexed).
    pub fn page(&self, page_num: usize) -> Result<PageOverlay> {
        let page_id = self.page_id(page_num)?;
        let geometry = page_geometry(&self.doc, page_id);
        Ok(PageOverlay::new(page_num, geometry, self.options.clone()))
    }

    /// Append a finished page overlay to its page. Empty overlays are ignored.
    pub fn commit(&mut self, overlay: &PageOverlay) -> Result<()> {
        if overlay.is_empty() {
            return Ok(());
        }

        let page_id = self.page_id(overlay.page())?;

        StandardFont::add_to_page(&mut self.doc, page_id)?;
        if let Some(layer_id) = self.ensure_layer()? {
            font::set_page_resource(
                &mut self.doc,
                page_id,
                b"Properties",
                LAYER_RESOURCE,
                Object::Reference(layer_id),
            )?;
        }

        self.append_content(page_id, &overlay.content())
    }

    /// Compress and serialize the whole document.
    pub fn save(mut self) -> Result<Vec<u8>> {
        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;

        Ok(output)
    }

    fn page_id(&self, page_num: usize) -> Result<ObjectId> {
        let page_index = PageIndex::try_from_page_num(page_num, self.pages.len())?;
        self.pages
            .get(&page_index.as_lopdf_page_number())
            .copied()
            .ok_or(Error::PageRange {
                start: page_num,
                end: page_num,
                total: self.pages.len(),
            })
    }

    /// Create the optional content group on first use and register it as ON.
    fn ensure_layer(&mut self) -> Result<Option<ObjectId>> {
        if self.layer.is_some() {
            return Ok(self.layer);
        }
        let Some(name) = self.options.layer_name.clone() else {
            return Ok(None);
        };

        let ocg_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"OCG".to_vec())),
            ("Name", Object::string_literal(name)),
        ]));

        let root_id = self
            .doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| Error::Lopdf(format!("Missing document catalog: {e}")))?;

        let mut properties = self
            .doc
            .get_object(root_id)
            .and_then(Object::as_dict)
            .ok()
            .and_then(|catalog| catalog.get(b"OCProperties").ok())
            .and_then(|obj| resolve_dict(&self.doc, obj))
            .unwrap_or_default();

        let mut ocgs = resolve_array(&self.doc, properties.get(b"OCGs").ok());
        ocgs.push(Object::Reference(ocg_id));
        properties.set("OCGs", Object::Array(ocgs));

        let mut default_config = properties
            .get(b"D")
            .ok()
            .and_then(|obj| resolve_dict(&self.doc, obj))
            .unwrap_or_default();
        let mut on = resolve_array(&self.doc, default_config.get(b"ON").ok());
        on.push(Object::Reference(ocg_id));
        default_config.set("ON", Object::Array(on));
        properties.set("D", Object::Dictionary(default_config));

        let catalog = self
            .doc
            .get_object_mut(root_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get catalog: {e}")))?;
        catalog.set("OCProperties", Object::Dictionary(properties));

        self.layer = Some(ocg_id);
        Ok(self.layer)
    }

    /// Wrap the existing page content in `q ... Q` and append `content` after it.
    fn append_content(&mut self, page_id: ObjectId, content: &str) -> Result<()> {
        let existing = {
            let page = self
                .doc
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
            match page.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(arr)) => arr.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(arr)) => arr.clone(),
                _ => Vec::new(),
            }
        };

        let mut contents = Vec::with_capacity(existing.len() + 2);
        let overlay_bytes = if existing.is_empty() {
            content.as_bytes().to_vec()
        } else {
            let open_id = self
                .doc
                .add_object(Object::Stream(Stream::new(Dictionary::new(), b"q\n".to_vec())));
            contents.push(Object::Reference(open_id));
            contents.extend(existing);
            format!("Q\n{content}").into_bytes()
        };

        let overlay_id = self
            .doc
            .add_object(Object::Stream(Stream::new(Dictionary::new(), overlay_bytes)));
        contents.push(Object::Reference(overlay_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;
        page.set("Contents", Object::Array(contents));

        Ok(())
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// The page's visible box (CropBox if present, else MediaBox) and `/Rotate`,
/// all inheritable from the page tree.
fn page_geometry(doc: &Document, page_id: ObjectId) -> PageGeometry {
    let Ok(page) = doc.get_object(page_id) else {
        return PageGeometry::default();
    };
    let page_box = inherited(doc, page, b"CropBox", MAX_TREE_DEPTH)
        .and_then(as_box)
        .or_else(|| inherited(doc, page, b"MediaBox", MAX_TREE_DEPTH).and_then(as_box))
        .unwrap_or(DEFAULT_PAGE_BOX);
    let rotation = inherited(doc, page, b"Rotate", MAX_TREE_DEPTH)
        .and_then(|obj| obj.as_i64().ok())
        .unwrap_or(0);
    PageGeometry::new(page_box, rotation)
}

/// Look up `key` on a page, walking up `/Parent` for inherited attributes.
fn inherited<'a>(doc: &'a Document, node: &'a Object, key: &[u8], depth: usize) -> Option<&'a Object> {
    if depth == 0 {
        return None;
    }
    let Object::Dictionary(dict) = node else {
        return None;
    };

    if let Ok(obj) = dict.get(key) {
        return match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        };
    }

    let Ok(Object::Reference(parent_id)) = dict.get(b"Parent") else {
        return None;
    };
    let parent = doc.get_object(*parent_id).ok()?;
    inherited(doc, parent, key, depth - 1)
}

fn as_box(obj: &Object) -> Option<[f32; 4]> {
    let values: Vec<f32> = obj
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| match o {
            #[allow(clippy::cast_precision_loss)]
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        })
        .collect();

    match values[..] {
        [x0, y0, x1, y1] => Some([x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]),
        _ => None,
    }
}

fn resolve_dict(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok().cloned(),
        _ => None,
    }
}

fn resolve_array(doc: &Document, obj: Option<&Object>) -> Vec<Object> {
    match obj {
        Some(Object::Array(arr)) => arr.clone(),
        Some(Object::Reference(id)) => doc
            .get_object(*id)
            .and_then(Object::as_array)
            .cloned()
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Word wrap text to lines no wider than `max_width` points at `font_size`.
///
/// Explicit newlines start a new line. Words wider than the box are broken
/// between characters.
pub fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let space = StandardFont::string_width(" ", font_size);

    for paragraph in text.lines() {
        let mut current = String::new();
        let mut current_width = 0.0;

        for word in paragraph.split_whitespace() {
            let word_width = StandardFont::string_width(word, font_size);

            if !current.is_empty() && current_width + space + word_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width += space + word_width;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if word_width <= max_width {
                current.push_str(word);
                current_width = word_width;
            } else {
                let mut pieces = break_word(word, max_width, font_size);
                let last = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
                current_width = StandardFont::string_width(&last, font_size);
                current = last;
            }
        }

        lines.push(current);
    }

    // Drop blank lines at either end; inner blank lines are paragraph breaks
    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    let leading_blank = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading_blank);

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Split a word that is wider than the box into box-wide pieces.
fn break_word(word: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();

    for c in word.chars() {
        let mut candidate = piece.clone();
        candidate.push(c);
        if !piece.is_empty() && StandardFont::string_width(&candidate, font_size) > max_width {
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        } else {
            piece = candidate;
        }
    }

    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Format a coordinate for a content stream (3 decimals, trailing zeros trimmed).
fn num(v: f32) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

// =============================================================================
// Tests
// =============================================================================
