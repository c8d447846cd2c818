//! Standard Helvetica font for overlay text.
//!
//! Helvetica is one of the PDF base-14 fonts, so every viewer has it and
//! nothing has to be embedded. Text is encoded with WinAnsiEncoding, which
//! covers the Latin alphabets the overlay targets (Indonesian, Malay and the
//! Western European languages). Characters outside it are drawn as `?`.
//!
//! Widths come from the Helvetica AFM metrics (units of 1/1000 em) and drive
//! the line wrapping in the overlay.

use std::fmt::Write;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Resource name the overlay content stream uses for the font.
pub const FONT_RESOURCE: &str = "FTrans";

/// Ascender height as a fraction of the font size.
pub const ASCENT: f32 = 0.718;

/// Descender depth (positive) as a fraction of the font size.
pub const DESCENT: f32 = 0.207;

/// Byte used for characters WinAnsi cannot represent.
const REPLACEMENT: u8 = b'?';

/// Advance widths for 0x20..=0x7E.
const ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0 - ?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @ - O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P - _
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // ` - o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p - ~
];

/// Advance widths for 0xA0..=0xFF.
const LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // nbsp - macron
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // degree - questiondown
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // Agrave - Idieresis
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // Eth - germandbls
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // agrave - idieresis
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // eth - ydieresis
];

/// The base-14 Helvetica font with WinAnsi encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFont;

impl StandardFont {
    /// Map a character to its WinAnsi byte, if it has one.
    pub const fn encode_char(c: char) -> Option<u8> {
        let code = match c {
            '\t' => 0x20,
            ' '..='~' | '\u{A0}'..='\u{FF}' => c as u32,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => return None,
        };
        #[allow(clippy::cast_possible_truncation)] // every arm is below 0x100
        Some(code as u8)
    }

    /// Whether every visible character of `text` has a WinAnsi code.
    pub fn can_encode(text: &str) -> bool {
        text.chars()
            .filter(|c| !c.is_control())
            .all(|c| Self::encode_char(c).is_some())
    }

    /// Encode text as WinAnsi bytes, substituting `?` for unsupported characters.
    pub fn encode(text: &str) -> Vec<u8> {
        text.chars()
            .map(|c| Self::encode_char(c).unwrap_or(REPLACEMENT))
            .collect()
    }

    /// Advance width of a WinAnsi byte in 1/1000 em.
    pub const fn byte_width(byte: u8) -> u16 {
        match byte {
            0x20..=0x7E => ASCII_WIDTHS[(byte - 0x20) as usize],
            0xA0..=0xFF => LATIN1_WIDTHS[(byte - 0xA0) as usize],
            0x80 | 0x83 | 0x86 | 0x87 | 0x96 => 556,
            0x82 | 0x91 | 0x92 => 222,
            0x84 | 0x88 | 0x8B | 0x93 | 0x94 | 0x98 | 0x9B => 333,
            0x85 | 0x89 | 0x8C | 0x97 | 0x99 => 1000,
            0x8A | 0x9F => 667,
            0x8E => 611,
            0x95 => 350,
            0x9A | 0x9E => 500,
            0x9C => 944,
            _ => 556,
        }
    }

    /// Width of a string in PDF points at the given font size.
    pub fn string_width(text: &str, font_size: f32) -> f32 {
        let units: u32 = Self::encode(text)
            .into_iter()
            .map(|b| u32::from(Self::byte_width(b)))
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let units = units as f32;
        units * font_size / 1000.0
    }

    /// Text as an uppercase hex string of WinAnsi bytes, without angle brackets.
    ///
    /// Hex strings carry no delimiters or escapes, so nothing in the text can
    /// break out of the `Tj` operand.
    pub fn text_to_hex(text: &str) -> String {
        Self::encode(text).into_iter().fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{b:02X}");
            acc
        })
    }

    /// Add the font to a page's resources under [`FONT_RESOURCE`].
    pub fn add_to_page(doc: &mut Document, page_id: ObjectId) -> Result<()> {
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
            ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
        ]));

        set_page_resource(doc, page_id, b"Font", FONT_RESOURCE, Object::Reference(font_id))
    }
}

/// Set `/Resources/<category>/<name>` on a page.
///
/// The page's effective resources (inline, referenced, or inherited from the
/// page tree) are copied onto the page as an inline dictionary so other pages
/// sharing the same resources are not affected.
pub fn set_page_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &str,
    value: Object,
) -> Result<()> {
    let mut resources = resolve_resources(doc, page_id)?;

    let mut entries = resources
        .get(category)
        .ok()
        .and_then(|obj| resolve_dict_object(doc, obj))
        .unwrap_or_default();

    entries.set(name, value);
    resources.set(category.to_vec(), Object::Dictionary(entries));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page {
        page_dict.set("Resources", Object::Dictionary(resources));
    }

    Ok(())
}

/// Resolve the Resources dictionary for a page.
///
/// Resources may be an inline dictionary, an indirect reference, or inherited
/// from a parent Pages node.
fn resolve_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let page = doc
        .get_object(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page: {e}")))?;

    if let Object::Dictionary(page_dict) = page {
        if let Some(dict) = page_dict
            .get(b"Resources")
            .ok()
            .and_then(|obj| resolve_dict_object(doc, obj))
        {
            return Ok(dict);
        }

        if let Ok(parent_obj) = page_dict.get(b"Parent")
            && let Some(dict) = resolve_inherited_resources(doc, parent_obj, 10)
        {
            return Ok(dict);
        }
    }

    Ok(Dictionary::new())
}

fn resolve_dict_object(doc: &Document, obj: &Object) -> Option<Dictionary> {
    match obj {
        Object::Dictionary(d) => Some(d.clone()),
        Object::Reference(ref_id) => match doc.get_object(*ref_id) {
            Ok(Object::Dictionary(d)) => Some(d.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Walk up the Pages tree; `depth` bounds circular Parent chains.
fn resolve_inherited_resources(doc: &Document, parent_obj: &Object, depth: usize) -> Option<Dictionary> {
    if depth == 0 {
        return None;
    }

    let Object::Reference(parent_id) = parent_obj else {
        return None;
    };
    let Ok(Object::Dictionary(parent)) = doc.get_object(*parent_id) else {
        return None;
    };

    if let Some(dict) = parent
        .get(b"Resources")
        .ok()
        .and_then(|obj| resolve_dict_object(doc, obj))
    {
        return Some(dict);
    }

    parent
        .get(b"Parent")
        .ok()
        .and_then(|grandparent| resolve_inherited_resources(doc, grandparent, depth - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_roundtrip_width() {
        // "Hi" = 722 + 222
        let width = StandardFont::string_width("Hi", 10.0);
        assert!((width - 9.44).abs() < 0.001);
    }

    #[test]
    fn test_hex_encoding_escapes_markup() {
        let hex = StandardFont::text_to_hex("<a href=\"x\">&</a>");
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(hex.starts_with("3C61"));
        assert_eq!(hex.len(), 2 * "<a href=\"x\">&</a>".len());
    }

    #[test]
    fn test_parentheses_and_backslash_are_hex() {
        assert_eq!(StandardFont::text_to_hex("(\\)"), "285C29");
    }

    #[test]
    fn test_winansi_specials() {
        assert_eq!(StandardFont::encode("\u{2014}"), vec![0x97]);
        assert_eq!(StandardFont::encode("\u{20AC}5"), vec![0x80, b'5']);
        assert_eq!(StandardFont::encode("é"), vec![0xE9]);
        assert_eq!(StandardFont::encode("\u{4E2D}"), vec![b'?']);
    }

    #[test]
    fn test_can_encode() {
        assert!(StandardFont::can_encode("Selamat pagi, café \u{20AC}5\n"));
        assert!(!StandardFont::can_encode("\u{3053}\u{3093}\u{306B}\u{3061}\u{306F}"));
        assert!(!StandardFont::can_encode("Привет"));
    }

    #[test]
    fn test_tab_becomes_space() {
        assert_eq!(StandardFont::encode("a\tb"), b"a b".to_vec());
    }

    #[test]
    fn test_add_to_page_inherits_resources() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let existing_font = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Times-Roman".to_vec())),
        ]));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "Resources",
                    Object::Dictionary(Dictionary::from_iter([(
                        "Font",
                        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(existing_font))])),
                    )])),
                ),
            ])),
        );

        assert!(StandardFont::add_to_page(&mut doc, page_id).is_ok());

        let Ok(Object::Dictionary(page)) = doc.get_object(page_id) else {
            panic!("page missing");
        };
        let Ok(Object::Dictionary(resources)) = page.get(b"Resources") else {
            panic!("resources not inlined");
        };
        let Ok(Object::Dictionary(fonts)) = resources.get(b"Font") else {
            panic!("font dictionary missing");
        };
        assert!(fonts.has(b"F1"), "inherited font must be kept");
        assert!(fonts.has(FONT_RESOURCE.as_bytes()));
    }
}
