mod document;
pub mod font;
mod page_index;
mod text;
pub mod overlay;

pub use document::PdfDocument;
pub use font::StandardFont;
pub use page_index::{PageIndex, PageRange};
pub use text::{BoundingBox, PageBlocks, TextBlock, TextExtractor};
pub use overlay::{
    BlockLayout, OverlayOptions, PageGeometry, PageOverlay, PdfOverlay, layout_block, wrap_text,
};
