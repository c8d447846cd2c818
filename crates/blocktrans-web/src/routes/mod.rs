//! HTTP route handlers for the block translator web application.

mod pages;
mod translate;

pub use pages::index;
pub use translate::translate_pdf;
