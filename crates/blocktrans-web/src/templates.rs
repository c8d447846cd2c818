//! Askama templates for the upload page.

use askama::Template;
use askama_web::WebTemplate;
use blocktrans_core::{
    AppConfig, LanguageOption, source_languages, target_languages,
};

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    // Language options from single source of truth
    pub source_languages: Vec<LanguageOption>,
    pub target_languages: Vec<LanguageOption>,
    pub default_source: String,
    pub default_target: String,
    pub font_size: f32,
    pub line_height: f32,
    pub max_upload_mb: usize,
}

impl IndexTemplate {
    pub fn new(config: &AppConfig, max_upload_bytes: usize) -> Self {
        Self {
            source_languages: source_languages(),
            target_languages: target_languages(),
            default_source: config.source_lang.to_string(),
            default_target: config.target_lang.to_string(),
            font_size: config.overlay.font_size,
            line_height: config.overlay.line_height,
            max_upload_mb: max_upload_bytes / (1024 * 1024),
        }
    }
}
