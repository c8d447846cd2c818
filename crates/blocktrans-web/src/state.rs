use blocktrans_core::{
    AppConfig, Lang, LayoutMode, PdfTranslator, Result, TextColor, TranslationCache,
};

/// Per-request choices from the upload form.
#[derive(Debug, Clone)]
pub struct TranslateSettings {
    pub source_lang: Lang,
    pub target_lang: Lang,
    pub text_color: Option<TextColor>,
    pub font_size: Option<f32>,
    pub line_height: Option<f32>,
    pub layout: Option<LayoutMode>,
}

/// Shared application state.
///
/// Holds only immutable configuration and the translation memo; every upload
/// carries its own document and settings.
pub struct AppState {
    /// Base configuration, overridden per request by the form
    pub config: AppConfig,
    cache: TranslationCache,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(config: AppConfig, max_upload_bytes: usize) -> Result<Self> {
        config.validate()?;
        let cache = TranslationCache::new(&config.cache);

        Ok(Self {
            config,
            cache,
            max_upload_bytes,
        })
    }

    /// Create a translator for one request, sharing the memo.
    pub fn create_translator(&self, settings: &TranslateSettings) -> Result<PdfTranslator> {
        let mut config = self.config.clone();
        config.source_lang = settings.source_lang.clone();
        config.target_lang = settings.target_lang.clone();
        if let Some(color) = settings.text_color {
            config.text_color = color;
        }
        if let Some(font_size) = settings.font_size {
            config.overlay.font_size = font_size;
            config.overlay.min_font_size = config.overlay.min_font_size.min(font_size);
        }
        if let Some(line_height) = settings.line_height {
            config.overlay.line_height = line_height;
        }
        if let Some(layout) = settings.layout {
            config.overlay.layout = layout;
        }

        PdfTranslator::with_cache(config, self.cache.clone())
    }
}
