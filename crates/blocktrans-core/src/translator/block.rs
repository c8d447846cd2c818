//! Per-block translation with passthrough on failure.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CacheKey, TranslationCache};
use crate::config::Lang;
use crate::pdf::TextBlock;
use super::traits::Translator;

/// What happened to a block's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// The backend returned a translation
    Translated,
    /// The backend failed; the source text is kept
    Passthrough,
    /// Nothing to translate
    Empty,
}

/// A block paired with the text to draw over it.
#[derive(Debug, Clone)]
pub struct TranslatedBlock<'a> {
    pub block: &'a TextBlock,
    pub translated: String,
    pub outcome: BlockOutcome,
}

/// Translates blocks one at a time through a backend, memoizing successes.
#[derive(Clone)]
pub struct BlockTranslator {
    translator: Arc<dyn Translator>,
    cache: TranslationCache,
}

impl BlockTranslator {
    pub fn new(translator: Arc<dyn Translator>, cache: TranslationCache) -> Self {
        Self { translator, cache }
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    pub const fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate `text`, never failing.
    ///
    /// Blank text yields an empty string without calling the backend. Any
    /// backend error, or an empty result, yields `text` unchanged.
    pub async fn translate_text(&self, text: &str, source: &Lang, target: &Lang) -> (String, BlockOutcome) {
        if text.trim().is_empty() {
            return (String::new(), BlockOutcome::Empty);
        }

        let key = CacheKey::new(text, self.translator.name(), source, target);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Cache hit for block {}", key);
            return (cached, BlockOutcome::Translated);
        }

        match self.translator.translate(text, source, target).await {
            Ok(translated) if !translated.trim().is_empty() => {
                self.cache.insert(&key, translated.clone()).await;
                (translated, BlockOutcome::Translated)
            }
            Ok(_) => {
                warn!("{} returned an empty translation, keeping source text", self.translator.name());
                (text.to_string(), BlockOutcome::Passthrough)
            }
            Err(e) => {
                warn!("Translation failed, keeping source text: {}", e);
                (text.to_string(), BlockOutcome::Passthrough)
            }
        }
    }

    pub async fn translate_block<'a>(
        &self,
        block: &'a TextBlock,
        source: &Lang,
        target: &Lang,
    ) -> TranslatedBlock<'a> {
        let (translated, outcome) = self.translate_text(&block.text, source, target).await;
        TranslatedBlock {
            block,
            translated,
            outcome,
        }
    }
}
