use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};
use super::traits::{Translator, TranslatorInfo};

/// Language codes accepted by the public translate endpoint.
const SUPPORTED_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et", "fa",
    "fi", "fil", "fr", "ga", "gl", "gu", "he", "hi", "hr", "hu", "hy", "id", "is", "it", "ja",
    "jw", "ka", "km", "kn", "ko", "la", "lt", "lv", "mk", "ml", "mr", "ms", "my", "ne", "nl",
    "no", "pa", "pl", "pt", "ro", "ru", "si", "sk", "sl", "sq", "sr", "su", "sv", "sw", "ta",
    "te", "th", "tl", "tr", "uk", "ur", "vi", "zh-CN", "zh-TW",
];

/// Translator backed by Google's public `translate_a/single` endpoint.
pub struct GoogleTranslator {
    client: Client,
    /// Base URL (e.g., "https://translate.googleapis.com")
    pub api_base: String,
    /// Attempts per block
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Longest wait honored from a `Retry-After` header
    pub max_wait_secs: u64,
}

impl GoogleTranslator {
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config)?,
            api_base: config.api_base().trim_end_matches('/').to_string(),
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
            max_wait_secs: config.timeout_secs,
        })
    }

    pub fn supports(lang: &Lang) -> bool {
        SUPPORTED_LANGUAGES.contains(&lang.as_str())
    }

    fn request_url(&self, text: &str, source: &Lang, target: &Lang) -> String {
        let source = if source.is_auto() { "auto" } else { source.as_str() };
        format!(
            "{}/translate_a/single?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.api_base,
            urlencoding::encode(source),
            urlencoding::encode(target.as_str()),
            urlencoding::encode(text),
        )
    }

    async fn request_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| super::request_error(&e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::TranslationRateLimited {
                retry_after: super::retry_after(&response),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TranslationRequest(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

        parse_response(&body)
    }
}

/// Join the translated segments of a `[[["translated", "original", ...], ...], ...]` response.
fn parse_response(body: &Value) -> Result<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::TranslationInvalidResponse("missing translation segments".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.trim().is_empty() {
        return Err(Error::TranslationInvalidResponse("empty translation".to_string()));
    }

    Ok(translated)
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "Google",
            requires_api_key: false,
            supports_auto_detect: true,
        }
    }

    fn check_languages(&self, source: &Lang, target: &Lang) -> Result<()> {
        if target.is_auto() || !Self::supports(target) {
            return Err(Error::TranslationUnsupportedLanguage(target.to_string()));
        }
        if !source.is_auto() && !Self::supports(source) {
            return Err(Error::TranslationUnsupportedLanguage(source.to_string()));
        }
        Ok(())
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        self.check_languages(source, target)?;

        let url = self.request_url(text, source, target);
        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!("Google translate attempt {}/{}", attempt + 1, self.retry_count);

            match self.request_once(&url).await {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    warn!("Google translate request failed: {}", e);
                    if attempt + 1 < self.retry_count {
                        let wait = super::retry_wait(&e, self.retry_delay_ms, self.max_wait_secs);
                        tokio::time::sleep(wait).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}
